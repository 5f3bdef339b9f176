//! Config loading, validation and resolution
//!
//! Everything that can be rejected statically is rejected here, before the
//! first network call.

use super::types::{AuthMethod, StreamDefinition, TapConfig};
use crate::auth::{AuthConfig, OAuth2Config};
use crate::error::{Error, Result};
use crate::extract::PathExpr;
use crate::pagination::{PaginationConfig, PaginationStyle};
use crate::schema::FieldType;
use crate::template::{extract_variables, render, render_map, TemplateContext};
use crate::transport::{HttpTransportConfig, PageRequest, RateLimiterConfig};
use crate::types::{OptionStringExt, ReplicationMethod};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load and validate a config file (YAML or JSON)
pub fn load_config(path: impl AsRef<Path>) -> Result<TapConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    load_config_from_str(&content)
}

/// Parse and validate a config document
pub fn load_config_from_str(content: &str) -> Result<TapConfig> {
    let config: TapConfig = serde_yaml::from_str(content)
        .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

impl TapConfig {
    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(Error::missing_field("api_url"));
        }
        url::Url::parse(&self.api_url)?;

        if self.streams.is_empty() {
            return Err(Error::config("Config must define at least one stream"));
        }

        let mut names = HashSet::new();
        for stream in &self.streams {
            if !names.insert(stream.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate stream name '{}'",
                    stream.name
                )));
            }
            stream.validate()?;
            self.check_templates(stream)?;
        }

        self.auth()?;
        Ok(())
    }

    /// Look up a stream by name
    pub fn stream(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Resolve the authentication strategy
    pub fn auth(&self) -> Result<AuthConfig> {
        let required = |value: &Option<String>, field: &str| {
            value
                .clone()
                .none_if_empty()
                .ok_or_else(|| Error::missing_field(field))
        };

        Ok(match self.auth_method {
            AuthMethod::NoAuth => AuthConfig::None,
            AuthMethod::ApiKey => AuthConfig::ApiKey {
                name: self.api_key_name.clone(),
                value: required(&self.api_key, "api_key")?,
                location: self.api_key_location,
            },
            AuthMethod::BearerToken => AuthConfig::Bearer {
                token: required(&self.bearer_token, "bearer_token")?,
            },
            AuthMethod::Basic => AuthConfig::Basic {
                username: required(&self.username, "username")?,
                password: self.password.clone().unwrap_or_default(),
            },
            AuthMethod::OAuth2 => {
                let grant_type = self.oauth2_grant_type;
                let refresh_token = self.oauth2_refresh_token.clone().none_if_empty();
                if grant_type == crate::auth::GrantType::RefreshToken && refresh_token.is_none() {
                    return Err(Error::missing_field("oauth2_refresh_token"));
                }
                AuthConfig::OAuth2(OAuth2Config {
                    token_url: required(&self.oauth2_token_url, "oauth2_token_url")?,
                    client_id: required(&self.oauth2_client_id, "oauth2_client_id")?,
                    client_secret: required(&self.oauth2_client_secret, "oauth2_client_secret")?,
                    grant_type,
                    refresh_token,
                    scope: self.oauth2_scope.clone().none_if_empty(),
                    audience: self.oauth2_audience.clone().none_if_empty(),
                    extra_params: self.oauth2_extra_params.clone(),
                })
            }
        })
    }

    /// Transport settings for this config
    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut config = HttpTransportConfig::new(&self.api_url)
            .timeout(Duration::from_secs(self.request_timeout))
            .max_retries(self.max_retries)
            .user_agent(&self.user_agent);
        config.default_headers = self.headers.clone();
        config.default_params = self.params.clone();
        if let Some(rps) = self.rate_limit_rps.filter(|rps| *rps > 0) {
            config = config.rate_limit(RateLimiterConfig::per_second(rps));
        }
        config
    }

    /// Context for rendering paths, params and bookmark filters
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext::with_config(serde_json::to_value(self).unwrap_or_default())
    }

    /// First request for a stream, with the bookmark injected when given
    ///
    /// A `bookmark_filter` is rendered with `{{ bookmark }}` and sent under
    /// `bookmark_filter_param`; otherwise the raw bookmark is sent under
    /// `bookmark_param` (the replication key by default).
    pub fn stream_request(
        &self,
        stream: &StreamDefinition,
        bookmark: Option<&str>,
    ) -> Result<PageRequest> {
        let ctx = self.template_context().var("stream", stream.name.as_str());
        let mut params = render_map(&stream.params, &ctx)?;

        if let Some(bookmark) = bookmark.filter(|b| !b.is_empty()) {
            match (&stream.bookmark_filter, &stream.bookmark_filter_param) {
                (Some(filter), Some(param)) => {
                    let value = render(filter, &ctx.clone().with_bookmark(bookmark))?;
                    params.insert(param.clone(), value);
                }
                _ => {
                    if let Some(name) = stream.bookmark_param_name() {
                        params.insert(name.to_string(), bookmark.to_string());
                    }
                }
            }
        }

        Ok(PageRequest::new(render(&stream.path, &ctx)?)
            .with_params(params)
            .with_headers(render_map(&stream.headers, &ctx)?)
            .with_method(self.http_method))
    }

    fn check_templates(&self, stream: &StreamDefinition) -> Result<()> {
        let ctx = self.template_context().var("stream", stream.name.as_str());
        let filter_ctx = ctx.clone().with_bookmark("");
        let templated = std::iter::once((&stream.path, &ctx))
            .chain(stream.params.values().map(|v| (v, &ctx)))
            .chain(stream.headers.values().map(|v| (v, &ctx)))
            .chain(stream.bookmark_filter.iter().map(|f| (f, &filter_ctx)));

        for (template, ctx) in templated {
            for var in extract_variables(template) {
                if ctx.get(&var).is_none() {
                    return Err(Error::invalid_value(
                        format!("streams.{}", stream.name),
                        format!("template variable '{var}' is not defined in the config"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl StreamDefinition {
    /// Check this stream on its own
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Stream name cannot be empty"));
        }

        if self.path.trim().is_empty() {
            return Err(Error::missing_field(format!("streams.{}.path", self.name)));
        }

        if self.replication_method == ReplicationMethod::Incremental
            && self.replication_key.as_deref().unwrap_or("").is_empty()
        {
            return Err(Error::invalid_value(
                format!("streams.{}.replication_key", self.name),
                "INCREMENTAL replication requires a replication_key",
            ));
        }

        if self.bookmark_filter.is_some() && self.bookmark_filter_param.is_none() {
            return Err(Error::missing_field(format!(
                "streams.{}.bookmark_filter_param",
                self.name
            )));
        }

        if let Some(path) = &self.records_path {
            PathExpr::parse(path)?;
        }

        if let Some(schema) = &self.schema {
            FieldType::from_json_schema(schema)?;
        }

        crate::pagination::build_paginator(&self.pagination()?)?;
        Ok(())
    }

    /// Resolve the pagination strategy by name
    pub fn pagination(&self) -> Result<PaginationConfig> {
        let style = PaginationStyle::parse(&self.pagination_style).ok_or_else(|| {
            Error::UnknownPaginationStyle {
                stream: self.name.clone(),
                style: self.pagination_style.clone(),
            }
        })?;

        Ok(match style {
            PaginationStyle::None => PaginationConfig::None,
            PaginationStyle::Page => PaginationConfig::Page {
                page_param: self.pagination_page_param.clone(),
                size_param: self.pagination_size_param.clone(),
                page_size: self.pagination_page_size,
                start_page: self.pagination_start_page,
                total_path: self.pagination_total_path.clone(),
            },
            PaginationStyle::Offset => PaginationConfig::Offset {
                offset_param: self.pagination_offset_param.clone(),
                limit_param: self.pagination_limit_param.clone(),
                page_size: self.pagination_page_size,
            },
            PaginationStyle::Cursor => PaginationConfig::Cursor {
                cursor_path: self.pagination_cursor_path.clone(),
                cursor_param: self.pagination_cursor_param.clone(),
            },
            PaginationStyle::LinkHeader => PaginationConfig::LinkHeader,
            PaginationStyle::JsonPath => PaginationConfig::JsonPath {
                next_path: self.pagination_next_path.clone(),
                next_is_url: self.pagination_next_is_url,
                cursor_param: self.pagination_cursor_param.clone(),
            },
            PaginationStyle::OData => PaginationConfig::OData,
        })
    }

    /// True for INCREMENTAL streams
    pub fn is_incremental(&self) -> bool {
        self.replication_method == ReplicationMethod::Incremental
    }

    /// A replication key configured on a FULL_TABLE stream
    pub fn has_full_table_replication_key(&self) -> bool {
        self.replication_method == ReplicationMethod::FullTable
            && self.replication_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Param a plain bookmark is sent under
    pub fn bookmark_param_name(&self) -> Option<&str> {
        self.bookmark_param
            .as_deref()
            .or(self.replication_key.as_deref())
            .filter(|name| !name.is_empty())
    }
}
