//! CLI runner - executes commands

use crate::catalog::{discover, Catalog};
use crate::cli::commands::{parse_stream_list, Cli, Commands};
use crate::config::{load_config, TapConfig};
use crate::engine::{SyncConfig, SyncEngine, SyncSummary};
use crate::error::{Error, Result};
use crate::output::{JsonLinesWriter, MessageWriter};
use crate::state::StateManager;
use crate::transport::HttpTransport;
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Discover => self.discover().await,
            Commands::Sync { streams } => {
                let mut writer = JsonLinesWriter::stdout();
                let summary = self.sync(streams.as_deref(), &mut writer).await?;
                check_summary(&summary)
            }
            Commands::Validate => self.validate(),
        }
    }

    /// Load and validate the config file
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))?;
        load_config(path)
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Load the catalog, if one was given
    fn load_catalog(&self) -> Result<Option<Catalog>> {
        self.cli.catalog.as_ref().map(Catalog::load).transpose()
    }

    fn transport(config: &TapConfig) -> Result<HttpTransport> {
        HttpTransport::new(config.transport_config(), config.auth()?)
    }

    /// Print the discovered catalog
    async fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let transport = Self::transport(&config)?;

        let catalog = discover(&config, &transport).await?;
        println!("{}", catalog.to_json_pretty()?);
        Ok(())
    }

    /// Run a sync, writing messages to `writer`
    pub async fn sync(
        &self,
        streams: Option<&str>,
        writer: &mut dyn MessageWriter,
    ) -> Result<SyncSummary> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let catalog = self.load_catalog()?;
        let transport = Self::transport(&config)?;

        let options = SyncConfig::new().with_streams(parse_stream_list(streams));
        let engine = SyncEngine::new(&config, &transport, state).with_config(options);
        engine.sync(catalog.as_ref(), writer).await
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        info!(streams = config.streams.len(), "Config is valid");

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Config is valid with {} streams", config.streams.len())
            }
        }));
        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        println!("{msg}");
    }
}

/// Turn aborted streams into a run failure
fn check_summary(summary: &SyncSummary) -> Result<()> {
    if summary.is_success() {
        return Ok(());
    }
    let aborted: Vec<&str> = summary.aborted().collect();
    Err(Error::Other(format!(
        "{} stream(s) aborted: {}",
        aborted.len(),
        aborted.join(", ")
    )))
}
