//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::engine::{ConcurrentSource, Message};
use crate::error::{Error, Result};
use crate::loader::{build_streams, load_source, SourceDefinition};
use crate::sink::{LineFormat, MessageSink, StateSink, WriterSink};
use crate::state::StateManager;
use crate::types::{LogLevel, SyncMode};
use std::collections::HashSet;
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
            Commands::Read {
                streams,
                workers,
                max_generators,
            } => {
                self.read(streams.as_deref(), *workers, *max_generators)
                    .await
            }
            Commands::Validate => self.validate().await,
        }
    }

    /// Load source definition
    fn load_source(&self) -> Result<SourceDefinition> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Source file not specified (use -C flag)"))?;
        load_source(path)
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

    fn output_sink(&self) -> WriterSink<std::io::Stdout> {
        let format = match self.cli.format {
            OutputFormat::Json => LineFormat::Json,
            OutputFormat::Pretty => LineFormat::Pretty,
        };
        let level = if self.cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        WriterSink::new(std::io::stdout())
            .with_format(format)
            .with_min_log_level(level)
    }

    /// Read streams
    async fn read(
        &self,
        streams: Option<&str>,
        workers: Option<usize>,
        max_generators: Option<usize>,
    ) -> Result<()> {
        let mut def = self.load_source()?;

        if let Some(filter) = streams {
            let wanted: HashSet<&str> = filter
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if let Some(missing) = wanted.iter().find(|name| def.stream(name).is_none()) {
                return Err(Error::StreamNotFound {
                    stream: (*missing).to_string(),
                });
            }
            if !wanted.is_empty() {
                def.streams.retain(|s| wanted.contains(s.name.as_str()));
            }
        }

        let mut config = def.sync.clone();
        if let Some(n) = workers {
            config = config.with_workers(n);
        }
        if let Some(n) = max_generators {
            config = config.with_max_concurrent_generators(n);
        }

        let state = self.load_state()?;
        let snapshot = state.snapshot().await;
        let streams = build_streams(&def, Some(&snapshot))?;

        info!(source = %def.name, streams = streams.len(), "Reading source");

        let mut sink = StateSink::new(self.output_sink(), state);
        let summary = ConcurrentSource::new(config)
            .read(streams, &mut sink)
            .await?;

        sink.accept(Message::info(format!(
            "Read {} records from {} streams in {}ms",
            summary.total.records,
            summary.streams.len(),
            summary.total.duration_ms
        )))
        .await?;
        sink.flush().await?;

        summary.into_result().map(|_| ())
    }

    /// Validate source definition
    async fn validate(&self) -> Result<()> {
        let def = self.load_source()?;
        build_streams(&def, None)?;

        let mut sink = self.output_sink();
        sink.accept(Message::info(format!(
            "Source '{}' v{} is valid with {} streams",
            def.name,
            def.version,
            def.streams.len()
        )))
        .await?;
        for stream in &def.streams {
            let mode = match stream.sync_mode() {
                SyncMode::FullRefresh => "full refresh",
                SyncMode::Incremental => "incremental",
            };
            sink.accept(Message::debug(format!(
                "Stream '{}' ({mode}): {} partitions",
                stream.name,
                stream.partitions.len()
            )))
            .await?;
        }
        sink.flush().await
    }
}
