//! Process wiring: one engine, one worker registry, one dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_config::ConduitConfig;
use conduit_dispatch::{CommandContext, CommandDispatcher, FlowSettings};
use conduit_engine::LocalEngine;
use conduit_orchestrator::InstanceOrchestrator;
use conduit_query::{OperateClient, ProjectionStore, QueryService, ReconciliationReader};
use conduit_reporting::{OptimizeClient, ReportingService};
use conduit_worker::weather::{
  HttpWeatherSource, StaticWeatherSource, WeatherLookupHandler, WeatherReportHandler,
  WeatherSource,
};
use conduit_worker::{ResponseChannel, WorkerRegistry};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channel::StdoutChannel;

pub struct App {
  pub orchestrator: InstanceOrchestrator,
  pub dispatcher: CommandDispatcher,
  registry: WorkerRegistry,
}

impl App {
  /// Build the process and register every worker. Workers are registered
  /// here only, never per command.
  pub async fn start(
    config: &ConduitConfig,
    out_dir: PathBuf,
    cancel: CancellationToken,
  ) -> Result<Self> {
    let store = Arc::new(ProjectionStore::new(config.query.projection_lag()));
    let engine = Arc::new(LocalEngine::with_notifier(store.clone()));

    let query: Arc<dyn QueryService> = match &config.query.operate_base_url {
      Some(url) => {
        info!(url = %url, "reading instance state from operate");
        Arc::new(
          OperateClient::new(url, config.query.operate_token.clone())
            .context("invalid operate configuration")?,
        )
      }
      None => store,
    };

    let reporting: Option<Arc<dyn ReportingService>> = match &config.reporting.optimize_base_url {
      Some(url) => Some(Arc::new(
        OptimizeClient::new(url, config.reporting.optimize_token.clone())
          .context("invalid optimize configuration")?,
      )),
      None => None,
    };

    let weather: Arc<dyn WeatherSource> = match &config.weather_source.api_url {
      Some(url) => Arc::new(
        HttpWeatherSource::new(
          url.clone(),
          config.weather_source.api_key.clone(),
          config.weather_source.units.clone(),
        )
        .context("failed to build weather client")?,
      ),
      None => Arc::new(StaticWeatherSource::sample()),
    };

    let channel: Arc<dyn ResponseChannel> = Arc::new(StdoutChannel::new(out_dir));

    let registry = WorkerRegistry::new(engine.clone());
    registry
      .register(
        &config.weather.lookup_task_type,
        Arc::new(WeatherLookupHandler::new(weather)),
      )
      .await
      .context("failed to register weather lookup worker")?;
    registry
      .register(
        &config.weather.report_task_type,
        Arc::new(WeatherReportHandler::new(channel.clone())),
      )
      .await
      .context("failed to register weather report worker")?;

    let orchestrator = InstanceOrchestrator::new(engine);
    let context = CommandContext {
      orchestrator: orchestrator.clone(),
      reader: ReconciliationReader::new(query),
      reporting,
      channel,
      settings: FlowSettings::from(config),
    };

    Ok(Self {
      orchestrator,
      dispatcher: CommandDispatcher::new(context, cancel),
      registry,
    })
  }

  /// Wait for running commands, then stop the workers.
  pub async fn shutdown(&self) {
    self.dispatcher.shutdown().await;
    self.registry.shutdown().await;
  }
}
