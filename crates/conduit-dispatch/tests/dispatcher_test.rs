//! Command dispatch end to end against the in-process engine.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_config::RetryBackoff;
use conduit_dispatch::{
  ACK_WINDOW, Acknowledger, Command, CommandContext, CommandDispatcher, DispatchError,
  FlowSettings, NoopAcknowledger,
};
use conduit_engine::{Job, LocalEngine, Variables};
use conduit_orchestrator::InstanceOrchestrator;
use conduit_query::{PollPolicy, ProjectionStore, ReconciliationReader};
use conduit_reporting::{ReportingError, ReportingService, VariableLabels};
use conduit_worker::weather::{StaticWeatherSource, WeatherLookupHandler, WeatherReportHandler};
use conduit_worker::{
  ChannelError, ChannelId, Delivery, JobError, JobHandler, MemoryChannel, WorkerRegistry,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const WEATHER: &str = r#"{
  "process_id": "node-slackbot",
  "tasks": [{ "task_type": "weather-lookup" }, { "task_type": "service-task" }]
}"#;

#[derive(Default)]
struct RecordingReporting {
  calls: Mutex<Vec<String>>,
  labels: Mutex<Vec<VariableLabels>>,
}

impl RecordingReporting {
  async fn calls(&self) -> Vec<String> {
    self.calls.lock().await.clone()
  }
}

#[async_trait]
impl ReportingService for RecordingReporting {
  async fn readiness(&self) -> Result<(), ReportingError> {
    self.calls.lock().await.push("readiness".to_string());
    Ok(())
  }

  async fn enable_sharing(&self) -> Result<(), ReportingError> {
    self.calls.lock().await.push("enable_sharing".to_string());
    Ok(())
  }

  async fn export_dashboard_definitions(&self, ids: &[String]) -> Result<Value, ReportingError> {
    self.calls.lock().await.push(format!("dashboard:{}", ids.join(",")));
    Ok(json!([{ "id": ids[0], "name": "Weather dashboard" }]))
  }

  async fn export_report_definitions(&self, ids: &[String]) -> Result<Value, ReportingError> {
    self.calls.lock().await.push(format!("report:{}", ids.join(",")));
    Ok(json!([{ "id": ids[0], "name": "Weather report" }]))
  }

  async fn label_variables(&self, labels: &VariableLabels) -> Result<(), ReportingError> {
    self.calls.lock().await.push("label".to_string());
    self.labels.lock().await.push(labels.clone());
    Ok(())
  }
}

struct BrokenLookup;

#[async_trait]
impl JobHandler for BrokenLookup {
  async fn handle(&self, _job: &Job) -> Result<Variables, JobError> {
    Err(JobError::Other("weather service down".to_string()))
  }
}

struct SlowAcknowledger;

#[async_trait]
impl Acknowledger for SlowAcknowledger {
  async fn acknowledge(&self, _command: &Command) -> Result<(), ChannelError> {
    tokio::time::sleep(ACK_WINDOW * 2).await;
    Ok(())
  }
}

struct Harness {
  dispatcher: CommandDispatcher,
  registry: WorkerRegistry,
  channel: Arc<MemoryChannel>,
  reporting: Arc<RecordingReporting>,
  _artifact: tempfile::NamedTempFile,
}

struct Options {
  reporting: bool,
  projected: bool,
  broken_lookup: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      reporting: true,
      projected: true,
      broken_lookup: false,
    }
  }
}

async fn harness(options: Options) -> Harness {
  let mut artifact = tempfile::NamedTempFile::new().unwrap();
  artifact.write_all(WEATHER.as_bytes()).unwrap();

  let store = Arc::new(ProjectionStore::new(Duration::from_millis(20)));
  let engine = if options.projected {
    Arc::new(LocalEngine::with_notifier(store.clone()))
  } else {
    Arc::new(LocalEngine::new())
  };

  let channel = Arc::new(MemoryChannel::new());
  let registry = WorkerRegistry::new(engine.clone());
  let lookup: Arc<dyn JobHandler> = if options.broken_lookup {
    Arc::new(BrokenLookup)
  } else {
    Arc::new(WeatherLookupHandler::new(Arc::new(StaticWeatherSource::sample())))
  };
  registry.register("weather-lookup", lookup).await.unwrap();
  registry
    .register(
      "service-task",
      Arc::new(WeatherReportHandler::new(channel.clone())),
    )
    .await
    .unwrap();

  let reporting = Arc::new(RecordingReporting::default());
  let context = CommandContext {
    orchestrator: InstanceOrchestrator::new(engine.clone()),
    reader: ReconciliationReader::new(store),
    reporting: if options.reporting {
      Some(reporting.clone() as Arc<dyn ReportingService>)
    } else {
      None
    },
    channel: channel.clone(),
    settings: FlowSettings {
      artifact_path: artifact.path().to_path_buf(),
      process_id: "node-slackbot".to_string(),
      instance_timeout: Duration::from_secs(5),
      poll_policy: PollPolicy {
        initial_delay: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
        max_wait: Duration::from_secs(2),
        max_attempts: 5,
        backoff: RetryBackoff::Constant,
      },
      definition_key: "node-slackbot-demo".to_string(),
    },
  };

  Harness {
    dispatcher: CommandDispatcher::new(context, CancellationToken::new()),
    registry,
    channel,
    reporting,
    _artifact: artifact,
  }
}

async fn run_line(harness: &Harness, line: &str) -> ChannelId {
  let reply = ChannelId::new("C42");
  let command = Command::from_line(line, reply.clone()).unwrap().unwrap();
  harness
    .dispatcher
    .dispatch(command, &NoopAcknowledger)
    .await
    .unwrap();
  harness.dispatcher.shutdown().await;
  harness.registry.shutdown().await;
  reply
}

#[tokio::test]
async fn test_weather_command_replies_with_temperature() {
  let harness = harness(Options::default()).await;
  let reply = run_line(&harness, "/weather Seattle").await;

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec!["The temperature in Seattle is currently 60 degrees. It feels like 58 degrees outside."]
  );
}

#[tokio::test]
async fn test_weather_without_city_still_completes() {
  let harness = harness(Options::default()).await;
  let reply = run_line(&harness, "/weather").await;

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec![" is not a valid city"]
  );
}

#[tokio::test]
async fn test_export_dashboard_uploads_pretty_json() {
  let harness = harness(Options::default()).await;
  let reply = run_line(&harness, "/export dashboard 35b34fb3-ecf6").await;

  assert_eq!(
    harness.reporting.calls().await,
    vec!["readiness", "enable_sharing", "dashboard:35b34fb3-ecf6"]
  );

  let deliveries = harness.channel.deliveries().await;
  assert_eq!(deliveries.len(), 2);
  assert_eq!(
    deliveries[0],
    Delivery::Message {
      channel: reply.clone(),
      text: "Here is your updated Optimize dashboard to upload:".to_string(),
    }
  );
  let Delivery::File { channel, upload } = &deliveries[1] else {
    panic!("expected a file upload, got {:?}", deliveries[1]);
  };
  assert_eq!(channel, &reply);
  assert_eq!(upload.filename, "optimize_dashboard.json");
  assert_eq!(upload.filetype, "json");
  assert_eq!(upload.title, "Optimize Dashboard");

  let expected = serde_json::to_vec_pretty(&json!([
    { "id": "35b34fb3-ecf6", "name": "Weather dashboard" }
  ]))
  .unwrap();
  assert_eq!(upload.bytes, expected);
}

#[tokio::test]
async fn test_export_report_uses_report_file_name() {
  let harness = harness(Options::default()).await;
  run_line(&harness, "/export report fdf3f09f").await;

  let deliveries = harness.channel.deliveries().await;
  assert!(matches!(
    &deliveries[1],
    Delivery::File { upload, .. } if upload.filename == "optimize_report.json"
  ));
}

#[tokio::test]
async fn test_label_rejoins_multi_token_label() {
  let harness = harness(Options::default()).await;
  let reply = run_line(&harness, "/label total_price number \"Total Price\"").await;

  let labels = harness.reporting.labels.lock().await.clone();
  assert_eq!(labels.len(), 1);
  assert_eq!(labels[0].definition_key, "node-slackbot-demo");
  assert_eq!(labels[0].labels.len(), 1);
  assert_eq!(labels[0].labels[0].variable_name, "total_price");
  assert_eq!(labels[0].labels[0].variable_type, "number");
  assert_eq!(labels[0].labels[0].variable_label, "Total Price");

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec!["Labelled total_price (number) as \"Total Price\"."]
  );
}

#[tokio::test]
async fn test_bad_arguments_get_usage() {
  let harness = harness(Options::default()).await;
  let reply = run_line(&harness, "/export chart 1").await;

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec!["Usage: /export {dashboard|report} <id>"]
  );
  assert!(harness.reporting.calls().await.is_empty());
}

#[tokio::test]
async fn test_missing_reporting_is_reported() {
  let harness = harness(Options {
    reporting: false,
    ..Options::default()
  })
  .await;
  let reply = run_line(&harness, "/label city String City").await;

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec!["/label is not configured."]
  );
}

#[tokio::test]
async fn test_workflow_failure_is_reported_with_diagnostic() {
  let harness = harness(Options {
    broken_lookup: true,
    ..Options::default()
  })
  .await;
  let reply = run_line(&harness, "/weather Seattle").await;

  assert_eq!(
    harness.channel.messages_for(&reply).await,
    vec!["The weather workflow failed: weather service down"]
  );
}

#[tokio::test]
async fn test_unreconciled_result_is_reported_as_pending() {
  let harness = harness(Options {
    projected: false,
    ..Options::default()
  })
  .await;
  let reply = run_line(&harness, "/weather Seattle").await;

  let messages = harness.channel.messages_for(&reply).await;
  assert_eq!(messages.len(), 2);
  assert!(messages[0].starts_with("The temperature in Seattle"));
  assert!(messages[1].starts_with("Results for instance "));
  assert!(messages[1].ends_with(" are still pending."));
}

#[tokio::test(start_paused = true)]
async fn test_slow_acknowledgment_drops_command() {
  let harness = harness(Options::default()).await;
  let command = Command::parse("weather", "Seattle", ChannelId::new("C1")).unwrap();

  let err = harness
    .dispatcher
    .dispatch(command, &SlowAcknowledger)
    .await
    .unwrap_err();

  assert!(matches!(err, DispatchError::AcknowledgmentTimeout { window } if window == ACK_WINDOW));
  assert_eq!(harness.dispatcher.in_flight(), 0);
  harness.dispatcher.shutdown().await;
  harness.registry.shutdown().await;
  assert!(harness.channel.deliveries().await.is_empty());
}

#[tokio::test]
async fn test_dispatch_after_shutdown_is_rejected() {
  let harness = harness(Options::default()).await;
  harness.dispatcher.shutdown().await;

  let command = Command::parse("weather", "Seattle", ChannelId::new("C1")).unwrap();
  let err = harness
    .dispatcher
    .dispatch(command, &NoopAcknowledger)
    .await
    .unwrap_err();
  assert!(matches!(err, DispatchError::ShuttingDown));
  harness.registry.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_commands_reply_to_their_own_channels() {
  let harness = harness(Options::default()).await;
  let cities = [("A", "Seattle"), ("B", "London"), ("C", "Berlin")];

  for (channel, city) in cities {
    let command = Command::parse("weather", city, ChannelId::new(channel)).unwrap();
    harness
      .dispatcher
      .dispatch(command, &NoopAcknowledger)
      .await
      .unwrap();
  }
  harness.dispatcher.shutdown().await;
  harness.registry.shutdown().await;

  for (channel, city) in cities {
    let messages = harness.channel.messages_for(&ChannelId::new(channel)).await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with(&format!("The temperature in {city} ")));
  }
}
