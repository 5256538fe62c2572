use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use voxrelay::VoxrelayError;
use voxrelay::adapter::{HttpGateway, JobSnapshot, ScriptedAdapter, ServiceAdapter};
use voxrelay::cli::{Cli, Command, TriggerArgs};
use voxrelay::config::VoxrelayConfig;
use voxrelay::telemetry::init_tracing;
use voxrelay::trigger::{EventRule, TriggerEvent, TriggerPayload};
use voxrelay::ui::{ExecutionProgress, print_record};
use voxrelay::workflow::{Engine, PollingController, TerminalStatus, WorkflowConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => VoxrelayConfig::load_from(path)?,
        None => VoxrelayConfig::load()?,
    };
    if let Some(secs) = cli.poll_interval {
        config.workflow.poll_interval_secs = secs;
    }
    if let Some(attempts) = cli.max_poll_attempts {
        config.workflow.max_poll_attempts = attempts;
    }
    config.validate()?;

    match cli.command {
        Command::Run { trigger } => {
            let payload = resolve_trigger(&trigger, &config.trigger.to_rule())?;
            let gateway = HttpGateway::new(&config.gateway).map_err(VoxrelayError::from)?;
            execute(gateway, config.workflow.to_workflow_config(), payload).await
        }
        Command::Poll { job_name } => {
            let gateway = HttpGateway::new(&config.gateway).map_err(VoxrelayError::from)?;
            poll(&gateway, &config.workflow.to_workflow_config(), &job_name).await
        }
        Command::Demo {
            language,
            pending_polls,
        } => {
            let mut workflow = config.workflow.to_workflow_config();
            if cli.poll_interval.is_none() {
                workflow.poll_interval = Duration::from_secs(1);
            }
            let adapter = demo_adapter(&language, pending_polls);
            let payload = TriggerPayload::new("demo-bucket", "uploads/demo.wav")
                .map_err(VoxrelayError::from)?;
            execute(adapter, workflow, payload).await
        }
    }
}

/// Build the payload from CLI arguments, applying the configured event rule.
fn resolve_trigger(args: &TriggerArgs, rule: &EventRule) -> Result<TriggerPayload, VoxrelayError> {
    let event = match (&args.event, &args.key) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path)?;
            TriggerEvent::parse(&json)?
        }
        (None, Some(key)) => TriggerEvent {
            source: None,
            detail_type: None,
            bucket: args.bucket.clone(),
            key: key.clone(),
        },
        (None, None) => {
            return Err(VoxrelayError::Config(
                "either --event or --key is required".to_string(),
            ));
        }
    };
    Ok(rule.accept(event)?)
}

async fn execute<A: ServiceAdapter>(
    adapter: A,
    workflow: WorkflowConfig,
    payload: TriggerPayload,
) -> Result<()> {
    let progress = ExecutionProgress::start(&payload.key);
    let engine = Engine::new(adapter, workflow).with_observer(progress.observer());

    let record = engine.run(payload).await;
    progress.complete(&record.outcome);
    print_record(&record)?;

    match record.outcome.failure() {
        Some(failure) => Err(VoxrelayError::ExecutionFailed(failure.code).into()),
        None => Ok(()),
    }
}

async fn poll(gateway: &HttpGateway, workflow: &WorkflowConfig, job_name: &str) -> Result<()> {
    let mut poller = PollingController::new(workflow.poll_interval, workflow.max_poll_attempts);
    let status = poller
        .poll_until_resolved(gateway, job_name)
        .await
        .map_err(VoxrelayError::from)
        .with_context(|| format!("polling {job_name}"))?;

    let snapshot = match status {
        TerminalStatus::Completed(snapshot) | TerminalStatus::Failed(snapshot) => snapshot,
    };
    let json = serde_json::to_string_pretty(&snapshot).map_err(VoxrelayError::from)?;
    println!("{json}");
    Ok(())
}

fn demo_adapter(language: &str, pending_polls: usize) -> ScriptedAdapter {
    let transcript = match language {
        "fr-FR" => "bonjour tout le monde",
        "es-ES" => "hola a todos",
        "de-DE" => "hallo zusammen",
        _ => "hello everyone",
    };
    let script = std::iter::repeat_n(JobSnapshot::in_progress(), pending_polls)
        .chain(std::iter::once(JobSnapshot::completed(transcript, language)));
    ScriptedAdapter::with_snapshots(script)
}
