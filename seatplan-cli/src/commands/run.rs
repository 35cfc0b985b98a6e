//! Run command - one full session: analysis pipeline, then dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seatplan::broadcast::ProgressEvent;
use seatplan::pipeline::{ReplayService, RunInput, RunOutcome};
use seatplan::service::{SeatplanService, ServiceConfig, SessionOutcome, SessionReport};
use seatplan::session::SessionKind;

use super::common::{print_connect, print_dispatch};
use crate::error::CliError;
use crate::runner::{CliRunner, ConfigSource};

/// Arguments for the run command.
pub struct RunArgs {
    pub people: u32,
    pub image: String,
    pub scenario: String,
    pub replay: Option<PathBuf>,
    pub no_hardware: bool,
    pub watch: bool,
}

/// Run the run command.
pub fn run(args: RunArgs, source: &ConfigSource, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(source, debug)?;
    runner.log_startup("run");
    let config = runner.config();

    let replay_dir = args
        .replay
        .clone()
        .or_else(|| config.replay.directory.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No analysis replies available. \
                 Set replay.directory in config.ini or use --replay"
                    .to_string(),
            )
        })?;
    if !replay_dir.is_dir() {
        return Err(CliError::Config(format!(
            "Replay directory '{}' does not exist",
            replay_dir.display()
        )));
    }

    let service_config = ServiceConfig::builder()
        .output_dir(config.output.directory.clone())
        .poll_interval(config.broadcast.poll_interval())
        .idle_timeout(config.session.idle_timeout())
        .post_dispatch_wait(config.hardware.post_dispatch())
        .hardware_enabled(!args.no_hardware)
        .build();

    let mut service = SeatplanService::new(
        runner.open_store(),
        Arc::new(ReplayService::new(replay_dir)),
    )
    .with_config(service_config);
    if !args.no_hardware {
        service = service.with_devices(Arc::new(runner.device_manager()?));
    }
    let service = Arc::new(service);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to start async runtime: {}", e)))?;

    let input = RunInput::new(args.scenario, args.people, args.image);
    let outcome = runtime.block_on(run_session(service, input, args.watch))?;

    match outcome {
        SessionOutcome::Completed(report) => {
            print_report(&report);
            Ok(())
        }
        SessionOutcome::Stopped(RunOutcome::Cancelled { session_id, at_stage }) => {
            info!(session_id = %session_id, stage = ?at_stage, "Run cancelled by user");
            Err(CliError::Cancelled {
                session_id: session_id.to_string(),
            })
        }
        SessionOutcome::Stopped(RunOutcome::Failed(failure)) => {
            Err(CliError::RunFailed(failure.to_string()))
        }
    }
}

async fn run_session(
    service: Arc<SeatplanService>,
    input: RunInput,
    watch: bool,
) -> Result<SessionOutcome, CliError> {
    let session = service.start_session(SessionKind::Desktop);
    let session_id = session.id.clone();
    println!("Session {} started", session_id);

    // Ctrl-C cancels at the next stage boundary.
    let cancel_service = Arc::clone(&service);
    let cancel_id = session_id.clone();
    ctrlc::set_handler(move || {
        if cancel_service.cancel(&cancel_id) {
            eprintln!();
            eprintln!("Cancelling after the current stage...");
        }
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let disconnect = CancellationToken::new();
    let printer = watch.then(|| {
        let watcher = service.watch(&session_id, disconnect.clone());
        let json_lines = !atty::is(atty::Stream::Stdout);
        tokio::spawn(print_events(watcher.events, json_lines))
    });

    let result = service.run_session(&session_id, input).await;

    if result.is_err() {
        disconnect.cancel();
    }
    if let Some(printer) = printer {
        if let Err(e) = printer.await {
            warn!(error = %e, "Progress printer stopped unexpectedly");
        }
    }

    Ok(result?)
}

/// Print events until the session reaches a terminal status.
///
/// On a terminal each event is one human-readable line; when piped each
/// event is one JSON object per line.
async fn print_events(mut events: UnboundedReceiver<ProgressEvent>, json_lines: bool) {
    while let Some(event) = events.recv().await {
        if json_lines {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Cannot serialize progress event"),
            }
            continue;
        }

        println!(
            "[{:>3}%] {:<9} {}",
            event.progress,
            event.status.as_str(),
            event.message.as_deref().unwrap_or("")
        );
        for stage in event.outputs.keys() {
            println!("        {} ready", stage);
        }
    }
}

fn print_report(report: &SessionReport) {
    let run = &report.run;
    println!();
    println!("Run completed in {:.3}s", run.total_elapsed.as_secs_f64());
    for record in &run.stages {
        println!(
            "  {:<20} {:.3}s",
            record.name,
            record.duration.as_secs_f64()
        );
    }
    if let Some(command) = run.command() {
        println!("Command: {}", command);
    }
    if let Some(path) = &run.report_path {
        println!("Report:  {}", path.display());
    }
    if let Some(connect) = &report.connect {
        println!();
        print_connect(connect);
    }
    if let Some(dispatch) = &report.dispatch {
        print_dispatch(dispatch);
    }
}
