use crate::client::HttpAnalysisClient;
use crate::error::WorkflowError;
use crate::logging;
use crate::model::{ActionKind, ClientConfig, SessionSnapshot, WorkflowEvent};
use crate::orchestrator::{Command, Controller};
use crate::report;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "datalens",
    version,
    about = "Terminal client for dataset exploration against a remote analysis service"
)]
pub struct Cli {
    /// Base URL of the analysis service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Dataset file to upload on launch
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Target column to select once the upload completes
    #[arg(long)]
    pub target: Option<String>,

    /// Feature name for distribution and outlier actions
    #[arg(long)]
    pub feature: Option<String>,

    /// Print text reports and exit (no TUI); requires --file
    #[arg(long)]
    pub text: bool,

    /// Print one JSON document and exit (no TUI); requires --file
    #[arg(long)]
    pub json: bool,

    /// Per-request timeout
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Use --upload-on-launch false to start the TUI without uploading --file
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub upload_on_launch: bool,

    /// Write logs to this file instead of ./datalens-cli.log
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    logging::init(args.log_file.clone())?;

    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }
    if (args.json || args.text) && args.file.is_none() {
        return Err(anyhow::anyhow!(
            "--json and --text need a dataset; pass --file as well"
        ));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_oneshot(args).await;
        }
    }

    run_oneshot(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("datalens-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Actions a one-shot invocation performs, given the provided selections.
/// Missing-value and outlier handling mutate server-side files, so they stay
/// interactive-only.
fn build_script(args: &Cli, file: PathBuf) -> Vec<Command> {
    let mut script = vec![Command::Upload { path: file }];
    if let Some(target) = &args.target {
        script.push(Command::SelectTarget {
            column: target.clone(),
        });
        script.push(Command::Analyze);
    }
    script.push(Command::Summarize);
    if args.target.is_some() {
        script.push(Command::Correlation);
    }
    if let Some(feature) = &args.feature {
        script.push(Command::SetFeature {
            feature: feature.clone(),
        });
        script.push(Command::Distribution);
    }
    script
}

/// Scripted mode: upload, run every action the provided selections allow,
/// print, exit. Text mode streams report lines; JSON mode prints one
/// document at the end.
async fn run_oneshot(args: Cli) -> Result<()> {
    let Some(file) = args.file.clone() else {
        return Err(anyhow::anyhow!("a dataset file is required; pass --file"));
    };

    let config = build_config(&args);
    let api = Arc::new(HttpAnalysisClient::new(&config)?);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
    let controller_handle = tokio::spawn(Controller::new(api, event_tx).run(cmd_rx));

    let (out_tx, out_handle) = spawn_output_writer();

    let mut json_out = serde_json::Map::new();
    let mut last_snapshot: Option<SessionSnapshot> = None;
    let mut failed: Option<(ActionKind, WorkflowError)> = None;

    'script: for step in build_script(&args, file) {
        let Some(kind) = step.kind() else { continue };
        cmd_tx
            .send(step)
            .map_err(|_| anyhow::anyhow!("workflow controller stopped early"))?;

        loop {
            let event = event_rx
                .recv()
                .await
                .context("event channel closed before the script finished")?;
            match event {
                WorkflowEvent::ActionStarted { kind: k } if k == kind && !args.json => {
                    let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", k.label())));
                }
                WorkflowEvent::ActionFailed { kind: k, error } if k == kind => {
                    failed = Some((k, error));
                    break 'script;
                }
                WorkflowEvent::ActionCompleted { kind: k, payload } if k == kind && args.json => {
                    json_out.insert(kind.key().to_string(), serde_json::to_value(&payload)?);
                }
                WorkflowEvent::Rendered { kind: k, plan } if k == kind => {
                    if !args.json {
                        for line in report::build_text_report(&plan) {
                            let _ = out_tx.send(OutputLine::Stdout(line));
                        }
                    }
                    break;
                }
                WorkflowEvent::SessionUpdated { snapshot } => {
                    last_snapshot = Some(snapshot);
                    // Selection commands have no render step; the session
                    // update is their completion.
                    if matches!(kind, ActionKind::SelectTarget | ActionKind::SetFeature) {
                        break;
                    }
                }
                WorkflowEvent::Info(message) if !args.json => {
                    let _ = out_tx.send(OutputLine::Stderr(message));
                }
                _ => {}
            }
        }
    }

    let _ = cmd_tx.send(Command::Quit);
    let _ = controller_handle.await;

    if args.json && failed.is_none() {
        if let Some(snapshot) = &last_snapshot {
            json_out.insert("session".to_string(), serde_json::to_value(snapshot)?);
        }
        let out = serde_json::to_string_pretty(&serde_json::Value::Object(json_out))?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }

    drop(out_tx);
    let _ = out_handle.await;

    if let Some((kind, error)) = failed {
        return Err(anyhow::anyhow!("{} failed: {error}", kind.label()));
    }
    Ok(())
}
