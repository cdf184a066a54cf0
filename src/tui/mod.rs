mod export;
mod help;
mod panels;
mod state;

use crate::cli::{self, Cli};
use crate::client::HttpAnalysisClient;
use crate::model::WorkflowEvent;
use crate::orchestrator::{Command, Controller};
use crate::render::{RenderItem, Surface};
use crate::report;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Tabs},
    Terminal,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use state::{InputMode, UiState};

pub async fn run(args: Cli) -> Result<()> {
    let config = cli::build_config(&args);
    let api = Arc::new(HttpAnalysisClient::new(&config)?);

    // Unbounded channels avoid backpressure between UI and controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();

    if args.upload_on_launch {
        if let Some(file) = &args.file {
            let _ = cmd_tx.send(Command::Upload { path: file.clone() });
        }
    }

    // TUI runs in a dedicated thread to keep all blocking terminal I/O out
    // of the Tokio runtime.
    let ui_args = args.clone();
    let ui_cmd_tx = cmd_tx.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, ui_cmd_tx));
    // The UI thread now holds the only sender; if it dies without sending
    // Quit, the controller sees the channel close and stops.
    drop(cmd_tx);

    Controller::new(api, event_tx).run(cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }
    Ok(())
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<Command>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        pending_target: args.target.clone(),
        pending_feature: args.feature.clone(),
        path_prefill: args
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        ..Default::default()
    };
    state.info = if args.file.is_some() && args.upload_on_launch {
        "Uploading...".into()
    } else {
        "Press u to upload a dataset, ? for help".into()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, &cmd_tx, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                // Ctrl-C quits even while a prompt owns the keyboard.
                if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
                    let _ = cmd_tx.send(Command::Quit);
                    break Ok(());
                }
                if state.input_mode != InputMode::None {
                    handle_input_key(&mut state, &cmd_tx, k.code);
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) => {
                        let _ = cmd_tx.send(Command::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('u')) => {
                        state.input_mode = InputMode::UploadPath;
                        state.input = state.path_prefill.clone();
                    }
                    (_, KeyCode::Char('f')) => {
                        state.input_mode = InputMode::Feature;
                        state.input = state.snapshot.feature.clone().unwrap_or_default();
                    }
                    (_, KeyCode::Char('a')) => {
                        let _ = cmd_tx.send(Command::Analyze);
                    }
                    (_, KeyCode::Char('s')) => {
                        let _ = cmd_tx.send(Command::Summarize);
                    }
                    (_, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(Command::Correlation);
                    }
                    (_, KeyCode::Char('d')) => {
                        let _ = cmd_tx.send(Command::Distribution);
                    }
                    (_, KeyCode::Char('m')) => {
                        let _ = cmd_tx.send(Command::HandleMissing);
                    }
                    (_, KeyCode::Char('o')) => {
                        let _ = cmd_tx.send(Command::HandleOutliers);
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
                        if state.tab == 0 && state.target_cursor > 0 {
                            state.target_cursor -= 1;
                        }
                    }
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
                        if state.tab == 0 && state.target_cursor + 1 < state.snapshot.columns.len()
                        {
                            state.target_cursor += 1;
                        }
                    }
                    (_, KeyCode::Enter) => {
                        if state.tab == 0 {
                            if let Some(column) = state.snapshot.columns.get(state.target_cursor) {
                                let _ = cmd_tx.send(Command::SelectTarget {
                                    column: column.clone(),
                                });
                            } else {
                                state.info = "No columns yet; upload a dataset first (u)".into();
                            }
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        if let Some(reference) = state.last_image.clone() {
                            match export::copy_to_clipboard(&reference) {
                                Ok(()) => {
                                    state.info = "Image reference copied to clipboard".into();
                                }
                                Err(e) => {
                                    state.info = format!("Clipboard copy failed: {e:#}");
                                }
                            }
                        } else {
                            state.info =
                                "No image yet; run analyze (a) or distribution (d) first".into();
                        }
                    }
                    (_, KeyCode::Char('e')) => {
                        if let Some(plan) = state.last_report.clone() {
                            match export::export_report(&plan) {
                                Ok(p) => {
                                    state.info = format!("Exported: {}", p.display());
                                }
                                Err(e) => {
                                    state.info = format!("Export failed: {e:#}");
                                }
                            }
                        } else {
                            state.info = "No report to export yet".into();
                        }
                    }
                    (_, KeyCode::Char('v')) => {
                        state.show_visualization = !state.show_visualization;
                    }
                    (_, KeyCode::PageUp) => {
                        state.explore_scroll = state.explore_scroll.saturating_sub(10);
                    }
                    (_, KeyCode::PageDown) => {
                        let max = state.explore_lines.saturating_sub(1).min(u16::MAX as usize);
                        state.explore_scroll =
                            state.explore_scroll.saturating_add(10).min(max as u16);
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % 3;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = 2;
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Keys while a text prompt owns the keyboard. Enter commits, Esc cancels.
fn handle_input_key(state: &mut UiState, cmd_tx: &UnboundedSender<Command>, code: KeyCode) {
    match code {
        KeyCode::Enter => {
            let text = state.input.trim().to_string();
            match state.input_mode {
                InputMode::UploadPath => {
                    state.path_prefill = text.clone();
                    let _ = cmd_tx.send(Command::Upload {
                        path: PathBuf::from(text),
                    });
                }
                InputMode::Feature => {
                    let _ = cmd_tx.send(Command::SetFeature { feature: text });
                }
                InputMode::None => {}
            }
            state.input_mode = InputMode::None;
            state.input.clear();
        }
        KeyCode::Esc => {
            state.input_mode = InputMode::None;
            state.input.clear();
            state.info = "Cancelled".into();
        }
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Char(c) => state.input.push(c),
        _ => {}
    }
}

fn apply_event(state: &mut UiState, cmd_tx: &UnboundedSender<Command>, ev: WorkflowEvent) {
    match ev {
        WorkflowEvent::ActionStarted { kind } => {
            state.busy = Some(kind);
            state.info = format!("{} running...", kind.label());
            state.push_activity(format!("{} started", kind.label()));
        }
        WorkflowEvent::ActionCompleted { .. } => {
            // Session changes and render plans arrive as their own events.
        }
        WorkflowEvent::ActionFailed { kind, error } => {
            if state.busy == Some(kind) {
                state.busy = None;
            }
            state.info = error.to_string();
            state.push_activity(format!("{} failed: {error}", kind.label()));
        }
        WorkflowEvent::Rendered { kind, plan } => {
            if state.busy == Some(kind) {
                state.busy = None;
            }
            state.info = format!("{} ready", plan.title);
            state.last_report = Some(plan.clone());
            if let Some(reference) = plan.items.iter().find_map(|item| match item {
                RenderItem::Image { reference, .. } => Some(reference.clone()),
                _ => None,
            }) {
                state.last_image = Some(reference);
            }
            match plan.surface {
                Surface::Controls => {
                    for line in report::build_text_report(&plan) {
                        state.push_activity(line);
                    }
                }
                Surface::Visualization => {
                    state.viz_plan = Some(plan);
                    state.show_visualization = true;
                    if state.input_mode == InputMode::None {
                        state.tab = 1;
                    }
                }
                Surface::Exploration => {
                    state.explore_lines = panels::plan_line_count(&plan);
                    state.explore_plan = Some(plan);
                    state.explore_scroll = 0;
                    if state.input_mode == InputMode::None {
                        state.tab = 1;
                    }
                }
            }
        }
        WorkflowEvent::SessionUpdated { snapshot } => {
            let dataset_changed = state.snapshot.dataset != snapshot.dataset;
            state.snapshot = snapshot;
            if dataset_changed {
                state.target_cursor = 0;
            } else if state.target_cursor >= state.snapshot.columns.len() {
                state.target_cursor = state.snapshot.columns.len().saturating_sub(1);
            }
            // Apply launch selections once a dataset exists.
            if state.snapshot.dataset.is_some() {
                if let Some(column) = state.pending_target.take() {
                    let _ = cmd_tx.send(Command::SelectTarget { column });
                }
                if let Some(feature) = state.pending_feature.take() {
                    let _ = cmd_tx.send(Command::SetFeature { feature });
                }
            }
        }
        WorkflowEvent::Info(message) => {
            state.info = message.clone();
            state.push_activity(message);
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Workflow"),
        Line::from("Results"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("datalens"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => panels::draw_workflow(chunks[1], f, state),
        1 => panels::draw_results(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}
