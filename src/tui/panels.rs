use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::state::{push_wrapped_status_kv, InputMode, UiState};
use crate::model::WorkflowStage;
use crate::render::{RenderItem, RenderPlan};
use crate::report;

pub fn draw_workflow(area: Rect, f: &mut Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(10),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[0]);

    draw_session(top[0], f, state);
    draw_columns(top[1], f, state);
    draw_activity(rows[1], f, state);
    draw_status(rows[2], f, state);
}

pub fn draw_results(area: Rect, f: &mut Frame, state: &UiState) {
    if state.show_visualization {
        if let Some(plan) = &state.viz_plan {
            let wanted = (plan_line_count(plan) as u16).saturating_add(2);
            let viz_height = wanted.min(area.height / 2).max(3);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(viz_height), Constraint::Min(0)].as_ref())
                .split(area);
            draw_plan(rows[0], f, plan, None);
            draw_exploration(rows[1], f, state);
            return;
        }
    }
    draw_exploration(area, f, state);
}

fn draw_session(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let dataset = state
        .snapshot
        .dataset
        .as_deref()
        .unwrap_or("(none - press u to upload)");
    push_wrapped_status_kv(&mut lines, "Dataset", dataset, area.width);
    if !state.snapshot.columns.is_empty() {
        push_wrapped_status_kv(
            &mut lines,
            "Columns",
            &state.snapshot.columns.len().to_string(),
            area.width,
        );
    }
    push_wrapped_status_kv(
        &mut lines,
        "Target",
        state.snapshot.target.as_deref().unwrap_or("(none)"),
        area.width,
    );
    push_wrapped_status_kv(
        &mut lines,
        "Feature",
        state.snapshot.feature.as_deref().unwrap_or("(none)"),
        area.width,
    );
    push_wrapped_status_kv(&mut lines, "Stage", stage_label(state.snapshot.stage), area.width);
    if let Some(kind) = state.busy {
        lines.push(Line::from(Span::styled(
            format!("Working: {}...", kind.label()),
            Style::default().fg(Color::Yellow),
        )));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(p, area);
}

fn stage_label(stage: WorkflowStage) -> &'static str {
    match stage {
        WorkflowStage::Idle => "idle",
        WorkflowStage::DatasetReady => "dataset ready",
        WorkflowStage::Analyzed => "analyzed",
    }
}

fn draw_columns(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();
    if state.snapshot.columns.is_empty() {
        lines.push(Line::from("No columns yet."));
        lines.push(Line::from("Upload a dataset with 'u'."));
    } else {
        // Keep the cursor visible when the list is longer than the panel.
        let visible = (area.height.saturating_sub(2) as usize).max(1);
        let offset = state.target_cursor.saturating_sub(visible - 1);
        for (i, column) in state
            .snapshot
            .columns
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
        {
            let marker = if state.snapshot.target.as_deref() == Some(column.as_str()) {
                "*"
            } else {
                " "
            };
            if i == state.target_cursor {
                lines.push(Line::from(Span::styled(
                    format!("> {marker} {column}"),
                    Style::default().fg(Color::Yellow),
                )));
            } else {
                lines.push(Line::from(format!("  {marker} {column}")));
            }
        }
    }

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Target column"),
    );
    f.render_widget(p, area);
}

fn draw_activity(area: Rect, f: &mut Frame, state: &UiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.activity.len().saturating_sub(visible);
    let lines: Vec<Line> = state.activity[start..]
        .iter()
        .map(|entry| Line::from(entry.as_str()))
        .collect();

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Activity"));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let (title, line) = match state.input_mode {
        InputMode::UploadPath => (
            "Upload path (enter sends, esc cancels)",
            input_line(&state.input),
        ),
        InputMode::Feature => (
            "Feature name (enter sets, esc cancels)",
            input_line(&state.input),
        ),
        InputMode::None => ("Status", Line::from(state.info.clone())),
    };
    let p = Paragraph::new(vec![line]).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn input_line(input: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw(input.to_string()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ])
}

fn draw_exploration(area: Rect, f: &mut Frame, state: &UiState) {
    match &state.explore_plan {
        Some(plan) => draw_plan(area, f, plan, Some(state.explore_scroll)),
        None => {
            let p = Paragraph::new("Nothing to explore yet. Try summarize (s) or correlations (c).")
                .block(Block::default().borders(Borders::ALL).title("Exploration"));
            f.render_widget(p, area);
        }
    }
}

fn draw_plan(area: Rect, f: &mut Frame, plan: &RenderPlan, scroll: Option<u16>) {
    let mut p = Paragraph::new(plan_lines(plan)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(plan.title.clone()),
    );
    if let Some(y) = scroll {
        p = p.scroll((y, 0));
    }
    f.render_widget(p, area);
}

/// Styled lines for a plan's items; the title goes on the surrounding block.
pub fn plan_lines(plan: &RenderPlan) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for item in &plan.items {
        match item {
            RenderItem::Field { label, value } => lines.push(Line::from(vec![
                Span::styled(format!("{label}:"), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(value.clone()),
            ])),
            RenderItem::Image { label, reference } => lines.push(Line::from(vec![
                Span::styled(format!("{label}:"), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::styled(
                    report::image_preview(reference),
                    Style::default().fg(Color::Cyan),
                ),
            ])),
            RenderItem::Tree { label, lines: tree } => {
                lines.push(Line::from(Span::styled(
                    format!("{label}:"),
                    Style::default().fg(Color::Gray),
                )));
                for line in tree {
                    lines.push(Line::from(format!("  {line}")));
                }
            }
        }
    }
    lines
}

/// Rendered height of a plan's items, used to size the visualization panel.
pub fn plan_line_count(plan: &RenderPlan) -> usize {
    plan.items
        .iter()
        .map(|item| match item {
            RenderItem::Tree { lines, .. } => 1 + lines.len(),
            _ => 1,
        })
        .sum()
}
