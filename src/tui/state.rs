use crate::model::{ActionKind, SessionSnapshot};
use crate::render::RenderPlan;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use time::macros::format_description;

/// Which prompt currently owns keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    None,
    UploadPath,
    Feature,
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub snapshot: SessionSnapshot,
    /// Action whose completion the status line is waiting on.
    pub busy: Option<ActionKind>,

    pub target_cursor: usize,
    pub input_mode: InputMode,
    pub input: String,
    pub path_prefill: String,

    pub viz_plan: Option<RenderPlan>,
    pub show_visualization: bool,
    pub explore_plan: Option<RenderPlan>,
    pub explore_scroll: u16,
    pub explore_lines: usize,

    pub activity: Vec<String>,
    pub last_image: Option<String>,
    pub last_report: Option<RenderPlan>,

    // Selections passed on the command line, applied after the first upload.
    pub pending_target: Option<String>,
    pub pending_feature: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            snapshot: SessionSnapshot::default(),
            busy: None,
            target_cursor: 0,
            input_mode: InputMode::None,
            input: String::new(),
            path_prefill: String::new(),
            viz_plan: None,
            show_visualization: false,
            explore_plan: None,
            explore_scroll: 0,
            explore_lines: 0,
            activity: Vec::new(),
            last_image: None,
            last_report: None,
            pending_target: None,
            pending_feature: None,
        }
    }
}

impl UiState {
    pub fn push_activity(&mut self, message: impl Into<String>) {
        const MAX: usize = 200;
        let stamp = time::OffsetDateTime::now_utc()
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| "now".into());
        self.activity.push(format!("[{stamp}] {}", message.into()));
        if self.activity.len() > MAX {
            let _ = self.activity.drain(0..(self.activity.len() - MAX));
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}
