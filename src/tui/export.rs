use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use crate::render::RenderPlan;
use crate::report;

// Clipboard writes go through one background thread, created on first use.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Write the plan's text report to the working directory and return the
/// absolute path. Image references are written in full so they can be opened
/// outside the terminal.
pub fn export_report(plan: &RenderPlan) -> Result<PathBuf> {
    // Timestamped filename; ':' is not portable in file names.
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
        .replace(':', "-");
    let name = format!("datalens-report-{timestamp}.txt");

    let path = std::env::current_dir()
        .context("get current directory")?
        .join(name);

    let mut body = report::build_text_report(plan).join("\n");
    body.push('\n');
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Start the clipboard thread if it is not running yet. Each queued write
/// holds its clipboard instance for a couple of seconds: on Linux the
/// contents live in the owning process, and dropping the instance right
/// after set_text loses them before clipboard managers can read.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard and return immediately; the background
/// thread does the holding.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
