//! Progress display for unlock using indicatif.
//!
//! The core engine reports progress from worker threads, so the reporter
//! handed to it owns a clone of the indicatif bar (which is thread-safe).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use journal_core::ProgressFn;

use super::context::UiContext;

/// A progress bar for determinate progress.
///
/// On a TTY in pretty mode this draws a bar; in plain mode each completed
/// file is printed on its own line; in JSON or quiet mode nothing is shown.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    line_per_item: bool,
    root: PathBuf,
}

impl ProgressBar {
    pub fn new(ctx: &UiContext, total: u64, message: &str, root: &Path) -> Self {
        let bar = if ctx.allows_animation() {
            let pb = IndicatifBar::new(total);
            let template = if ctx.unicode {
                "{msg} [{bar:20.cyan/dim}] {pos}/{len}"
            } else {
                "{msg} [{bar:20}] {pos}/{len}"
            };
            let style = ProgressStyle::default_bar()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(if ctx.unicode { "━━─" } else { "=>-" });
            pb.set_style(style);
            pb.set_message(message.to_string());
            Some(pb)
        } else {
            None
        };

        Self {
            bar,
            line_per_item: !ctx.mode.is_json() && !ctx.quiet && !ctx.allows_animation(),
            root: root.to_path_buf(),
        }
    }

    /// Callback for the engine, or `None` when there is nothing to show.
    pub fn reporter(&self) -> Option<ProgressFn> {
        if let Some(bar) = &self.bar {
            let bar = bar.clone();
            return Some(Arc::new(move |done: usize, _total: usize, _path: &Path| {
                bar.set_position(done as u64);
            }));
        }
        if self.line_per_item {
            let root = self.root.clone();
            return Some(Arc::new(move |_done: usize, _total: usize, path: &Path| {
                let shown = path.strip_prefix(&root).unwrap_or(path);
                println!("decrypted={}", shown.display());
            }));
        }
        None
    }

    /// Finish progress bar (clears the line).
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
