//! UI primitives for the Journal CLI.
//!
//! This module provides:
//! - **Context**: Environment detection (TTY, width, color, unicode)
//! - **Mode**: Output mode resolution (json, plain, pretty)
//! - **Theme**: Badge tokens and color styles
//! - **Render**: Tables, headers, receipts, hints
//! - **Progress**: Unlock progress bar
//!
//! # Usage
//!
//! ```ignore
//! use crate::ui::{UiContext, Badge};
//! use crate::ui::render::{header, table, hint};
//!
//! let ctx = UiContext::from_env(args.json, cli.no_color, cli.ascii, cli.quiet);
//!
//! if ctx.mode.is_json() {
//!     // Handle JSON output separately
//!     return Ok(());
//! }
//!
//! println!("{}", header(&ctx, "status", Some(&root)));
//! println!("{}", table(&ctx, &columns, &rows));
//! ```

mod context;
mod mode;
pub mod progress;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use mode::OutputMode;
pub use theme::Badge;

pub use render::{badge, header, hint, kv, print, print_error, receipt, table, Column};

pub use progress::ProgressBar;
