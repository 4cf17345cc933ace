//! Journal CLI - lock and unlock a directory of encrypted notes
//!
//! This is the command-line interface for Journal. It provides a user-friendly
//! interface to the core library functionality.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod logging;
mod ui;

use clap::Parser;
use journal_core::{JournalError, VERSION};

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{init, lock, misc, status, unlock};
use crate::errors::CliError;
use crate::ui::{badge, hint, print_error, Badge, UiContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        let ui_ctx = UiContext::from_env(false, cli.no_color, cli.ascii, cli.quiet);

        // Not an error from the user's point of view: explain and exit cleanly.
        if let Some(JournalError::NotInitialized { root }) = e.downcast_ref::<JournalError>() {
            eprintln!(
                "{}",
                badge(
                    &ui_ctx,
                    Badge::Info,
                    &format!("{} is not a journal yet (no .gpgid file).", root.display())
                )
            );
            eprintln!(
                "{}",
                hint(&ui_ctx, "Run `journal init --recipient <key-id>` in that directory.")
            );
            return;
        }

        let err = CliError::from_anyhow(&e);
        print_error(&ui_ctx, err.message(), err.hint());
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::new(cli)?;
    logging::init_logging(ctx.log_level(), ctx.log_format());

    match &cli.command {
        Some(Commands::Init(args)) => init::handle_init(&ctx, args)?,
        Some(Commands::Unlock(args)) => unlock::handle_unlock(&ctx, args).await?,
        Some(Commands::Lock(args)) => lock::handle_lock(&ctx, args).await?,
        Some(Commands::Status(args)) => status::handle_status(&ctx, args)?,
        Some(Commands::Completions(args)) => misc::handle_completions(args)?,
        None => {
            println!("Journal v{}", VERSION);
            println!("\nQuickstart:");
            println!("  journal init --recipient you@example.com");
            println!("  journal unlock");
            println!("  journal status");
            println!("  journal lock");
            println!("\nRun `journal --help` for full usage.");
        }
    }

    Ok(())
}
