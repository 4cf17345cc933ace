use journal_core::{JournalStatus, PairState};

use crate::app::{resolve_dir, AppContext};
use crate::cli::StatusArgs;
use crate::ui::theme::{styled, styles};
use crate::ui::{badge, header, hint, kv, print, table, Badge, Column, UiContext};

pub fn handle_status(ctx: &AppContext, args: &StatusArgs) -> anyhow::Result<()> {
    let ui = ctx.ui_context(args.json);
    let root = resolve_dir(args.dir.as_deref())?;
    let journal = ctx.open(&root, ctx.options(false, None)?)?;
    let status = journal.status()?;

    if ui.mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    render_status(&ui, &status);
    Ok(())
}

fn render_status(ui: &UiContext, status: &JournalStatus) {
    let root = status.root.display().to_string();
    print(ui, &header(ui, "status", Some(&root)));
    print(ui, &kv(ui, "Recipient", &status.recipient));

    if status.files.is_empty() {
        print(ui, &badge(ui, Badge::Info, "No encrypted entries found"));
        return;
    }

    let rows: Vec<Vec<String>> = status
        .files
        .iter()
        .map(|file| {
            vec![
                state_label(ui, file.state),
                file.encrypted.display().to_string(),
            ]
        })
        .collect();
    print(ui, &table(ui, &[Column::new("State"), Column::new("File")], &rows));

    let summary = format!(
        "{} sealed, {} open, {} modified, {} missing",
        status.count(PairState::Sealed),
        status.count(PairState::Open),
        status.count(PairState::Modified),
        status.count(PairState::Missing),
    );
    let kind = if status.count(PairState::Missing) > 0 {
        Badge::Warn
    } else if status.is_unlocked() {
        Badge::Info
    } else {
        Badge::Ok
    };
    print(ui, &badge(ui, kind, &summary));

    if status.is_unlocked() && !status.checklist {
        print(
            ui,
            &hint(ui, "No .check file; `journal lock` will refuse until the journal is unlocked again."),
        );
    } else if status.is_unlocked() {
        print(ui, &hint(ui, "Run `journal lock` when you are done editing."));
    }
}

fn state_label(ui: &UiContext, state: PairState) -> String {
    let label = state.to_string();
    if !ui.mode.is_pretty() {
        return label;
    }
    let style = match state {
        PairState::Sealed => styles::green(),
        PairState::Open => styles::cyan(),
        PairState::Modified => styles::yellow(),
        PairState::Missing => styles::red(),
    };
    styled(&label, style, ui.color)
}
