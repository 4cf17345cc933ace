use journal_core::Journal;

use crate::app::{resolve_dir, AppContext};
use crate::cli::LockArgs;
use crate::ui::{print, receipt};

pub async fn handle_lock(ctx: &AppContext, args: &LockArgs) -> anyhow::Result<()> {
    let ui = ctx.ui_context(false);
    let root = resolve_dir(args.dir.as_deref())?;
    let journal = ctx.open(&root, ctx.options(false, None)?)?;

    // Lock shells out once per changed file; keep it off the async workers.
    let report = tokio::task::spawn_blocking(move || Journal::lock(&journal)).await??;

    let mut items = vec![
        ("Re-encrypted", report.resealed.len().to_string()),
        ("Unchanged", report.restored.len().to_string()),
        ("Plaintexts removed", report.removed_plaintexts.to_string()),
    ];
    if report.skipped > 0 {
        items.push(("Already sealed", report.skipped.to_string()));
    }
    print(&ui, &receipt(&ui, "Journal locked", &items));

    if !ui.mode.is_pretty() {
        for path in &report.resealed {
            print(&ui, &format!("resealed={}", path.display()));
        }
    }
    Ok(())
}
