use crate::app::{resolve_dir, AppContext};
use crate::cli::UnlockArgs;
use crate::ui::{hint, print, receipt, ProgressBar};

pub async fn handle_unlock(ctx: &AppContext, args: &UnlockArgs) -> anyhow::Result<()> {
    let ui = ctx.ui_context(false);
    let root = resolve_dir(args.dir.as_deref())?;
    let options = ctx.options(args.sequential, args.queue_depth)?;
    let journal = ctx.open(&root, options)?;

    let progress = ProgressBar::new(
        &ui,
        journal.pairs().len() as u64,
        "Decrypting",
        journal.root(),
    );
    let result = journal.unlock(progress.reporter()).await;
    progress.finish();
    let report = result?;

    print(
        &ui,
        &receipt(
            &ui,
            "Journal unlocked",
            &[
                ("Opened", report.opened.to_string()),
                ("Recorded", report.recorded.to_string()),
                ("Mode", report.mode.to_string()),
            ],
        ),
    );
    if report.opened > 0 {
        print(&ui, &hint(&ui, "Edit the plaintext files, then run `journal lock`."));
    }
    Ok(())
}
