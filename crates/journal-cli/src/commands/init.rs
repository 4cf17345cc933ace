use journal_core::Journal;

use crate::app::{resolve_dir, AppContext};
use crate::cli::InitArgs;
use crate::ui::{hint, print, receipt};

pub fn handle_init(ctx: &AppContext, args: &InitArgs) -> anyhow::Result<()> {
    let ui = ctx.ui_context(false);
    let root = resolve_dir(args.dir.as_deref())?;

    let path = Journal::init(&root, &args.recipient, args.force)?;

    print(
        &ui,
        &receipt(
            &ui,
            "Journal initialized",
            &[
                ("Recipient", args.recipient.trim().to_string()),
                ("Identity file", path.display().to_string()),
            ],
        ),
    );
    print(&ui, &hint(&ui, "Add `name.gpg` files, then run `journal unlock` to edit them."));
    Ok(())
}
