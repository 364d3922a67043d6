//! The `stagefs` command-line tool.

pub mod args;
pub mod commands;
pub mod logging;

use anyhow::Context as _;
use stagefs_relay::RelayConfig;

pub use args::{Cli, Command, SlotCommand};

/// Run one parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => RelayConfig::default(),
    };

    match cli.command {
        Command::Transcode(args) => {
            let options = args.flags.options();
            let written = commands::transcode_to_dir(&args.project, &args.out, &options)?;
            eprintln!("wrote {} files to {}", written.len(), args.out.display());
        }
        Command::Preview(args) => {
            let served =
                commands::preview(&args.project, &args.paths, config, args.flags.options()).await?;
            for line in served {
                println!("{}", line);
            }
        }
        Command::Slot(args) => match args.command {
            SlotCommand::Save {
                project,
                leopard,
                flags,
            } => {
                let count = commands::slot_save(
                    &args.root,
                    args.server.as_deref(),
                    &project,
                    leopard.as_deref(),
                    &flags.options(),
                )
                .await?;
                eprintln!("stored {} with {} generated files", project.display(), count);
            }
            SlotCommand::Load { out } => {
                let written = commands::slot_load(&args.root, args.server.as_deref(), &out).await?;
                for path in written {
                    println!("{}", path.display());
                }
            }
        },
    }
    Ok(())
}
