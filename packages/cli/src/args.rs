use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stagefs_transcode::TranscodeOptions;

/// stagefs - preview Scratch projects as Leopard bundles
#[derive(Parser, Debug)]
#[command(name = "stagefs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Relay configuration (JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more detail. RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the Leopard bundle for a project.
    Transcode(TranscodeArgs),
    /// Generate a project's bundle and fetch paths through the relay.
    Preview(PreviewArgs),
    /// Save to or load from the storage slot.
    Slot(SlotArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateFlags {
    /// Add a green-flag button to the document.
    #[arg(long)]
    pub include_green_flag: bool,

    /// Do not start the project when the document loads.
    #[arg(long)]
    pub no_autoplay: bool,

    /// Module URL of the runtime library.
    #[arg(long)]
    pub library_url: Option<String>,
}

impl GenerateFlags {
    pub fn options(&self) -> TranscodeOptions {
        let mut options = TranscodeOptions {
            include_green_flag: self.include_green_flag,
            autoplay: !self.no_autoplay,
            ..TranscodeOptions::default()
        };
        if let Some(url) = &self.library_url {
            options.library_url = url.clone();
        }
        options
    }
}

#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Project file (.sb3).
    pub project: PathBuf,

    /// Output directory.
    #[arg(long)]
    pub out: PathBuf,

    #[command(flatten)]
    pub flags: GenerateFlags,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Project file (.sb3). Generated files land next to it.
    pub project: PathBuf,

    /// Paths under the relay origin (or full URLs) to request after the
    /// document.
    pub paths: Vec<String>,

    #[command(flatten)]
    pub flags: GenerateFlags,
}

#[derive(Args, Debug)]
pub struct SlotArgs {
    /// Slot directory.
    #[arg(long, default_value = "storage-server/data", conflicts_with = "server")]
    pub root: PathBuf,

    /// Use a storage server instead of a local directory.
    #[arg(long)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: SlotCommand,
}

#[derive(Subcommand, Debug)]
pub enum SlotCommand {
    /// Store a project with its generated files.
    Save {
        /// Project file (.sb3).
        project: PathBuf,

        /// Previously generated files; transcoded fresh when omitted.
        #[arg(long)]
        leopard: Option<PathBuf>,

        #[command(flatten)]
        flags: GenerateFlags,
    },
    /// Restore the stored project and files into a directory.
    Load {
        #[arg(long)]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_flags_map_to_options() {
        let cli = Cli::parse_from([
            "stagefs",
            "transcode",
            "game.sb3",
            "--out",
            "out",
            "--include-green-flag",
            "--no-autoplay",
            "--library-url",
            "./leopard.js",
        ]);
        let Command::Transcode(args) = cli.command else {
            panic!("expected transcode");
        };
        let options = args.flags.options();
        assert!(options.include_green_flag);
        assert!(!options.autoplay);
        assert_eq!(options.library_url, "./leopard.js");
        assert_eq!(options.frame_rate, TranscodeOptions::default().frame_rate);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["stagefs", "preview", "game.sb3", "-vv", "--config", "relay.json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("relay.json")));
    }
}
