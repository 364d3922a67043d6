use clap::Parser;
use stagefs_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    stagefs_cli::logging::init(cli.verbose);

    if let Err(e) = stagefs_cli::run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
