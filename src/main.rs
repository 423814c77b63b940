use clap::Parser;
use criadouro_detection::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => cli::serve::run(args).await,
        Command::Detect(args) => cli::detect::run(args).await,
    }
}
