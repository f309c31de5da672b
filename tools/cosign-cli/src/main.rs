use anyhow::Result;
use clap::Parser;
use cosign_cli::{cli::Cli, logging, run};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json)?;

    let output = run(cli).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
