use clap::Parser;
use llm_pipelines::cli::{self, Cli};
use llm_pipelines::config::Settings;
use llm_pipelines::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.apply(Settings::from_env()?);
    logging::init(&settings.log_level, cli.verbose);

    cli::run(cli, settings).await
}
