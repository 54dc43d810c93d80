use clap::Parser;
use idolboard_server::config::{Cli, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = ServerConfig::load(&cli)?;
    log::info!(
        "idolboard listening on http://{} (mods: {}, db: {})",
        config.addr,
        config.mods_dir.display(),
        config.db_path.display()
    );
    idolboard_server::serve(config).await
}
