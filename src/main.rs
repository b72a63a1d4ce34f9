use clap::Parser;

use earthview::{Cli, EarthApp, SceneConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = SceneConfig::from_cli(&cli);
    log::info!("Loading assets from {}", cli.assets.display());

    EarthApp::new(config)?.run()
}
