use std::io;

use anyhow::Result;
use clap::Parser;
use site_forge::{init_logging, ForgeConfig};
use site_forge_cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.apply_to(ForgeConfig::from_env()?)?;
    init_logging(&config);

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    run(&cli, &config, &mut stdin, &mut stdout)
}
