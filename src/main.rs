use anyhow::Result;
use clap::Parser;
use pyqt4to5::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    pyqt4to5::commands::run(&cli.into_options())?;
    Ok(())
}
