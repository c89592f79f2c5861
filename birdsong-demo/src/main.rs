mod cli;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let options = cli::Options::parse();

    let level = if options.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    cli::run_scene(&options)
}
