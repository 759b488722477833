use clap::Parser;

mod cli;
mod scene;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = cli::Options::parse();
    cli::run(options)
}
