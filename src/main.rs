//! CLI entry point for MUSICAL super-resolution of frame stacks

use clap::Parser;
use musical::io::cli::{Cli, StackProcessor};

fn main() -> musical::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    StackProcessor::new(cli).process()
}
