use anyhow::Result;
use clap::Parser;
use svm_engine::cli::Cli;
use svm_engine::launcher;

fn main() -> Result<()> {
    env_logger::init();
    launcher::execute(Cli::parse())
}
