use clap::Parser;

mod cli;
mod commands;
mod domain;
mod services;

pub use cli::{Category, Cli, Commands};
pub use domain::error::VaultError;
pub use domain::models::*;
pub use services::output::{print_one, print_out};
pub use services::{backup, config, lockmap, oplog, project, rules, validate};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        services::output::print_error(cli.json, &err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    if commands::handle_vault_commands(cli, &cfg)? {
        return Ok(());
    }
    if commands::handle_inspect_commands(cli, &cfg)? {
        return Ok(());
    }
    anyhow::bail!("unhandled command")
}
