//! Trato CLI - negotiate marketplace deals from the command line.

mod cli;
mod commands;
mod error;
mod profiles;

use clap::Parser;
use trato_core::models::ConversationId;

use crate::cli::{Cli, Commands};
use crate::commands::common::{build_context, Context};
use crate::error::CliError;
use crate::profiles::CliProfilesConfig;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(error) = run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let store = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = store.resolve_profile_name(cli.profile.as_deref());

    match cli.command {
        Commands::Config { command } => commands::config::run(command, &profile_name),
        Commands::Login { user_id, token } => {
            commands::auth::run_login(&profile_name, user_id, token)
        }
        Commands::Logout => commands::auth::run_logout(&profile_name),
        Commands::Status => commands::auth::run_status(&profile_name),
        Commands::Conversations { json } => {
            let context = context_for(&store, &profile_name)?;
            commands::conversations::run(&context, json).await
        }
        Commands::Chat { conversation } => {
            let context = context_for(&store, &profile_name)?;
            commands::chat::run(&context, ConversationId(conversation)).await
        }
        Commands::Proposal { command } => {
            let context = context_for(&store, &profile_name)?;
            commands::proposal::run(&context, command).await
        }
        Commands::Validate {
            exchange,
            ok,
            failed,
            comment,
            rating,
        } => {
            let context = context_for(&store, &profile_name)?;
            commands::proposal::run_validate(&context, exchange, ok, failed, comment, rating).await
        }
        Commands::Completions { shell, output } => {
            commands::completions::run(shell, output.as_deref())
        }
    }
}

fn context_for(store: &CliProfilesConfig, profile_name: &str) -> Result<Context, CliError> {
    let profile = store.profile(profile_name).cloned().unwrap_or_default();
    build_context(&profile)
}
