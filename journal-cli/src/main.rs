mod cli;
mod commands;
mod config;
mod login;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::JournalConfig;
use spring_journal::lifecycle::{Route, SessionLifecycle};
use spring_journal::session::FileSessionStore;
use spring_journal::{ApiError, JournalClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("journal=warn,spring_journal=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Works even when the config holds a bad api_url.
    if let Commands::ConfigPath = cli.command {
        return match print_config_path() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    let client = match build_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&client, &e);
            ExitCode::FAILURE
        }
    }
}

fn build_client() -> Result<JournalClient> {
    let config = JournalConfig::load()?;
    let store = FileSessionStore::new(JournalConfig::root_path()?);
    let lifecycle = Arc::new(SessionLifecycle::new(Arc::new(store)));
    tracing::debug!(api_url = %config.api_url, "starting");
    Ok(JournalClient::new(&config.api_url, lifecycle, config.timeout())?)
}

fn print_config_path() -> Result<()> {
    println!("{}", JournalConfig::ensure_exists()?.display());
    Ok(())
}

async fn run(client: &JournalClient, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username } => commands::login(client, username).await,
        Commands::Signup { username } => commands::signup(client, username).await,
        Commands::GoogleLogin => {
            let config = JournalConfig::load()?;
            let session = login::run_google_login(client, &config).await?;
            println!("Signed in as {}.", session.username);
            Ok(())
        }
        Commands::Logout => commands::logout(client),
        Commands::Dashboard => commands::dashboard(client).await,
        Commands::List {
            search,
            oldest_first,
        } => commands::list(client, search, oldest_first).await,
        Commands::Show { id } => commands::show(client, id).await,
        Commands::New {
            title,
            content,
            date,
        } => commands::new_entry(client, title, content, date).await,
        Commands::Edit {
            id,
            title,
            content,
            date,
        } => commands::edit_entry(client, id, title, content, date).await,
        Commands::Delete { id, yes } => commands::delete_entry(client, id, yes).await,
        Commands::Profile => commands::profile(client).await,
        Commands::SetPassword { username } => commands::set_password(client, username).await,
        Commands::EmailSettings {
            email,
            sentiment_analysis,
            journal_summarization,
        } => {
            commands::email_settings(client, email, sentiment_analysis, journal_summarization)
                .await
        }
        Commands::DeleteAccount => commands::delete_account(client).await,
        Commands::ConfigPath => print_config_path(),
    }
}

fn report(client: &JournalClient, error: &anyhow::Error) {
    match error.downcast_ref::<ApiError>() {
        Some(api_error) => {
            tracing::debug!("{:?}", api_error);
            eprintln!("{}", api_error.user_message());
            if api_error.requires_sign_in() || client.lifecycle().current_route() == Route::Login {
                eprintln!("Run `journal login` to sign in.");
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}
