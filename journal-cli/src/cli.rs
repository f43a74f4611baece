use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "journal")]
#[command(about = "Command-line client for Spring Journal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in with username and password
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Create a new account
    Signup {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Sign in with Google via the browser
    GoogleLogin,
    /// Remove the saved session
    Logout,
    /// Greeting, stats and recent entries
    Dashboard,
    /// List journal entries
    List {
        /// Only show entries whose title or content contains this text
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        oldest_first: bool,
    },
    /// Show one entry in full
    Show { id: String },
    /// Write a new entry. Content is read from stdin when --content is omitted
    New {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: Option<String>,
        /// Entry timestamp (RFC 3339), defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit an existing entry
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete an entry
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show profile and email settings
    Profile,
    /// Change the account password (and optionally the username)
    SetPassword {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Configure the email address and AI digest emails
    EmailSettings {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        sentiment_analysis: Option<bool>,
        #[arg(long)]
        journal_summarization: Option<bool>,
    },
    /// Permanently delete the account and all entries
    DeleteAccount,
    /// Print config path and create default file if missing
    ConfigPath,
}
