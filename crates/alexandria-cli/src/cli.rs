use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "alexandria",
    about = "Alexandria wiki operator tool",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overriding the configuration and environment
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the first administrator account
    Setup(SetupArgs),
    /// Manage user accounts
    User(UserArgs),
    /// Read and edit articles
    Article(ArticleArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct SetupArgs {
    pub email: String,
    pub display_name: String,
    /// Read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// List all accounts
    List,
    /// Add an account
    Add {
        email: String,
        display_name: String,
        #[arg(long)]
        admin: bool,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete an account and end its sessions
    Delete {
        /// Numeric id or email
        user: String,
    },
    /// Set a new password
    Passwd {
        /// Numeric id or email
        user: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Args)]
pub struct ArticleArgs {
    #[command(subcommand)]
    pub action: ArticleAction,
}

#[derive(Subcommand)]
pub enum ArticleAction {
    /// Show an article or list a category
    Show {
        #[arg(default_value = "")]
        path: String,
        /// Print rendered HTML instead of Markdown
        #[arg(long)]
        html: bool,
    },
    /// Write an article from a file or stdin
    Write {
        path: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete an article
    Rm { path: String },
    /// List every article
    Ls,
}
