use std::fs;
use std::io::{self, BufRead, Read};

use alexandria_auth::User;
use alexandria_types::{Timestamp, UserId};
use alexandria_wiki::{Page, Wiki, WikiConfig};
use anyhow::{anyhow, bail, Context};
use chrono::DateTime;
use colored::Colorize;
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = effective_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Config => cmd_config(&config, format),
        Command::Setup(args) => cmd_setup(&open(config)?, args, format),
        Command::User(args) => cmd_user(&open(config)?, args.action, format),
        Command::Article(args) => cmd_article(&open(config)?, args.action, format),
    }
}

fn effective_config(cli: &Cli) -> anyhow::Result<WikiConfig> {
    let mut config = WikiConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_path = dir.clone();
    }
    Ok(config)
}

fn open(config: WikiConfig) -> anyhow::Result<Wiki> {
    Wiki::open(config).context("opening wiki data")
}

/// JSON shape of an account; never includes the password record.
#[derive(Serialize)]
struct UserView {
    id: UserId,
    email: String,
    display_name: String,
    admin: bool,
    created_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            admin: user.admin,
            created_at: format_time(user.created_at),
        }
    }
}

fn format_time(ts: Timestamp) -> String {
    DateTime::from_timestamp(ts.as_secs(), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Use `given`, or read one line from stdin.
fn password_or_stdin(given: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given");
    }
    Ok(password)
}

/// Find an account by numeric id, falling back to email.
fn find_user(wiki: &Wiki, needle: &str) -> anyhow::Result<User> {
    if let Ok(id) = needle.parse::<UserId>() {
        if let Some(user) = wiki.credentials().user(id)? {
            return Ok(user);
        }
    }
    wiki.credentials()
        .user_by_email(needle.trim())?
        .ok_or_else(|| anyhow!("no user matches {needle:?}"))
}

fn cmd_config(config: &WikiConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            println!("{}", "# effective configuration".dimmed());
            println!("# content: {}", config.content_path().display());
            println!("# users:   {}", config.user_storage_path().display());
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn cmd_setup(wiki: &Wiki, args: SetupArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !wiki.needs_setup()? {
        bail!("the wiki already has accounts; use `alexandria user add`");
    }
    let password = password_or_stdin(args.password)?;
    let session = wiki.setup(&args.email, &args.display_name, &password, &password)?;
    // The CLI has no use for the session itself.
    wiki.logout(&session.token)?;

    let admin = wiki
        .credentials()
        .user(session.user_id)?
        .ok_or_else(|| anyhow!("administrator vanished after setup"))?;
    match format {
        OutputFormat::Json => print_json(&UserView::from(&admin)),
        OutputFormat::Text => {
            println!(
                "{} Created administrator {} (id {})",
                "✓".green().bold(),
                admin.email.bold(),
                admin.id
            );
            Ok(())
        }
    }
}

fn cmd_user(wiki: &Wiki, action: UserAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        UserAction::List => {
            let users = wiki.credentials().users()?;
            if format == OutputFormat::Json {
                let views: Vec<UserView> = users.iter().map(UserView::from).collect();
                return print_json(&views);
            }
            if users.is_empty() {
                println!("No users. Run `alexandria setup` first.");
            }
            for user in &users {
                let role = if user.admin {
                    "admin".yellow().to_string()
                } else {
                    "user".normal().to_string()
                };
                println!(
                    "{:>10}  {}  {} [{}]  {}",
                    user.id.to_string().cyan(),
                    user.email.bold(),
                    user.display_name,
                    role,
                    format_time(user.created_at).dimmed()
                );
            }
            Ok(())
        }
        UserAction::Add {
            email,
            display_name,
            admin,
            password,
        } => {
            let password = password_or_stdin(password)?;
            let user = wiki.provision_user(&email, &display_name, &password, admin)?;
            match format {
                OutputFormat::Json => print_json(&UserView::from(&user)),
                OutputFormat::Text => {
                    println!(
                        "{} Added {} (id {})",
                        "✓".green().bold(),
                        user.email.bold(),
                        user.id
                    );
                    Ok(())
                }
            }
        }
        UserAction::Delete { user } => {
            let target = find_user(wiki, &user)?;
            wiki.delete_account(target.id)?;
            println!("Deleted {}", target.email.bold());
            Ok(())
        }
        UserAction::Passwd { user, password } => {
            let target = find_user(wiki, &user)?;
            let password = password_or_stdin(password)?;
            wiki.reset_password(target.id, &password)?;
            println!("{} Password changed for {}", "✓".green().bold(), target.email.bold());
            Ok(())
        }
    }
}

/// JSON shape of an article.
#[derive(Serialize)]
struct ArticleView {
    path: String,
    title: String,
    last_edited_at: String,
    content: String,
    html: String,
}

fn cmd_article(wiki: &Wiki, action: ArticleAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        ArticleAction::Show { path, html } => match wiki.view(&path)? {
            Page::Article {
                article,
                html: rendered,
                ..
            } => {
                let content = String::from_utf8_lossy(&article.content).into_owned();
                match format {
                    OutputFormat::Json => print_json(&ArticleView {
                        path: article.path.to_string(),
                        title: article.title().to_string(),
                        last_edited_at: format_time(article.last_edited_at()),
                        content,
                        html: rendered,
                    }),
                    OutputFormat::Text => {
                        println!("{}", article.title().bold());
                        println!(
                            "{}",
                            format!("last edited {}", format_time(article.last_edited_at()))
                                .dimmed()
                        );
                        println!();
                        print!("{}", if html { rendered } else { content });
                        Ok(())
                    }
                }
            }
            Page::Category(category) => match format {
                OutputFormat::Json => print_json(&category),
                OutputFormat::Text => {
                    println!("{}", category.path.to_string().bold());
                    for entry in &category.entries {
                        println!("  {entry}");
                    }
                    Ok(())
                }
            },
        },
        ArticleAction::Write { path, file } => {
            let content = match file {
                Some(file) => fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let article = wiki.save_article(&path, &content)?;
            println!(
                "{} Wrote {} ({} bytes)",
                "✓".green().bold(),
                article.path.to_string().bold(),
                article.content.len()
            );
            Ok(())
        }
        ArticleAction::Rm { path } => {
            wiki.delete_article(&path)?;
            println!("Removed {}", path.bold());
            Ok(())
        }
        ArticleAction::Ls => {
            let paths: Vec<String> = wiki.articles()?.into_iter().map(String::from).collect();
            match format {
                OutputFormat::Json => print_json(&paths),
                OutputFormat::Text => {
                    for path in &paths {
                        println!("{path}");
                    }
                    Ok(())
                }
            }
        }
    }
}
