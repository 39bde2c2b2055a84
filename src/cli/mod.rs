//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches into the
//! auth flows, the repository operations, and the interactive chat
//! shell.

pub mod chat;

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::{AuthService, TokenStore};
use crate::core::client::{ApiClient, ApiError};
use crate::core::config::Config;
use crate::core::message::EntryBody;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(about = "A terminal client for the Repolens repository-analysis service")]
#[command(
    long_about = "Repolens analyses source-code repositories and lets you chat with an AI \
about the result.\n\n\
Typical flow:\n\
  repolens register          Create an account (or `repolens login`)\n\
  repolens analyse <url>     Submit a repository for analysis\n\
  repolens chat <repo-id>    Chat about the analysed repository\n\n\
Chat commands:\n\
  /basic            Show basic repository analysis\n\
  /files            Show the extracted file structure\n\
  /ai               Show the AI analysis report\n\
  /quit             Leave the chat\n\n\
Configuration:\n\
  The API base URL is read from REPOLENS_API_URL, falling back to the\n\
  config file (`repolens set base-url <url>`) and then to\n\
  http://localhost:8000/api/v1."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with your Repolens account
    Login,
    /// Create a Repolens account
    Register,
    /// Log out and clear stored credentials
    Logout,
    /// Submit a repository URL for analysis
    Analyse {
        /// Repository URL, e.g. https://github.com/owner/name
        url: String,
    },
    /// List repositories you have analysed before
    History {
        /// Filter term
        query: Option<String>,
    },
    /// Chat about an analysed repository
    Chat {
        repo_id: String,
        /// Append the chat transcript to the given file
        #[arg(short = 'l', long)]
        log: Option<String>,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set (currently: base-url)
        key: String,
        value: String,
    },
    /// Unset configuration values
    Unset {
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;
    let client = Arc::new(ApiClient::new(
        config.resolve_base_url(),
        Arc::new(TokenStore::new()),
    ));

    match args.command {
        Commands::Login => {
            let email = prompt("Email: ")?;
            let password = prompt("Password: ")?;
            let auth = AuthService::new(Arc::clone(&client));
            match auth.login(&email, &password).await {
                Ok(user) => println!("Logged in as {} <{}>", user.username, user.email),
                Err(err) => {
                    eprintln!("❌ Login failed: {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Register => {
            let username = prompt("Username: ")?;
            let email = prompt("Email: ")?;
            let password = prompt("Password: ")?;
            let auth = AuthService::new(Arc::clone(&client));
            match auth.register(&username, &email, &password).await {
                Ok(message) => println!("✅ {message}"),
                Err(err) => {
                    eprintln!("❌ Registration failed: {err}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Logout => {
            let auth = AuthService::new(Arc::clone(&client));
            if let Err(err) = auth.logout().await {
                eprintln!("❌ Logout failed: {err}");
                std::process::exit(1);
            }
            println!("Logged out.");
            Ok(())
        }
        Commands::Analyse { url } => run_analyse(&client, &url).await,
        Commands::History { query } => run_history(&client, query.as_deref()).await,
        Commands::Chat { repo_id, log } => chat::run_chat(client, &repo_id, log).await,
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "base-url" => {
                    config.base_url = Some(value.clone());
                    config.save()?;
                    println!("base-url set to {value}");
                    Ok(())
                }
                other => {
                    eprintln!("Unknown configuration key: {other}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "base-url" => {
                    config.base_url = None;
                    config.save()?;
                    println!("base-url unset");
                    Ok(())
                }
                other => {
                    eprintln!("Unknown configuration key: {other}");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn run_analyse(client: &ApiClient, url: &str) -> Result<(), Box<dyn Error>> {
    let envelope = match client.analyse(url).await {
        Ok(envelope) => envelope,
        Err(ApiError::Unauthenticated) => {
            eprintln!("Not logged in. Run `repolens login` first.");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    if !envelope.success {
        let message = if envelope.message.trim().is_empty() {
            "analysis request was rejected".to_string()
        } else {
            envelope.message
        };
        eprintln!("❌ {message}");
        std::process::exit(1);
    }

    match envelope.data {
        Some(data) => {
            println!("{}", EntryBody::BasicInfo(data.basic_info.clone()).render_text());
            println!();
            println!("Chat about it with: repolens chat {}", data.basic_info.id);
        }
        None => println!("✅ Analysis started."),
    }
    Ok(())
}

async fn run_history(client: &ApiClient, query: Option<&str>) -> Result<(), Box<dyn Error>> {
    let envelope = match client.repo_history(query).await {
        Ok(envelope) => envelope,
        Err(ApiError::Unauthenticated) => {
            eprintln!("Not logged in. Run `repolens login` first.");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    let Some(page) = envelope.data else {
        println!("No analysed repositories yet.");
        return Ok(());
    };
    if page.data.is_empty() {
        println!("No analysed repositories yet.");
        return Ok(());
    }

    for info in &page.data {
        let description = info.description.as_deref().unwrap_or_default();
        println!("{}  {} ({})  {}", info.id, info.name, info.owner, description);
    }
    if let Some(page_info) = page.page_info {
        if page_info.total_pages > 1 {
            println!(
                "page {} of {} ({} repositories)",
                page_info.current_page, page_info.total_pages, page_info.total_records
            );
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String, Box<dyn Error>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
