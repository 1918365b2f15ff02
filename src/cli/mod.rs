//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches to the command
//! handlers. Every command builds the same session store + gateway pair; the
//! gateway hides token attachment and refresh from the handlers entirely.

pub mod conversation_list;
pub mod model_list;
pub mod say;

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::images::ImageRequest;
use crate::api::{auth, conversations, images};
use crate::cli::conversation_list::{list_conversations, show_messages};
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::core::gateway::ApiGateway;
use crate::core::session::{SessionPersistence, SessionStore};

#[derive(Parser)]
#[command(name = "chathub")]
#[command(about = "A command-line chat client for a multi-provider AI backend")]
#[command(
    long_about = "Chathub talks to a chat backend that fronts multiple AI model providers.\n\
Sessions are token-based: sign in once with 'chathub login' and the client\n\
keeps the session alive across commands, refreshing tokens transparently.\n\n\
Environment Variables:\n\
  CHATHUB_API_URL   Backend origin (overrides the configured base-url)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the models the backend offers
    Models,
    /// List conversations
    Conversations {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        archived: bool,
    },
    /// Create a conversation
    NewConversation {
        title: String,
        /// Model id(s) for the conversation (repeatable)
        #[arg(short = 'm', long = "model")]
        models: Vec<String>,
    },
    /// Delete a conversation
    DeleteConversation { id: String },
    /// Rename a conversation
    RenameConversation { id: String, title: String },
    /// Show a conversation's messages, oldest first
    Messages {
        id: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Send a one-shot prompt and stream the reply
    Say {
        prompt: Vec<String>,
        #[arg(short, long)]
        model: Option<String>,
        /// Append to an existing conversation
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// Generate an image from a prompt
    Image {
        prompt: Vec<String>,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set (base-url, default-model)
        key: String,
        value: Option<String>,
    },
    /// Unset configuration values
    Unset {
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(async_main())
}

/// Build the long-lived session + gateway pair. Commands other than
/// login/register install a hook that points the user back at `login` when
/// an unrecoverable refresh clears the session.
fn build_gateway(
    config: &Config,
    with_expiry_hint: bool,
) -> Result<Arc<ApiGateway>, Box<dyn Error>> {
    let session = Arc::new(SessionStore::new(SessionPersistence::new()));
    session.load_persisted();
    let gateway = Arc::new(ApiGateway::new(&config.api_base_url(), session)?);
    if with_expiry_hint {
        gateway.set_session_expired_hook(|| {
            eprintln!("Session expired. Run 'chathub login' to sign in again.");
        });
    }
    Ok(gateway)
}

fn prompt_line(label: &str) -> Result<String, Box<dyn Error>> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn read_credentials(email: Option<String>) -> Result<auth::UserCredentials, Box<dyn Error>> {
    let email = match email {
        Some(email) if !email.is_empty() => email,
        _ => prompt_line("Email")?,
    };
    let password = prompt_line("Password")?;
    if email.is_empty() || password.is_empty() {
        eprintln!("❌ Email and password are required");
        std::process::exit(1);
    }
    Ok(auth::UserCredentials { email, password })
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    match args.command {
        Commands::Login { email } => {
            let gateway = build_gateway(&config, false)?;
            let credentials = read_credentials(email)?;
            match auth::login(&gateway, &credentials).await {
                Ok(user) => {
                    println!("✅ Signed in as {} <{}>", user.name, user.email);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ Login failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Register { email } => {
            let gateway = build_gateway(&config, false)?;
            let credentials = read_credentials(email)?;
            match auth::register(&gateway, &credentials).await {
                Ok(user) => {
                    println!("✅ Account created. Signed in as {} <{}>", user.name, user.email);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ Registration failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Logout => {
            let gateway = build_gateway(&config, false)?;
            auth::logout(&gateway).await;
            println!("✅ Signed out");
            Ok(())
        }
        Commands::Whoami => {
            let gateway = build_gateway(&config, true)?;
            match auth::bootstrap(&gateway).await {
                Some(user) => {
                    println!("{} <{}>", user.name, user.email);
                    if let Some(role) = user.role {
                        println!("role: {role}");
                    }
                }
                None => println!("Not signed in. Run 'chathub login' first."),
            }
            Ok(())
        }
        Commands::Models => {
            let gateway = build_gateway(&config, true)?;
            list_models(&gateway).await
        }
        Commands::Conversations {
            limit,
            offset,
            archived,
        } => {
            let gateway = build_gateway(&config, true)?;
            list_conversations(
                &gateway,
                conversations::ListParams {
                    limit,
                    offset,
                    archived,
                },
            )
            .await
        }
        Commands::NewConversation { title, models } => {
            let gateway = build_gateway(&config, true)?;
            let models = if models.is_empty() {
                config.default_model.clone().into_iter().collect()
            } else {
                models
            };
            let conversation = conversations::create(&gateway, &title, &models).await?;
            println!("✅ Created conversation {} ({})", conversation.id, conversation.title);
            Ok(())
        }
        Commands::DeleteConversation { id } => {
            let gateway = build_gateway(&config, true)?;
            conversations::delete(&gateway, &id).await?;
            println!("✅ Deleted conversation {id}");
            Ok(())
        }
        Commands::RenameConversation { id, title } => {
            let gateway = build_gateway(&config, true)?;
            conversations::rename(&gateway, &id, &title).await?;
            println!("✅ Renamed conversation {id} to: {title}");
            Ok(())
        }
        Commands::Messages { id, limit } => {
            let gateway = build_gateway(&config, true)?;
            show_messages(&gateway, &id, limit).await
        }
        Commands::Say {
            prompt,
            model,
            conversation,
        } => {
            let gateway = build_gateway(&config, true)?;
            let model = model.or_else(|| config.default_model.clone());
            run_say(gateway, prompt, model, conversation).await
        }
        Commands::Image {
            prompt,
            model,
            conversation,
        } => {
            let gateway = build_gateway(&config, true)?;
            let prompt = prompt.join(" ");
            if prompt.is_empty() {
                eprintln!("Usage: chathub image <prompt>");
                std::process::exit(1);
            }
            let Some(model) = model.or_else(|| config.default_model.clone()) else {
                eprintln!("❌ No model specified. Pass -m or set default-model.");
                std::process::exit(1);
            };
            let mut request = ImageRequest::new(model, prompt);
            request.conversation_id = conversation;
            let message = images::generate_image(&gateway, &request).await?;
            println!("{}", message.content.text());
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = config;
            match key.as_str() {
                "base-url" => match value {
                    Some(ref val) if !val.is_empty() => {
                        config.api_base_url = Some(val.clone());
                        config.save()?;
                        println!("✅ Set base-url to: {val}");
                    }
                    _ => config.print_all(),
                },
                "default-model" => match value {
                    Some(ref val) if !val.is_empty() => {
                        config.default_model = Some(val.clone());
                        config.save()?;
                        println!("✅ Set default-model to: {val}");
                    }
                    _ => config.print_all(),
                },
                _ => {
                    eprintln!("❌ Unknown config key: {key}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = config;
            match key.as_str() {
                "base-url" => {
                    config.api_base_url = None;
                    config.save()?;
                    println!("✅ Unset base-url");
                }
                "default-model" => {
                    config.default_model = None;
                    config.save()?;
                    println!("✅ Unset default-model");
                }
                _ => {
                    eprintln!("❌ Unknown config key: {key}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
    }
}
