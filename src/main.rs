use std::error::Error;
use std::net::SocketAddr;

use budowlanka::config::Settings;
use budowlanka::db::{Database, NewUser};
use budowlanka::web::{self, AppState};
use budowlanka::{auth, logging, mail};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "budowlanka", version, about = "Budowlanka website")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the web server (the default)
    Serve {
        /// Overrides BUDOWLANKA_ADDR
        #[arg(long)]
        address: Option<SocketAddr>,
    },
    /// Create a staff account for the admin area
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    logging::init(&settings)?;

    let db = Database::connect(&settings.database_url).await?;

    match cli.command.unwrap_or(Command::Serve { address: None }) {
        Command::Serve { address } => {
            if let Some(address) = address {
                settings.address = address;
            }
            let mailer = mail::from_settings(&settings.email)?;
            web::start_server(AppState::new(db, mailer, settings)).await?;
        }
        Command::CreateSuperuser {
            username,
            email,
            password,
        } => {
            let password_hash = auth::hash_password(&password).map_err(|err| err.to_string())?;
            let user = db
                .create_user(&NewUser {
                    username: &username,
                    email: &email,
                    password_hash: &password_hash,
                    is_staff: true,
                })
                .await?;
            log::info!("Created staff user {user}");
            println!("Superuser {user} created.");
            db.close().await;
        }
    }

    Ok(())
}
