use anyhow::Context;
use clap::{Parser, Subcommand};

use shelf_app::Application;
use shelf_authz::TokenService;
use shelf_kernel::Settings;

/// Shelf book review service
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the effective configuration with secrets masked
    Config,
    /// Issue a bearer token for a user id using the configured key
    Token {
        #[arg(long)]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load Shelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            shelf_telemetry::init(&settings.telemetry)?;
            Application::build(settings).await?.serve().await
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings.redacted())
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Token { user_id } => {
            let token = TokenService::from_settings(&settings.auth)
                .issue(&user_id)
                .context("failed to issue token")?;
            println!("{token}");
            Ok(())
        }
    }
}
