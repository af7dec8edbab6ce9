use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use relay_gateway::webhook::{self, WebhookState};

#[derive(Parser)]
#[command(name = "relay", version, about = "Relay — transcribes voice and video notes and answers with an LLM")]
struct Cli {
    /// Config file (default: ~/.relay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive updates by long polling (default)
    Run,
    /// Receive updates through a webhook
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write a default config file
    Init,
    /// Show the resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_file = cli.config.clone();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            let path = config_file.unwrap_or_else(relay_gateway::config::config_path);
            relay_gateway::config::write_default_config(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Status => {
            let cfg = relay_gateway::config::load_config(config_file.as_deref())?;
            let set = |v: &Option<String>| if v.is_some() { "configured" } else { "not set" };
            println!("Relay v{}", env!("CARGO_PKG_VERSION"));
            println!("Mention: {}", cfg.telegram.mention);
            println!("Bot token: {}", set(&cfg.telegram.bot_token));
            println!("Generation: {} via {} (key {})", cfg.generation.model, cfg.generation.base_url, set(&cfg.generation.api_key));
            println!("Transcription: {} via {} (key {})", cfg.transcription.model, cfg.transcription.base_url, set(&cfg.transcription.api_key));
            println!("Reply format: {:?}", cfg.reply.parse_mode);
            println!("Webhook: {}", cfg.telegram.webhook_url.as_deref().unwrap_or("not set"));
            Ok(())
        }
        Commands::Run => {
            let validated = relay_gateway::config::load_config(config_file.as_deref())?.validate()?;
            let poll_timeout = validated.config.telegram.poll_timeout_secs;
            let bot = relay_gateway::build_bot(&validated);

            bot.api()
                .delete_webhook()
                .await
                .context("deleteWebhook failed; polling would be refused")?;
            bot.register_commands().await;
            info!("Listening for {}", bot.pipeline().mention());
            bot.run_polling(poll_timeout).await;
            Ok(())
        }
        Commands::Serve { bind } => {
            let validated = relay_gateway::config::load_config(config_file.as_deref())?.validate()?;
            let public_url = validated
                .config
                .telegram
                .webhook_url
                .clone()
                .context("WEBHOOK_URL (telegram.webhook_url) is required for serve")?;
            let bind = bind.unwrap_or_else(|| validated.config.server.bind.clone());
            let bot = relay_gateway::build_bot(&validated);

            bot.register_commands().await;
            info!("Listening for {}", bot.pipeline().mention());
            let state = WebhookState {
                bot,
                secret: validated.config.telegram.webhook_secret.clone(),
            };
            webhook::serve(state, &bind, &public_url).await
        }
    }
}
