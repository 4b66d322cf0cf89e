pub mod agent;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod language;
pub mod llm;
pub mod models;
pub mod server;
pub mod session;
pub mod speech;

use agent::ProxyAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    args.validate()?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Endpoint: {}", args.chat_base_url);
    info!("Speech Endpoint: {}", args.speech_config().endpoint);
    info!("Default Language: {}", args.default_language);
    info!("Audio Directory: {}", args.audio_dir.display());
    info!("Audio TTL: {}s", args.audio_ttl_secs);
    info!("Public Base URL: {}", args.public_base_url.as_deref().unwrap_or("(relative)"));
    info!("CORS Origins: {}", args.cors_origins.join(", "));
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(ProxyAgent::new(&args).await?);
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
