//! Operator CLI: probe the execution service, inspect site profiles,
//! validate credentials. The bridge itself runs embedded in a page
//! adapter; these commands exist for setup and troubleshooting.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use remote_client::RemoteClient;

use crate::config::{self, BridgeConfig};
use crate::sites;

#[derive(Parser)]
#[command(name = "toolbridge", about = "Bridge AI-chat tool calls to a local execution service", version)]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Probe the execution service and report its state.
    Check,
    /// Validate a token against the service.
    Auth { token: String },
    /// Print the initialization prompt the service wants sent first.
    Prompt,
    /// Show the site profile that would be used for a page host.
    Sites {
        /// Host to resolve; omit to list the built-in profiles.
        host: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = self.config.unwrap_or_else(config::default_path);
        let config = BridgeConfig::load(&path)?;
        match self.command {
            Command::Check => check(&config).await,
            Command::Auth { token } => auth(&config, &token).await,
            Command::Prompt => prompt(&config).await,
            Command::Sites { host } => {
                show_sites(&config, host.as_deref());
                Ok(())
            }
        }
    }
}

async fn check(config: &BridgeConfig) -> anyhow::Result<()> {
    let client = client_for(config)?;
    let info = client
        .health()
        .await
        .with_context(|| format!("service at {} is unreachable", config.service_url))?;
    println!("service: {} is up", config.service_url);
    if let Some(dir) = info.dir {
        println!("working directory: {dir}");
    }
    println!(
        "processed-call store: {}",
        config::default_store_path().display()
    );
    Ok(())
}

async fn auth(config: &BridgeConfig, token: &str) -> anyhow::Result<()> {
    let client = client_for(config)?;
    if client.auth(token).await? {
        println!("token accepted");
        Ok(())
    } else {
        anyhow::bail!("token rejected by the service")
    }
}

async fn prompt(config: &BridgeConfig) -> anyhow::Result<()> {
    let client = client_for(config)?;
    let text = client.prompt().await.context("fetching init prompt")?;
    println!("{text}");
    Ok(())
}

fn show_sites(config: &BridgeConfig, host: Option<&str>) {
    match host {
        Some(host) => {
            let profile = sites::resolve(host, &config.sites);
            match serde_json::to_string_pretty(&profile) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("profile for {host} failed to render: {err}"),
            }
        }
        None => {
            for profile in config.sites.iter().cloned().chain(sites::builtin_profiles()) {
                let observer = if profile.use_observer { " (observer)" } else { "" };
                println!("{}{observer}", profile.site);
            }
        }
    }
}

fn client_for(config: &BridgeConfig) -> anyhow::Result<RemoteClient> {
    RemoteClient::new(&config.service_url, config.auth_token.clone())
        .with_context(|| format!("invalid service address: {}", config.service_url))
}
