//! auk interactive client — entry point.
//!
//! ```text
//! auk --uin 123456 --password secret      Log in with explicit credentials
//! auk --config auk.toml                   Use a config TOML
//! auk --gen-config                        Dump default config and exit
//! ```
//!
//! Once online, commands are read from stdin:
//!
//! ```text
//! g <group_code> <text…>   send a group message
//! p <uin> <text…>          send a private message
//! friends                  reload and print the friend list
//! groups                   reload and print the group list
//! quit                     exit
//! ```

mod config;

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use auk_core::message::{Element, SendingMessage};
use auk_core::{Client, ClientBuilder, Event};

use crate::config::CliConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "auk", about = "auk interactive messaging client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "auk.toml")]
    config: PathBuf,

    /// Account uin (overrides config).
    #[arg(long)]
    uin: Option<i64>,

    /// Account password (overrides config).
    #[arg(long)]
    password: Option<String>,

    /// Coordinator address (overrides config). Example: 127.0.0.1:8080
    #[arg(short, long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config);
    if let Some(uin) = cli.uin {
        config.account.uin = uin;
    }
    if let Some(password) = cli.password {
        config.account.password = password;
    }
    if let Some(server) = cli.server {
        config.client.server_addr = server;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("auk v{}", env!("CARGO_PKG_VERSION"));
    if config.account.uin == 0 {
        error!("no account configured; pass --uin/--password or a config file");
        std::process::exit(2);
    }

    // ── 1. Build the client and subscribe to events ─────────────

    let client = ClientBuilder::new(config.account.uin, &config.account.password)
        .config(config.client)
        .build();

    client.on_event(|event: &Event| match serde_json::to_string(event) {
        Ok(line) => println!("<< {line}"),
        Err(e) => warn!("unprintable event: {e}"),
    });

    // ── 2. Log in (with captcha round if demanded) ──────────────

    let mut response = client.login().await?;
    while let Some(challenge) = response.captcha.take() {
        info!("captcha demanded ({} bytes); enter solution:", challenge.image.len());
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        response = client.submit_captcha(line.trim(), &challenge.sign).await?;
    }
    if !response.success {
        error!(
            "login failed: {}",
            response.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    info!("online as {} ({})", client.nickname(), client.uin());

    // ── 3. Command loop ─────────────────────────────────────────

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Err(e) = run_command(&client, line.trim()).await {
            warn!("command failed: {e}");
        }
        if !client.is_online() {
            warn!("session is no longer online; exiting");
            break;
        }
    }
    Ok(())
}

async fn run_command(client: &Client, line: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut parts = line.splitn(3, ' ');
    match parts.next() {
        Some("g") => {
            let (Some(code), Some(text)) = (parts.next(), parts.next()) else {
                warn!("usage: g <group_code> <text>");
                return Ok(());
            };
            let message = SendingMessage::new().append(Element::text(text));
            let sent = client.send_group_message(code.parse()?, message).await?;
            info!("sent to group {} as message {}", sent.group_code, sent.id);
        }
        Some("p") => {
            let (Some(uin), Some(text)) = (parts.next(), parts.next()) else {
                warn!("usage: p <uin> <text>");
                return Ok(());
            };
            let message = SendingMessage::new().append(Element::text(text));
            let sent = client.send_private_message(uin.parse()?, message).await?;
            info!("sent to {} as message {}", sent.target, sent.id);
        }
        Some("friends") => {
            client.reload_friend_list().await?;
            let friends = client.friends();
            info!("{} friends", friends.len());
            for f in friends {
                println!("  {:>12}  {}", f.uin, f.nickname);
            }
        }
        Some("groups") => {
            client.reload_group_list().await?;
            let groups = client.groups();
            info!("{} groups", groups.len());
            for g in groups {
                println!("  {:>12}  {} ({} members)", g.code, g.name, g.members().len());
            }
        }
        Some("quit") => {
            std::process::exit(0);
        }
        Some(other) if !other.is_empty() => warn!("unknown command: {other}"),
        _ => {}
    }
    Ok(())
}
