use std::sync::Arc;

use colored::*;
use tokio::sync::Mutex;

use knotchain::blockchain::chain::Blockchain;
use knotchain::config::NodeConfig;
use knotchain::http::{self, HttpState};
use knotchain::mempool::Mempool;
use knotchain::net::server::P2PServer;
use knotchain::wallet::Wallet;

fn banner() {
    println!(
        "{}",
        " ██╗  ██╗███╗   ██╗██████╗ ████████╗ ██████╗██████╗ ███╗   ██╗".bright_cyan()
    );
    println!(
        "{}",
        " ██║ ██╔╝████╗  ██║██╔══██╗╚══██╔══╝██╔════╝██╔══██╗████╗  ██║".bright_cyan()
    );
    println!(
        "{}",
        " █████╔╝ ██╔██╗ ██║██║  ██║   ██║   ██║     ██║  ██║██╔██╗ ██║"
            .bright_cyan()
            .bold()
    );
    println!(
        "{}",
        " ██╔═██╗ ██║╚██╗██║██║  ██║   ██║   ██║     ██║  ██║██║╚██╗██║"
            .bright_cyan()
            .bold()
    );
    println!(
        "{}",
        " ██║  ██╗██║ ╚████║██████╔╝   ██║   ╚██████╗██████╔╝██║ ╚████║".blue()
    );
    println!(
        "{}",
        " ╚═╝  ╚═╝╚═╝  ╚═══╝╚═════╝    ╚═╝    ╚═════╝╚═════╝ ╚═╝  ╚═══╝".blue()
    );
    println!();
    println!(
        "{}",
        "                         node daemon                      "
            .bright_green()
            .on_black()
            .bold()
    );
    println!();
    println!("{}", " [SECURITY WARNING] ".on_red().white().bold());
    println!(
        "{}",
        " Your public IP will be visible to peers you connect with.".red()
    );
    println!("{}", " Use a VPN or Tor for absolute anonymity.".red());
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    banner();

    let config = NodeConfig::from_env();
    println!(
        "{} p2p: {}:{}  http: {}",
        "[init]".bright_blue().bold(),
        config.p2p_host,
        config.p2p_port,
        config.http_port
    );

    let wallet = Arc::new(Wallet::new()?);
    println!(
        "{} wallet address: {}",
        "[init]".bright_blue().bold(),
        wallet.address.bright_white()
    );

    let blockchain = Arc::new(Mutex::new(Blockchain::new()));
    let mempool = Arc::new(Mutex::new(Mempool::new()));

    let mut p2p = P2PServer::new(blockchain.clone(), mempool.clone());
    p2p.bind(&config.p2p_host, config.p2p_port);
    let p2p = Arc::new(p2p);

    p2p.start().await?;
    println!(
        "{} p2p server listening on {}",
        "[p2p] ".bright_green().bold(),
        p2p.uri()
    );

    if !config.peers.is_empty() {
        println!(
            "{} dialing {} configured peer(s)",
            "[p2p] ".bright_green().bold(),
            config.peers.len()
        );
        p2p.connect_nodes(&config.peers).await;
    }

    let heartbeat_server = p2p.clone();
    tokio::spawn(async move {
        heartbeat_server.heartbeat().await;
    });

    println!(
        "{} http server listening on 127.0.0.1:{}",
        "[http]".bright_magenta().bold(),
        config.http_port
    );
    println!();
    println!(
        "{}",
        "  Usage: knotchain-cli <command> [args...]"
            .bright_yellow()
            .bold()
    );
    println!("  {} knotchain-cli createwallet", "❯".bright_black());
    println!();

    let http_state = Arc::new(HttpState {
        blockchain,
        mempool,
        wallet,
        p2p,
    });
    http::serve(http_state, config.http_port).await?;
    println!("{} done", "[shutdown]".bright_red().bold());
    Ok(())
}
