// knotchain-cli — generate a standalone wallet keypair.
//
// The daemon generates its own operating wallet on startup; this binary is
// for operators who want a spare address (a cold wallet, a faucet source)
// without spinning up a node to get one.

use std::env;

use colored::*;

use knotchain::wallet::Wallet;

fn print_usage() {
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
    println!(
        "{}",
        "                     - CLI Node Control -                        "
            .bright_yellow()
            .on_blue()
            .bold()
    );
    println!();
    println!(
        "{}",
        "  Usage: knotchain-cli <command>".bright_yellow().bold()
    );
    println!();
    println!("{}", "  Commands:".bright_white().bold());
    println!(
        "  {} {:<18} {}",
        "❯".bright_black(),
        "createwallet".bright_green(),
        "Generate a new keypair and print its address".white()
    );
    println!();
}

fn create_wallet() -> Result<(), Box<dyn std::error::Error>> {
    let wallet = Wallet::new()?;
    println!("{}", "NEW KNOTCHAIN WALLET CREATED".bright_green().bold());
    println!(
        "{} {}",
        "Address:  ".bright_yellow(),
        wallet.address.bright_white()
    );
    println!(
        "{}\n{}",
        "Public key:".bright_yellow(),
        wallet.public_key_pem.white()
    );
    println!(
        "{}",
        "IMPORTANT: this process holds the only copy of the signing key. Once it exits, funds sent to this address are unrecoverable."
            .on_red()
            .white()
            .bold()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("createwallet") => create_wallet(),
        _ => {
            print_usage();
            Ok(())
        }
    }
}
