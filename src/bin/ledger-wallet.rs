#![forbid(unsafe_code)]
//! Offline wallet: creates identities and signs transfers into the JSON body
//! accepted by `POST /api/transactions`.

use clap::{Parser, Subcommand};
use colored::*;
use ledgerchain::address::Address;
use ledgerchain::crypto::Identity;
use ledgerchain::transaction::{Amount, Transaction, TransactionRequest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new identity and prints its keys and address
    New {
        /// Print machine-readable JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Signs a transfer and prints the submission body
    Sign {
        /// Sender private key as 64 hex characters
        #[arg(long)]
        private_key: String,
        /// Recipient Base58Check address
        #[arg(long)]
        to: String,
        /// Amount in coins
        #[arg(long)]
        amount: f64,
    },
    /// Prints the address derived from a private key
    Address {
        #[arg(long)]
        private_key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::New { json } => new_identity(json)?,
        Commands::Sign {
            private_key,
            to,
            amount,
        } => sign(&private_key, &to, amount)?,
        Commands::Address { private_key } => {
            let identity = Identity::from_private_key_hex(&private_key)?;
            println!("{}", identity.address());
        }
    }

    Ok(())
}

fn new_identity(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::generate()?;

    if json {
        let body = serde_json::json!({
            "private_key": identity.private_key_hex(),
            "public_key": identity.public_key_hex(),
            "blockchain_address": identity.address().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", "New identity created".bright_green().bold());
    println!("  {} {}", "Address:    ".bright_cyan(), identity.address());
    println!("  {} {}", "Public key: ".bright_cyan(), identity.public_key_hex());
    println!("  {} {}", "Private key:".bright_red(), identity.private_key_hex());
    println!(
        "{}",
        "Keep the private key secret; it cannot be recovered.".yellow()
    );
    Ok(())
}

fn sign(private_key: &str, to: &str, amount: f64) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::from_private_key_hex(private_key)?;
    let recipient = Address::parse(to)?;
    let amount = Amount::from_coins(amount)?;
    if amount <= Amount::ZERO {
        return Err("amount must be positive".into());
    }

    let tx = Transaction::new(identity.address().clone(), recipient, amount)?;
    let signature = identity.sign(&tx);
    let request = TransactionRequest::from_signed(&tx, identity.public_key(), &signature);

    eprintln!(
        "{} {} {} {}",
        "Signed".bright_green(),
        amount.to_string().bright_yellow(),
        "->".dimmed(),
        tx.recipient
    );
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}
