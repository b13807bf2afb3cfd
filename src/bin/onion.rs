//! Command-line demo around the fixture users.
//!
//! ```bash
//! # Show a user's node key
//! onion info --user alice
//!
//! # Build a three-hop onion (payloads prompted if not given)
//! onion build --hops bob,charlie,dave --payloads "Hi Bob,Hi Charlie,Hi Dave"
//!
//! # Peel one layer as bob and print what to forward
//! onion parse --user bob --payload <hex>
//! ```

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secp256k1::SecretKey;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use onion_core::encoding::{from_hex, to_hex};
use onion_core::errors::OnionError;
use onion_core::packet::{build_onion, peel, HopInput, Onion};
use onion_core::users;

/// Build, inspect and peel onion packets for the fixture users.
#[derive(Parser, Debug)]
#[command(name = "onion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a user's compressed public key
    Info {
        /// One of: alice, bob, charlie, dave, eve
        #[arg(long)]
        user: String,
    },

    /// Build an onion over a comma-separated hop list
    Build {
        /// Hop aliases in route order, e.g. "bob,charlie,dave"
        #[arg(long)]
        hops: String,

        /// Comma-separated payloads, one per hop; prompted on stdin when
        /// absent
        #[arg(long)]
        payloads: Option<String>,
    },

    /// Peel one layer of a hex-encoded onion as the given user
    Parse {
        /// One of: alice, bob, charlie, dave, eve
        #[arg(long)]
        user: String,

        /// The 1366-byte onion, hex encoded
        #[arg(long)]
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "onion=debug" } else { "onion=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Info { user } => run_info(user),
        Commands::Build { hops, payloads } => run_build(hops, payloads.as_deref()),
        Commands::Parse { user, payload } => run_parse(user, payload),
    }
}

fn lookup_user(name: &str) -> Result<&'static users::User> {
    users::get_user(name).with_context(|| format!("no user named {name}"))
}

fn run_info(user: &str) -> Result<()> {
    let user = lookup_user(user)?;
    println!(
        "{}'s public key is: {}",
        user.name,
        to_hex(&user.public_key.serialize())
    );
    Ok(())
}

fn run_build(hops: &str, payloads: Option<&str>) -> Result<()> {
    let hop_names: Vec<&str> = hops.split(',').map(str::trim).collect();

    let payloads: Vec<String> = match payloads {
        Some(list) => {
            let split: Vec<String> = list.split(',').map(str::to_owned).collect();
            if split.len() != hop_names.len() {
                bail!(OnionError::MismatchedPayloadCount {
                    payloads: split.len(),
                    hops: hop_names.len(),
                });
            }
            split
        }
        None => prompt_payloads(&hop_names)?,
    };

    let mut hop_inputs = Vec::with_capacity(hop_names.len());
    for (name, payload) in hop_names.iter().zip(&payloads) {
        let user = lookup_user(name)?;
        hop_inputs.push(HopInput::clear(user.public_key, payload.as_bytes()));
    }

    let session_key = SecretKey::new(&mut secp256k1::rand::thread_rng());
    debug!(hops = hop_inputs.len(), "building onion");
    let onion = build_onion(&session_key, &hop_inputs)?;

    println!("Onion: {}", to_hex(&onion.serialize()));
    Ok(())
}

fn prompt_payloads(hop_names: &[&str]) -> Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut payloads = Vec::with_capacity(hop_names.len());
    for name in hop_names {
        let user = lookup_user(name)?;
        print!("Enter message for {}: ", user.name);
        std::io::stdout().flush()?;
        let line = lines
            .next()
            .transpose()?
            .with_context(|| format!("no message for {}", user.name))?;
        payloads.push(line.trim_end().to_owned());
    }
    Ok(payloads)
}

fn run_parse(user: &str, payload: &str) -> Result<()> {
    let user = lookup_user(user)?;
    let bytes = from_hex(payload.trim())?;
    let onion = Onion::deserialize(&bytes)?;

    info!(user = user.name, "peeling onion");
    let (hop_payload, next_onion) = peel(user.secret_key(), &onion)?;

    let data = onion_core::payload::HopData::decode(&hop_payload.payload)?;
    println!(
        "My payload: \"{}\"",
        String::from_utf8_lossy(&data.clear_data)
    );

    let Some(forward_to) = hop_payload.forward_to else {
        println!("Final hop! Can chill now");
        return Ok(());
    };

    match users::find_by_public_key(&forward_to) {
        Some(next) => println!("Should forward onion onto: {}", next.name),
        None => println!(
            "Should forward onion onto: {}",
            to_hex(&forward_to.serialize())
        ),
    }
    println!("Onion: {}", to_hex(&next_onion.serialize()));
    Ok(())
}
