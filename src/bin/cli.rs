//! Regatron Bridge CLI Client
//!
//! Sends get/set requests to a running bridge and prints the responses.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use regatron_bridge::network::Client;
use regatron_bridge::protocol::Response;
use regatron_bridge::{Endpoint, Result};

/// Regatron Bridge CLI
#[derive(Parser, Debug)]
#[command(name = "regatron-cli")]
#[command(about = "CLI for the Regatron bridge")]
struct Args {
    /// Server TCP address
    #[arg(short, long, default_value = "127.0.0.1:20005", conflicts_with = "unix")]
    tcp: String,

    /// Server Unix socket path
    #[arg(short, long)]
    unix: Option<PathBuf>,

    /// Send the request this many times and report timing
    #[arg(short, long, default_value = "1")]
    repeat: usize,

    /// Response timeout in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a named value
    Get {
        /// Command name
        name: String,
    },

    /// Write a named value
    Set {
        /// Command name
        name: String,

        /// The value to write
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
}

fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether the last response was a success
fn run(args: &Args) -> Result<bool> {
    let endpoint = match &args.unix {
        Some(path) => Endpoint::Unix(path.clone()),
        None => Endpoint::Tcp(args.tcp.clone()),
    };

    let mut client = Client::connect(&endpoint)?;
    if args.timeout_ms > 0 {
        client.set_timeout(Some(Duration::from_millis(args.timeout_ms)))?;
    }

    let repeat = args.repeat.max(1);
    let started = Instant::now();
    let mut response = Response::nack();
    for _ in 0..repeat {
        response = match &args.command {
            Commands::Get { name } => client.get(name)?,
            Commands::Set { name, value } => client.set(name, *value)?,
        };
    }
    let elapsed = started.elapsed();

    print!("{}", response.encode());
    if repeat > 1 {
        println!(
            "{} requests in {:.3} ms ({:.3} ms per request)",
            repeat,
            elapsed.as_secs_f64() * 1000.0,
            elapsed.as_secs_f64() * 1000.0 / repeat as f64
        );
    }
    Ok(!response.is_nack())
}
