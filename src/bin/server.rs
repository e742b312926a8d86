//! Regatron Bridge Server Binary
//!
//! Serves the bridge protocol on a TCP port or a Unix domain socket.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use regatron_bridge::device::SimulatedGateway;
use regatron_bridge::instrument::{standard_registry, Instrument};
use regatron_bridge::network::{Server, ServerHandle};
use regatron_bridge::{Config, PortRange, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};

/// Regatron Bridge
#[derive(Parser, Debug)]
#[command(name = "regatron-bridge")]
#[command(about = "Line-oriented get/set bridge to a programmable power supply")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    endpoint: EndpointArgs,

    /// Last device port to search (defaults to <DEVICE_PORT>)
    #[arg(long, global = true)]
    device_port_to: Option<u32>,

    /// Read timeout per request in milliseconds (0 = none)
    #[arg(long, global = true, default_value = "0")]
    read_timeout_ms: u64,

    /// Write timeout per response in milliseconds (0 = none)
    #[arg(long, global = true, default_value = "5000")]
    write_timeout_ms: u64,

    /// Longest accepted request line in bytes
    #[arg(long, global = true, default_value = "4096")]
    max_line_len: usize,
}

#[derive(Subcommand, Debug)]
enum EndpointArgs {
    /// Listen on a TCP port
    Tcp {
        /// TCP port to listen on
        port: u16,

        #[command(flatten)]
        device: DeviceArgs,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Listen on a Unix domain socket
    Unix {
        /// Socket path (an existing file there is removed)
        path: PathBuf,

        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct DeviceArgs {
    /// First device port to search
    device_port: u32,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,regatron_bridge=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Regatron Bridge v{}", regatron_bridge::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    tracing::info!("Endpoint: {}", config.endpoint);
    tracing::info!("Device ports: {}", config.device_ports);

    let instrument = Instrument::new(SimulatedGateway::new(), config.device_ports);
    let registry = Arc::new(standard_registry()?);

    let mut server = Server::bind(config, registry, instrument)?;
    install_signal_handler(server.handle())?;

    server.run()?;
    server.cleanup();
    Ok(())
}

fn build_config(args: &Args) -> Result<Config> {
    let builder = Config::builder()
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .max_line_len(args.max_line_len);

    let (builder, first_port) = match &args.endpoint {
        EndpointArgs::Tcp { port, device, bind } => {
            (builder.tcp(format!("{}:{}", bind, port)), device.device_port)
        }
        EndpointArgs::Unix { path, device } => (builder.unix(path.clone()), device.device_port),
    };

    let last_port = args.device_port_to.unwrap_or(first_port);
    Ok(builder
        .device_ports(PortRange::new(first_port, last_port)?)
        .build())
}

/// Stop the server on SIGINT/SIGTERM
fn install_signal_handler(handle: ServerHandle) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::warn!("Received signal {}, shutting down", signal);
                handle.stop();
            }
        })?;
    Ok(())
}
