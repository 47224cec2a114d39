//! CLI entry point. Modeled on `sova-relay`'s `main.rs`: a `clap::Parser`
//! args struct, `tracing_subscriber::fmt().with_env_filter`, `ctrl_c()` for
//! graceful shutdown, and `anyhow::Result` at the boundary.

use anyhow::{Context, Result};
use clap::Parser;
use oschub::{AddressFamily, Hub, HubConfig};
use tracing::{info, warn};

/// A multi-unicast application-level gateway for Open Sound Control over UDP.
#[derive(Parser)]
#[command(name = "oschub")]
#[command(about = "A multi-unicast OSC gateway")]
struct Args {
	/// Optional TOML config file; CLI flags below override any value it sets.
	#[cfg(feature = "config-file")]
	#[arg(long)]
	config: Option<std::path::PathBuf>,

	/// Address to bind the hub's UDP socket to
	#[arg(short = 'H', long)]
	host: Option<String>,

	/// Port to listen on
	#[arg(short, long)]
	port: Option<u16>,

	/// Shared secret control requests must present to mutate the subscriber set
	#[arg(long = "authenticate")]
	secret: Option<String>,

	/// Restrict to IPv4 only (default is dual-stack)
	#[arg(long)]
	ipv4_only: bool,

	/// Subscription file to preload at startup and use as the default `/save` target
	#[arg(long)]
	subscription_file: Option<std::path::PathBuf>,

	/// Maximum datagram size, in bytes, also used to size the socket buffers
	#[arg(long)]
	max_packet_size: Option<usize>,

	/// Log level passed to `tracing_subscriber`'s env filter
	#[arg(long, default_value = "info")]
	log_level: String
}

/// The subset of `HubConfig` a TOML file can set. Every field optional so a
/// config file only needs to mention what it wants to override.
#[cfg(feature = "config-file")]
#[derive(Debug, Default, serde::Deserialize)]
struct FileConfig {
	host: Option<String>,
	port: Option<u16>,
	secret: Option<String>,
	ipv4_only: Option<bool>,
	subscription_file: Option<std::path::PathBuf>,
	max_packet_size: Option<usize>
}

#[cfg(feature = "config-file")]
impl FileConfig {
	fn load(path: &std::path::Path) -> Result<FileConfig> {
		let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
		toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
	}
}

#[cfg(feature = "config-file")]
fn resolve_config(args: Args) -> Result<HubConfig> {
	let file = match &args.config {
		Some(path) => FileConfig::load(path)?,
		None => FileConfig::default()
	};
	Ok(HubConfig {
		bind_host: args.host.or(file.host).unwrap_or_else(|| "0.0.0.0".to_string()),
		bind_port: args.port.or(file.port).unwrap_or(9000),
		secret: args.secret.or(file.secret).unwrap_or_else(|| "sekret".to_string()),
		family: if args.ipv4_only || file.ipv4_only.unwrap_or(false) { AddressFamily::V4Only } else { AddressFamily::DualStack },
		subscription_file: args.subscription_file.or(file.subscription_file),
		max_packet_size: args.max_packet_size.or(file.max_packet_size).unwrap_or(oschub::hub::DEFAULT_MAX_PACKET_SIZE)
	})
}

#[cfg(not(feature = "config-file"))]
fn resolve_config(args: Args) -> Result<HubConfig> {
	Ok(HubConfig {
		bind_host: args.host.unwrap_or_else(|| "0.0.0.0".to_string()),
		bind_port: args.port.unwrap_or(9000),
		secret: args.secret.unwrap_or_else(|| "sekret".to_string()),
		family: if args.ipv4_only { AddressFamily::V4Only } else { AddressFamily::DualStack },
		subscription_file: args.subscription_file,
		max_packet_size: args.max_packet_size.unwrap_or(oschub::hub::DEFAULT_MAX_PACKET_SIZE)
	})
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	tracing_subscriber::fmt().with_env_filter(args.log_level.clone()).init();

	let config = resolve_config(args)?;
	info!(bind_host = %config.bind_host, bind_port = config.bind_port, family = ?config.family, "starting oschub");

	let hub = Hub::bind(config).await.context("failed to bind hub socket")?;
	let shutdown = hub.shutdown_token();

	tokio::select! {
		result = hub.run() => {
			if let Err(err) = result {
				warn!(error = %err, "hub exited with an error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			info!("received ctrl-c, shutting down");
			shutdown.cancel();
		}
	}

	Ok(())
}
