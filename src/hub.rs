//! The forwarding engine: the UDP receive loop described by `spec.md` §4.5.
//!
//! Single-threaded cooperative scheduling (§5): one task, one blocking
//! suspension point (`recv_from`), one mutex guarding the registry and the
//! `paused` flag. No per-datagram task spawning — there's exactly one
//! mutator, so spawning would add overhead without adding concurrency the
//! spec calls for.

use std::net::SocketAddr;
use std::path::PathBuf;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher;
use crate::error::HubResult;
use crate::osc::{self, CodecError, OscMessage, OscPacket};
use crate::persistence;
use crate::registry::Registry;
use crate::resolver::{self, AddressFamily};

/// Default receive buffer size: the OSC maximum datagram, per `spec.md` §5.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

const RESERVED_ADDRESSES: &[&str] = &["/subscribe", "/unsubscribe", "/list", "/save", "/pause"];

/// Immutable startup configuration. See `spec.md` §3's `HubConfig`.
#[derive(Debug, Clone)]
pub struct HubConfig {
	pub bind_host: String,
	pub bind_port: u16,
	pub secret: String,
	pub family: AddressFamily,
	pub subscription_file: Option<PathBuf>,
	pub max_packet_size: usize
}

impl HubConfig {
	/// The string the hub actually binds to, after the `::`/`::1` → v4
	/// fixup (§4.2) and IPv6 bracketing needed for `SocketAddr` parsing.
	fn bind_addr_string(&self) -> String {
		let host = resolver::fixup_bind_host(&self.bind_host, self.family);
		if host.contains(':') {
			format!("[{host}]:{}", self.bind_port)
		} else {
			format!("{host}:{}", self.bind_port)
		}
	}
}

/// `HubConfig` + `Registry` + `paused`, guarded by a single mutex — see
/// `spec.md` §5: "a single mutex around the registry and `paused` flag
/// suffices".
pub struct HubState {
	pub config: HubConfig,
	pub registry: Registry,
	pub paused: bool
}

/// The bound hub: a UDP socket, its mutable state, and a cancellation token
/// for graceful shutdown.
pub struct Hub {
	socket: UdpSocket,
	state: Mutex<HubState>,
	shutdown: CancellationToken
}

impl Hub {
	/// Binds the hub's socket, applies `SO_SNDBUF`/`SO_RCVBUF`/`IPV6_V6ONLY`
	/// via `socket2` (options `tokio::net::UdpSocket` doesn't expose
	/// directly), and preloads any configured subscription file.
	pub async fn bind(config: HubConfig) -> HubResult<Hub> {
		let bind_addr_string = config.bind_addr_string();
		let bind_addr: SocketAddr = bind_addr_string
			.parse()
			.map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid bind address '{bind_addr_string}'")))?;

		let domain = match config.family {
			AddressFamily::V4Only => Domain::IPV4,
			AddressFamily::DualStack => Domain::IPV6
		};
		let raw_socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
		if config.family == AddressFamily::DualStack {
			raw_socket.set_only_v6(false)?;
		}
		raw_socket.set_send_buffer_size(config.max_packet_size)?;
		raw_socket.set_recv_buffer_size(config.max_packet_size)?;
		raw_socket.set_nonblocking(true)?;
		raw_socket.bind(&SockAddr::from(bind_addr))?;

		let socket = UdpSocket::from_std(raw_socket.into())?;
		info!(bind_addr = %bind_addr, "hub bound");

		let mut registry = Registry::new(config.family);
		if let Some(path) = config.subscription_file.clone() {
			for (host, port, label) in persistence::load(&path)? {
				let label = if label.is_empty() { None } else { Some(label.as_str()) };
				match registry.subscribe(&host, port, label) {
					Ok(()) => info!(host, port, "preloaded subscription from file"),
					Err(err) => warn!(host, port, error = %err, "skipping subscription preloaded from file")
				}
			}
		}

		let state = HubState { config, registry, paused: false };
		Ok(Hub { socket, state: Mutex::new(state), shutdown: CancellationToken::new() })
	}

	/// A token that can be used to trigger [`Hub::run`]'s shutdown from
	/// outside the hub (library embedders aren't limited to SIGINT).
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// The receive loop. Blocks until cancelled via [`Hub::shutdown_token`].
	pub async fn run(&self) -> HubResult<()> {
		let max_packet_size = self.state.lock().await.config.max_packet_size;
		let mut buf = vec![0u8; max_packet_size];

		loop {
			let (len, source) = tokio::select! {
				_ = self.shutdown.cancelled() => {
					info!("hub shutting down");
					return Ok(());
				}
				result = self.socket.recv_from(&mut buf) => result?,
			};
			self.handle_datagram(&buf[..len], source).await;
		}
	}

	async fn handle_datagram(&self, packet: &[u8], source: SocketAddr) {
		let proxy = match osc::decode_proxy(packet) {
			Ok(proxy) => proxy,
			Err(CodecError::IsBundle) => {
				self.fanout(packet, source).await;
				return;
			}
			Err(err) => {
				debug!(error = %err, %source, "dropping malformed datagram");
				return;
			}
		};

		if RESERVED_ADDRESSES.contains(&proxy.address) {
			let message = match osc::decode(packet) {
				Ok((_, decoded)) => decoded.into_message(),
				Err(err) => {
					warn!(error = %err, %source, address = proxy.address, "dropping malformed control message");
					return;
				}
			};
			let Some(message) = message else {
				// A reserved address only dispatches when it's the top-level
				// message; it can't appear as the address of a bundle itself.
				warn!(%source, "reserved address decoded as something other than a message; ignoring");
				return;
			};
			self.dispatch(message, source).await;
			return;
		}

		self.fanout(packet, source).await;
	}

	async fn dispatch(&self, message: OscMessage, source: SocketAddr) {
		let reply = {
			let mut state = self.state.lock().await;
			match message.address.as_str() {
				"/subscribe" => dispatcher::handle_subscribe(&message.args, &mut state),
				"/unsubscribe" => dispatcher::handle_unsubscribe(&message.args, &mut state),
				"/list" => Some(dispatcher::handle_list(&state)),
				"/save" => dispatcher::handle_save(&message.args, &state),
				"/pause" => dispatcher::handle_pause(&message.args, &mut state),
				_ => unreachable!("dispatch is only called for addresses in RESERVED_ADDRESSES")
			}
		};

		if let Some(reply) = reply {
			self.send_reply(&reply, source).await;
		}
	}

	async fn send_reply(&self, packet: &OscPacket, destination: SocketAddr) {
		let bytes = osc::encode(packet);
		if let Err(err) = self.send_all(&bytes, destination).await {
			warn!(error = %err, %destination, "failed to send control reply");
		}
	}

	/// Forwards the original, still-encoded bytes to every current
	/// subscriber, verbatim — never re-encoded, so any field the hub
	/// doesn't understand (including nested bundles) survives unchanged.
	async fn fanout(&self, packet: &[u8], source: SocketAddr) {
		let (destinations, family) = {
			let state = self.state.lock().await;
			if state.paused {
				return;
			}
			let destinations: Vec<_> = state.registry.list().map(|(key, _)| key.clone()).collect();
			(destinations, state.registry.family())
		};

		for key in destinations {
			let Some(addr) = key.send_addr(family) else {
				warn!(?key, "could not resolve subscriber for fanout, skipping");
				continue;
			};
			if let Err(err) = self.send_all(packet, addr).await {
				warn!(error = %err, %addr, %source, "failed to forward datagram to subscriber");
			}
		}
	}

	/// Loops on partial `send_to` results. Practically unreachable for UDP
	/// but specified for completeness by `spec.md` §4.5.
	async fn send_all(&self, bytes: &[u8], destination: SocketAddr) -> std::io::Result<()> {
		let mut sent = 0;
		while sent < bytes.len() {
			sent += self.socket.send_to(&bytes[sent..], destination).await?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn test_config(port: u16) -> HubConfig {
		HubConfig { bind_host: "127.0.0.1".to_string(), bind_port: port, secret: "sekret".to_string(), family: AddressFamily::V4Only, subscription_file: None, max_packet_size: 65536 }
	}

	#[tokio::test]
	async fn subscribe_then_forward_reaches_subscriber_and_sender_gets_ok() {
		let hub = Hub::bind(test_config(0)).await.unwrap();
		let hub_addr = hub.socket.local_addr().unwrap();

		let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let subscriber = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let subscriber_addr = subscriber.local_addr().unwrap();

		let subscribe = OscPacket::Message(OscMessage::new(
			"/subscribe",
			vec![
				osc::OscType::String(subscriber_addr.ip().to_string()),
				osc::OscType::Int(subscriber_addr.port() as i32),
				osc::OscType::String("sekret".to_string()),
				osc::OscType::String("A".to_string()),
			]
		));
		client.send_to(&osc::encode(&subscribe), hub_addr).await.unwrap();

		let token = hub.shutdown_token();
		let run_handle = tokio::spawn(async move { hub.run().await });

		let mut buf = [0u8; 1024];
		let (len, _) = client.recv_from(&mut buf).await.unwrap();
		let (_, reply) = osc::decode(&buf[..len]).unwrap();
		assert_eq!(
			reply,
			OscPacket::Message(OscMessage::new(
				"/OK",
				vec![osc::OscType::String("subscribe".into()), osc::OscType::String(subscriber_addr.ip().to_string()), osc::OscType::Int(subscriber_addr.port() as i32)]
			))
		);

		let traffic = OscPacket::Message(OscMessage::new("/foo/bar", vec![osc::OscType::Int(42)]));
		client.send_to(&osc::encode(&traffic), hub_addr).await.unwrap();

		let (len, _) = subscriber.recv_from(&mut buf).await.unwrap();
		let (_, forwarded) = osc::decode(&buf[..len]).unwrap();
		assert_eq!(forwarded, traffic);

		token.cancel();
		run_handle.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn pause_stops_fanout_without_affecting_control() {
		let hub = Hub::bind(test_config(0)).await.unwrap();
		let hub_addr = hub.socket.local_addr().unwrap();

		let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let subscriber = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let subscriber_addr = subscriber.local_addr().unwrap();

		let subscribe = OscPacket::Message(OscMessage::new(
			"/subscribe",
			vec![osc::OscType::String(subscriber_addr.ip().to_string()), osc::OscType::Int(subscriber_addr.port() as i32), osc::OscType::String("sekret".to_string())]
		));
		client.send_to(&osc::encode(&subscribe), hub_addr).await.unwrap();

		let token = hub.shutdown_token();
		let run_handle = tokio::spawn(async move { hub.run().await });

		let mut buf = [0u8; 1024];
		let (len, _) = client.recv_from(&mut buf).await.unwrap();
		osc::decode(&buf[..len]).unwrap();

		let pause_on = OscPacket::Message(OscMessage::new("/pause", vec![osc::OscType::Int(1)]));
		client.send_to(&osc::encode(&pause_on), hub_addr).await.unwrap();
		let (len, _) = client.recv_from(&mut buf).await.unwrap();
		let (_, reply) = osc::decode(&buf[..len]).unwrap();
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![osc::OscType::String("pause".into()), osc::OscType::Int(1)])));

		let traffic = OscPacket::Message(OscMessage::new("/foo/bar", vec![osc::OscType::Int(1)]));
		client.send_to(&osc::encode(&traffic), hub_addr).await.unwrap();

		// Give the hub a moment to (not) forward, then confirm nothing arrived.
		let nothing_arrived = tokio::time::timeout(std::time::Duration::from_millis(100), subscriber.recv_from(&mut buf)).await;
		assert!(nothing_arrived.is_err(), "no datagram should have been forwarded while paused");

		token.cancel();
		run_handle.await.unwrap().unwrap();
	}
}
