//! `oschub`: a multi-unicast application-level gateway for Open Sound
//! Control (OSC) over UDP.
//!
//! The hub accepts OSC packets from an arbitrary set of publishers and
//! re-emits each one to every currently subscribed receiver. A small set of
//! reserved addresses — `/subscribe`, `/unsubscribe`, `/list`, `/save`,
//! `/pause` — mutate the subscriber set and manage persistence; see
//! [`dispatcher`] for their exact argument shapes and replies.
//!
//! ```no_run
//! use oschub::{AddressFamily, Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//! 	let hub = Hub::bind(HubConfig {
//! 		bind_host: "0.0.0.0".to_string(),
//! 		bind_port: 9000,
//! 		secret: "sekret".to_string(),
//! 		family: AddressFamily::V4Only,
//! 		subscription_file: None,
//! 		max_packet_size: oschub::hub::DEFAULT_MAX_PACKET_SIZE
//! 	})
//! 	.await?;
//! 	hub.run().await?;
//! 	Ok(())
//! }
//! ```

pub mod dispatcher;
mod error;
pub mod hub;
pub mod osc;
pub mod persistence;
pub mod registry;
pub mod resolver;

pub use self::error::{HubError, HubResult};
pub use self::hub::{Hub, HubConfig, HubState};
pub use self::osc::{decode, decode_proxy, encode, CodecError, OscBundle, OscMessage, OscPacket, OscTimeTag, OscType};
pub use self::registry::{Registry, RegistryKey, SubscribeError, SubscriberRecord, UnsubscribeError};
pub use self::resolver::AddressFamily;
