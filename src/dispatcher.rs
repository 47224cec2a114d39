//! The control dispatcher: one function per reserved OSC address.
//!
//! The reserved-address set is small and fixed, so dispatch is a plain
//! `match` in [`crate::hub::Hub::run`] rather than a runtime table —
//! replacing `chaosc.py`'s `self.callbacks` dict, which existed there only
//! because Python had no cheaper way to express an open-ended registry.
//! Grounded line-by-line on `chaosc.py`'s `__subscription_handler`,
//! `__unsubscription_handler`, `__list_handler`,
//! `__save_subscriptions_handler`, `__toggle_pause_hander`.

use tracing::{info, warn};

use crate::hub::HubState;
use crate::osc::{OscBundle, OscMessage, OscPacket, OscTimeTag, OscType};
use crate::persistence;
use crate::registry::{RegistryKey, SubscribeError, UnsubscribeError};

/// Byte-for-byte (here, string) equality between the supplied token and the
/// hub's configured shared secret. `chaosc` used plain `!=`; constant-time
/// comparison is not required by the spec.
pub fn authorize(token: &str, secret: &str) -> bool {
	token == secret
}

/// `/subscribe "host" port "token" ["label"]`.
pub fn handle_subscribe(args: &[OscType], state: &mut HubState) -> Option<OscPacket> {
	let (host, port, token, label) = match args {
		[OscType::String(host), OscType::Int(port), OscType::String(token)] => (host.as_str(), *port, token.as_str(), None),
		[OscType::String(host), OscType::Int(port), OscType::String(token), OscType::String(label)] => (host.as_str(), *port, token.as_str(), Some(label.as_str())),
		_ => {
			warn!("malformed /subscribe arguments");
			return None;
		}
	};
	let Ok(port) = u16::try_from(port) else {
		warn!(port, "invalid port in /subscribe");
		return None;
	};

	if !authorize(token, &state.config.secret) {
		warn!(host, port, "subscribe rejected: not authorized");
		return Some(failed_reply("subscribe", "not authorized", host, port));
	}
	match state.registry.subscribe(host, port, label) {
		Ok(()) => {
			info!(host, port, ?label, "subscribed");
			Some(ok_reply("subscribe", host, port))
		}
		Err(SubscribeError::AlreadySubscribed) => {
			warn!(host, port, "subscribe rejected: already subscribed");
			Some(failed_reply("subscribe", "already subscribed", host, port))
		}
	}
}

/// `/unsubscribe "host" port "token"`.
pub fn handle_unsubscribe(args: &[OscType], state: &mut HubState) -> Option<OscPacket> {
	let (host, port, token) = match args {
		[OscType::String(host), OscType::Int(port), OscType::String(token)] => (host.as_str(), *port, token.as_str()),
		_ => {
			warn!("malformed /unsubscribe arguments");
			return None;
		}
	};
	let Ok(port) = u16::try_from(port) else {
		warn!(port, "invalid port in /unsubscribe");
		return None;
	};

	if !authorize(token, &state.config.secret) {
		warn!(host, port, "unsubscribe rejected: not authorized");
		return Some(failed_reply("unsubscribe", "not authorized", host, port));
	}
	match state.registry.unsubscribe(host, port) {
		Ok(record) => {
			info!(host, port, label = %record.label, "unsubscribed");
			Some(ok_reply("unsubscribe", host, port))
		}
		Err(UnsubscribeError::NotSubscribed) => {
			warn!(host, port, "unsubscribe rejected: not subscribed");
			Some(failed_reply("unsubscribe", "not subscribed", host, port))
		}
	}
}

/// `/list` (arguments ignored). Always replies with a bundle, even an empty
/// one — matching `chaosc`'s `__list_handler`, which never special-cases a
/// subscriber-less registry.
pub fn handle_list(state: &HubState) -> OscPacket {
	let content = state
		.registry
		.list()
		.map(|(key, record)| {
			let (host, port) = match key {
				RegistryKey::Resolved(addr) => (addr.ip().to_string(), addr.port()),
				RegistryKey::Literal(host, port) => (host.clone(), *port)
			};
			OscPacket::Message(OscMessage::new("/li", vec![OscType::String(host), OscType::Int(port as i32), OscType::String(record.label.clone())]))
		})
		.collect();
	OscPacket::Bundle(OscBundle { time_tag: OscTimeTag::IMMEDIATE, content })
}

/// `/save "token"`.
pub fn handle_save(args: &[OscType], state: &HubState) -> Option<OscPacket> {
	let token = match args {
		[OscType::String(token)] => token.as_str(),
		_ => {
			warn!("malformed /save arguments");
			return None;
		}
	};
	if !authorize(token, &state.config.secret) {
		warn!("save rejected: not authorized");
		return Some(simple_reply("/save", None, "not authorized"));
	}
	match persistence::save(&state.registry, state.config.subscription_file.as_deref()) {
		Ok(path) => {
			let path = path.display().to_string();
			info!(path, "saved subscriptions");
			Some(simple_reply("/save", Some(&path), ""))
		}
		Err(err) => {
			warn!(error = %err, "failed to save subscriptions");
			Some(simple_reply("/save", None, "could not save to file"))
		}
	}
}

/// `/pause 0|nonzero`. Never requires authentication — matching the
/// reserved-address table, which lists no token argument for it.
pub fn handle_pause(args: &[OscType], state: &mut HubState) -> Option<OscPacket> {
	let value = match args {
		[OscType::Int(v)] => *v,
		_ => {
			warn!("malformed /pause arguments");
			return None;
		}
	};
	state.paused = value != 0;
	info!(paused = state.paused, "pause toggled");
	Some(OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("pause".to_string()), OscType::Int(state.paused as i32)])))
}

fn ok_reply(op: &str, host: &str, port: u16) -> OscPacket {
	OscPacket::Message(OscMessage::new("/OK", vec![OscType::String(op.to_string()), OscType::String(host.to_string()), OscType::Int(port as i32)]))
}

fn failed_reply(op: &str, reason: &str, host: &str, port: u16) -> OscPacket {
	OscPacket::Message(OscMessage::new(
		"/Failed",
		vec![OscType::String(op.to_string()), OscType::String(reason.to_string()), OscType::String(host.to_string()), OscType::Int(port as i32)]
	))
}

/// Builds the `/OK "/save" path` / `/Failed "/save" reason` replies, the
/// only two control replies that don't carry a host/port pair.
fn simple_reply(op: &str, ok_arg: Option<&str>, failure_reason: &str) -> OscPacket {
	match ok_arg {
		Some(arg) => OscPacket::Message(OscMessage::new("/OK", vec![OscType::String(op.to_string()), OscType::String(arg.to_string())])),
		None => OscPacket::Message(OscMessage::new("/Failed", vec![OscType::String(op.to_string()), OscType::String(failure_reason.to_string())]))
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::hub::HubConfig;
	use crate::registry::Registry;
	use crate::resolver::AddressFamily;

	fn fresh_state() -> HubState {
		HubState {
			config: HubConfig {
				bind_host: "127.0.0.1".to_string(),
				bind_port: 9000,
				secret: "sekret".to_string(),
				family: AddressFamily::V4Only,
				subscription_file: None,
				max_packet_size: 16 * 1024 * 1024
			},
			registry: Registry::new(AddressFamily::V4Only),
			paused: false
		}
	}

	#[test]
	fn subscribe_then_duplicate_then_unsubscribe() {
		let mut state = fresh_state();

		let reply = handle_subscribe(&[OscType::String("127.0.0.1".into()), OscType::Int(9001), OscType::String("sekret".into()), OscType::String("A".into())], &mut state).unwrap();
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("subscribe".into()), OscType::String("127.0.0.1".into()), OscType::Int(9001)])));
		assert_eq!(state.registry.len(), 1);

		let reply = handle_subscribe(&[OscType::String("127.0.0.1".into()), OscType::Int(9001), OscType::String("sekret".into())], &mut state).unwrap();
		assert_eq!(
			reply,
			OscPacket::Message(OscMessage::new(
				"/Failed",
				vec![OscType::String("subscribe".into()), OscType::String("already subscribed".into()), OscType::String("127.0.0.1".into()), OscType::Int(9001)]
			))
		);

		let reply = handle_unsubscribe(&[OscType::String("127.0.0.1".into()), OscType::Int(9001), OscType::String("sekret".into())], &mut state).unwrap();
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("unsubscribe".into()), OscType::String("127.0.0.1".into()), OscType::Int(9001)])));
		assert!(state.registry.is_empty());
	}

	#[test]
	fn subscribe_with_wrong_token_is_rejected_without_mutation() {
		let mut state = fresh_state();
		let reply = handle_subscribe(&[OscType::String("127.0.0.1".into()), OscType::Int(9001), OscType::String("wrong".into())], &mut state).unwrap();
		assert_eq!(
			reply,
			OscPacket::Message(OscMessage::new(
				"/Failed",
				vec![OscType::String("subscribe".into()), OscType::String("not authorized".into()), OscType::String("127.0.0.1".into()), OscType::Int(9001)]
			))
		);
		assert!(state.registry.is_empty());
	}

	#[test]
	fn pause_toggles_flag_and_replies_ok() {
		let mut state = fresh_state();
		let reply = handle_pause(&[OscType::Int(1)], &mut state).unwrap();
		assert!(state.paused);
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("pause".into()), OscType::Int(1)])));

		let reply = handle_pause(&[OscType::Int(0)], &mut state).unwrap();
		assert!(!state.paused);
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("pause".into()), OscType::Int(0)])));
	}

	#[test]
	fn pause_reply_normalizes_nonzero_argument_to_one() {
		let mut state = fresh_state();
		let reply = handle_pause(&[OscType::Int(5)], &mut state).unwrap();
		assert!(state.paused);
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/OK", vec![OscType::String("pause".into()), OscType::Int(1)])));
	}

	#[test]
	fn list_replies_with_bundle_even_when_empty() {
		let state = fresh_state();
		let reply = handle_list(&state);
		assert_eq!(reply, OscPacket::Bundle(OscBundle { time_tag: OscTimeTag::IMMEDIATE, content: vec![] }));
	}

	#[test]
	fn save_without_auth_is_rejected() {
		let state = fresh_state();
		let reply = handle_save(&[OscType::String("wrong".into())], &state).unwrap();
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/Failed", vec![OscType::String("/save".into()), OscType::String("not authorized".into())])));
	}

	#[test]
	fn save_failure_reason_never_leaks_io_error_text() {
		let mut state = fresh_state();
		state.config.subscription_file = Some(PathBuf::from("/nonexistent-dir-for-test/targets.conf"));
		let reply = handle_save(&[OscType::String("sekret".into())], &state).unwrap();
		assert_eq!(reply, OscPacket::Message(OscMessage::new("/Failed", vec![OscType::String("/save".into()), OscType::String("could not save to file".into())])));
	}
}
