//! The subscription registry: the authoritative mapping from subscriber
//! endpoint to subscriber record.
//!
//! Grounded on `chaosc.py`'s `self.targets` dict and its
//! `__subscribe`/`__unsubscribe` handlers.

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

use crate::resolver::{self, AddressFamily};

/// The registry's key. A successful DNS resolution at subscribe time keys
/// on the resolved socket address; a failed resolution falls back to the
/// literal (host, port) pair as given by the client, so a subscription to
/// a not-yet-resolvable hostname still works once DNS recovers — see
/// `spec.md` §9's "Resolver fallback" design note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryKey {
	Resolved(SocketAddr),
	Literal(String, u16)
}

impl RegistryKey {
	fn build(host: &str, port: u16, family: AddressFamily) -> RegistryKey {
		match resolver::resolve(host, port, family) {
			Ok(addr) => RegistryKey::Resolved(addr),
			Err(err) => {
				warn!(%host, port, error = %err, "could not resolve subscriber host, keying on literal host/port");
				RegistryKey::Literal(host.to_string(), port)
			}
		}
	}

	/// The address to actually send to, re-resolving a [`RegistryKey::Literal`]
	/// on every call since it was never successfully resolved in the first
	/// place. Returns `None` if a literal key still doesn't resolve.
	pub fn send_addr(&self, family: AddressFamily) -> Option<SocketAddr> {
		match self {
			RegistryKey::Resolved(addr) => Some(*addr),
			RegistryKey::Literal(host, port) => resolver::resolve(host, *port, family).ok()
		}
	}
}

/// A subscriber's metadata: the label it was subscribed with, and the
/// original host/port strings it was subscribed under (which may differ in
/// spelling from the canonical form of a [`RegistryKey::Resolved`] address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
	pub label: String,
	pub host: String,
	pub port: u16
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscribeError {
	#[error("already subscribed")]
	AlreadySubscribed
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnsubscribeError {
	#[error("not subscribed")]
	NotSubscribed
}

/// The authoritative subscriber set. Mutated only by the control
/// dispatcher, read by the forwarding engine's fanout step.
#[derive(Debug)]
pub struct Registry {
	entries: HashMap<RegistryKey, SubscriberRecord>,
	family: AddressFamily
}

impl Registry {
	pub fn new(family: AddressFamily) -> Registry {
		Registry { entries: HashMap::new(), family }
	}

	/// Resolves `(host, port)`, falling back to a literal key on resolution
	/// failure, and inserts a new record. Fails without mutating if the
	/// resolved (or literal) key is already present.
	pub fn subscribe(&mut self, host: &str, port: u16, label: Option<&str>) -> Result<(), SubscribeError> {
		let key = RegistryKey::build(host, port, self.family);
		if self.entries.contains_key(&key) {
			return Err(SubscribeError::AlreadySubscribed);
		}
		self.entries.insert(key, SubscriberRecord { label: label.unwrap_or("").to_string(), host: host.to_string(), port });
		Ok(())
	}

	/// Resolves `(host, port)` the same way [`Registry::subscribe`] does and
	/// removes the matching entry.
	pub fn unsubscribe(&mut self, host: &str, port: u16) -> Result<SubscriberRecord, UnsubscribeError> {
		let key = RegistryKey::build(host, port, self.family);
		self.entries.remove(&key).ok_or(UnsubscribeError::NotSubscribed)
	}

	/// A snapshot of every current subscription, suitable for building a
	/// `/list` reply bundle or iterating the fanout.
	pub fn list(&self) -> impl Iterator<Item = (&RegistryKey, &SubscriberRecord)> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn family(&self) -> AddressFamily {
		self.family
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn subscribe_then_unsubscribe_round_trips() {
		let mut reg = Registry::new(AddressFamily::V4Only);
		reg.subscribe("127.0.0.1", 9001, Some("A")).unwrap();
		assert_eq!(reg.len(), 1);

		let record = reg.unsubscribe("127.0.0.1", 9001).unwrap();
		assert_eq!(record.label, "A");
		assert!(reg.is_empty());
	}

	#[test]
	fn duplicate_subscribe_is_rejected_and_does_not_mutate() {
		let mut reg = Registry::new(AddressFamily::V4Only);
		reg.subscribe("127.0.0.1", 9001, Some("A")).unwrap();
		let err = reg.subscribe("127.0.0.1", 9001, Some("B")).unwrap_err();
		assert_eq!(err, SubscribeError::AlreadySubscribed);
		assert_eq!(reg.len(), 1);
		let (_, record) = reg.list().next().unwrap();
		assert_eq!(record.label, "A");
	}

	#[test]
	fn unsubscribe_of_absent_entry_fails() {
		let mut reg = Registry::new(AddressFamily::V4Only);
		let err = reg.unsubscribe("127.0.0.1", 9001).unwrap_err();
		assert_eq!(err, UnsubscribeError::NotSubscribed);
	}

	#[test]
	fn unresolvable_host_falls_back_to_literal_key() {
		let mut reg = Registry::new(AddressFamily::V4Only);
		reg.subscribe("this-host-does-not-resolve.invalid", 9001, None).unwrap();
		assert_eq!(reg.len(), 1);
		let (key, _) = reg.list().next().unwrap();
		assert_eq!(key, &RegistryKey::Literal("this-host-does-not-resolve.invalid".to_string(), 9001));
	}
}
