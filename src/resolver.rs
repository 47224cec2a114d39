//! Host resolution and bind-address fixups.
//!
//! A thin wrapper over the OS resolver. No caching, no retries — DNS
//! failures are the caller's concern (see [`crate::registry`]'s literal-key
//! fallback).

use std::borrow::Cow;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Which address family the hub's socket and resolver lookups are
/// restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
	V4Only,
	DualStack
}

/// Resolves `host:port` to a concrete [`SocketAddr`].
///
/// Uses the standard library's synchronous resolver (`getaddrinfo` under
/// the hood) and takes the *last* entry of the result list, matching the
/// legacy `[-1]` indexing of `chaosc/lib.py:resolve_host`. In
/// [`AddressFamily::V4Only`] mode, results are filtered down to `V4`
/// addresses first; in [`AddressFamily::DualStack`] mode every address the
/// resolver returns is eligible, which on a normal dual-stack host includes
/// v4-mapped v6 addresses for v4-only names.
pub fn resolve(host: &str, port: u16, family: AddressFamily) -> io::Result<SocketAddr> {
	let candidates = (host, port).to_socket_addrs()?;
	let chosen = match family {
		AddressFamily::V4Only => candidates.filter(|a| a.is_ipv4()).last(),
		AddressFamily::DualStack => candidates.last()
	};
	chosen.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address found for {host}:{port}")))
}

/// Rewrites a bind host string for [`AddressFamily::V4Only`] mode: `::` and
/// `::1` (the wildcard and loopback IPv6 addresses) have no meaning on a
/// v4-only socket, so they're rewritten to their v4 equivalents. Any other
/// host string passes through unchanged.
pub fn fixup_bind_host(host: &str, family: AddressFamily) -> Cow<'_, str> {
	if family != AddressFamily::V4Only {
		return Cow::Borrowed(host);
	}
	match host {
		"::" => Cow::Borrowed("0.0.0.0"),
		"::1" => Cow::Borrowed("127.0.0.1"),
		other => Cow::Borrowed(other)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_loopback() {
		let addr = resolve("127.0.0.1", 9001, AddressFamily::V4Only).unwrap();
		assert_eq!(addr, "127.0.0.1:9001".parse::<SocketAddr>().unwrap());
	}

	#[test]
	fn unresolvable_host_fails() {
		let result = resolve("this-host-does-not-resolve.invalid", 9001, AddressFamily::DualStack);
		assert!(result.is_err());
	}

	#[test]
	fn fixup_only_applies_in_v4_only_mode() {
		assert_eq!(fixup_bind_host("::", AddressFamily::V4Only), "0.0.0.0");
		assert_eq!(fixup_bind_host("::1", AddressFamily::V4Only), "127.0.0.1");
		assert_eq!(fixup_bind_host("::", AddressFamily::DualStack), "::");
		assert_eq!(fixup_bind_host("192.0.2.1", AddressFamily::V4Only), "192.0.2.1");
	}
}
