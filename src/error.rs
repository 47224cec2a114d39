use std::io;

use thiserror::Error;

use crate::osc::CodecError;
use crate::registry::{SubscribeError, UnsubscribeError};

/// The hub's top-level error type, aggregating every layer named in
/// `spec.md` §7 ("Error Handling Design"). Most of these never escape to a
/// caller — they're logged and swallowed at the point they're raised (see
/// each variant's doc) — this enum exists so the few call sites that *do*
/// need to propagate (socket bind, fatal I/O) have a single error type to
/// work with, the way the teacher's `VMCError` aggregates `io::Error` and
/// `OSCError`, but derived via `thiserror` rather than hand-written.
#[derive(Debug, Error)]
pub enum HubError {
	/// Bind failure or an unrecoverable error on the hub's own socket —
	/// the only I/O errors the spec allows to terminate the process.
	#[error("socket error: {0}")]
	Io(#[from] io::Error),
	/// Never raised on the forwarding hot path (codec errors there are
	/// logged and the datagram dropped); reachable only from code that
	/// chooses to propagate a decode failure instead of swallowing it.
	#[error("protocol error: {0}")]
	Codec(#[from] CodecError),
	#[error("registry error: {0}")]
	Subscribe(#[from] SubscribeError),
	#[error("registry error: {0}")]
	Unsubscribe(#[from] UnsubscribeError)
}

pub type HubResult<T> = Result<T, HubError>;
