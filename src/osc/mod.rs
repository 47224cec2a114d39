//! OSC 1.1 wire format: types, encoder, decoder.
//!
//! This module only knows about the core OSC 1.1 argument types the hub
//! needs to forward and to parse its own control messages. No I/O, no
//! shared state — every function here is a pure conversion between bytes
//! and structured values.

pub mod decoder;
pub mod encoder;
pub mod error;
#[cfg(test)]
mod proptests;

pub use self::decoder::{decode, decode_proxy, ProxyDecode, MTU};
pub use self::encoder::{encode, encode_into, encode_string, encode_string_into};
pub use self::error::CodecError;

/// An OSC time tag: seconds since the NTP epoch (1900-01-01 UTC) and a
/// fractional part, as two big-endian `u32`s on the wire.
///
/// A timestamp of `(0, 0)` is reserved by the OSC spec to mean
/// "immediately"; this crate always emits `(0, 1)` for that case (see
/// [`encoder::encode_timetag`]), matching the `chaosc` original's
/// `encode_timetag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OscTimeTag {
	pub seconds: u32,
	pub fraction: u32
}

impl OscTimeTag {
	/// The canonical "apply immediately" time tag.
	pub const IMMEDIATE: OscTimeTag = OscTimeTag { seconds: 0, fraction: 1 };

	/// NTP epoch (1900-01-01) to Unix epoch (1970-01-01) offset, in seconds.
	const UNIX_OFFSET: i64 = 2_208_988_800;

	/// Builds a time tag from a floating-point count of seconds since the
	/// Unix epoch, matching `chaosc`'s `encode_timetag`: non-positive values
	/// collapse to [`OscTimeTag::IMMEDIATE`].
	pub fn from_unix_seconds(seconds: f64) -> OscTimeTag {
		if seconds <= 0.0 {
			return OscTimeTag::IMMEDIATE;
		}
		let whole = seconds.trunc();
		let fract = seconds - whole;
		let ntp_seconds = (whole as i64) + OscTimeTag::UNIX_OFFSET;
		OscTimeTag {
			seconds: ntp_seconds as u32,
			fraction: (fract * (u32::MAX as f64 + 1.0)).round() as u32
		}
	}

	/// The inverse of [`OscTimeTag::from_unix_seconds`].
	pub fn to_unix_seconds(self) -> f64 {
		let secs = (self.seconds as i64 - OscTimeTag::UNIX_OFFSET) as f64;
		let fract = (self.fraction as f64) / (u32::MAX as f64 + 1.0);
		secs + fract
	}
}

impl From<(u32, u32)> for OscTimeTag {
	fn from((seconds, fraction): (u32, u32)) -> OscTimeTag {
		OscTimeTag { seconds, fraction }
	}
}

impl From<OscTimeTag> for (u32, u32) {
	fn from(tag: OscTimeTag) -> (u32, u32) {
		(tag.seconds, tag.fraction)
	}
}

/// A single OSC argument. The type-tag character used on the wire for each
/// variant is noted alongside it.
#[derive(Debug, Clone, PartialEq)]
pub enum OscType {
	/// `i`: 32-bit big-endian signed integer.
	Int(i32),
	/// `f`: 32-bit big-endian IEEE float.
	Float(f32),
	/// `h`: 64-bit big-endian signed integer. Decoded for compatibility but
	/// never constructed by the hub's own control replies.
	Long(i64),
	/// `d`: 64-bit big-endian IEEE double.
	Double(f64),
	/// `s`: a zero-padded, NUL-terminated string.
	String(String),
	/// `b`: a length-prefixed blob.
	Blob(Vec<u8>),
	/// `t`: an NTP time tag.
	Time(OscTimeTag)
}

impl OscType {
	/// The type-tag character this argument encodes as.
	pub fn tag(&self) -> char {
		match self {
			OscType::Int(_) => 'i',
			OscType::Float(_) => 'f',
			OscType::Long(_) => 'h',
			OscType::Double(_) => 'd',
			OscType::String(_) => 's',
			OscType::Blob(_) => 'b',
			OscType::Time(_) => 't'
		}
	}
}

impl From<i32> for OscType {
	fn from(v: i32) -> Self {
		OscType::Int(v)
	}
}
impl From<f32> for OscType {
	fn from(v: f32) -> Self {
		OscType::Float(v)
	}
}
impl From<i64> for OscType {
	fn from(v: i64) -> Self {
		OscType::Long(v)
	}
}
impl From<f64> for OscType {
	fn from(v: f64) -> Self {
		OscType::Double(v)
	}
}
impl From<String> for OscType {
	fn from(v: String) -> Self {
		OscType::String(v)
	}
}
impl<'a> From<&'a str> for OscType {
	fn from(v: &'a str) -> Self {
		OscType::String(v.to_string())
	}
}
impl From<Vec<u8>> for OscType {
	fn from(v: Vec<u8>) -> Self {
		OscType::Blob(v)
	}
}
impl From<OscTimeTag> for OscType {
	fn from(v: OscTimeTag) -> Self {
		OscType::Time(v)
	}
}

/// An OSC message: an address and its arguments. The type-tag string is
/// derived from `args` at encode time, never stored, so it can never drift
/// out of sync with the argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
	pub address: String,
	pub args: Vec<OscType>
}

impl OscMessage {
	pub fn new(address: impl Into<String>, args: Vec<OscType>) -> Self {
		OscMessage { address: address.into(), args }
	}

	/// An address made only of a type-tag-less string, i.e. zero arguments.
	pub fn addr_only(address: impl Into<String>) -> Self {
		OscMessage { address: address.into(), args: Vec::new() }
	}
}

/// An OSC bundle: a time tag plus an ordered list of child messages or
/// bundles. Bundles never appear inside messages — only [`OscPacket`]
/// models that nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct OscBundle {
	pub time_tag: OscTimeTag,
	pub content: Vec<OscPacket>
}

/// The top-level value a decoded OSC datagram produces.
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
	Message(OscMessage),
	Bundle(OscBundle)
}

impl OscPacket {
	pub fn message(&self) -> Option<&OscMessage> {
		match self {
			OscPacket::Message(m) => Some(m),
			OscPacket::Bundle(_) => None
		}
	}

	pub fn into_message(self) -> Option<OscMessage> {
		match self {
			OscPacket::Message(m) => Some(m),
			OscPacket::Bundle(_) => None
		}
	}
}

impl From<OscMessage> for OscPacket {
	fn from(m: OscMessage) -> Self {
		OscPacket::Message(m)
	}
}
impl From<OscBundle> for OscPacket {
	fn from(b: OscBundle) -> Self {
		OscPacket::Bundle(b)
	}
}
