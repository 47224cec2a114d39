use thiserror::Error;

/// Errors raised by [`super::decode`] and [`super::decode_proxy`].
///
/// `IsBundle` is a sentinel, not a true error: it's how `decode_proxy`
/// tells the forwarding engine "this datagram is a bundle, stop looking at
/// it and forward it verbatim" without allocating a full decode first.
/// Matches `chaosc`'s `OSCBundleFound` marker exception.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
	#[error("empty packet")]
	Empty,
	#[error("malformed packet: {0}")]
	Malformed(&'static str),
	#[error("unknown type tag '{0}'")]
	UnknownTag(char),
	#[error("packet is a bundle")]
	IsBundle
}

pub type CodecResult<T> = Result<T, CodecError>;

impl<I> nom::error::ParseError<I> for CodecError {
	fn from_error_kind(_input: I, _kind: nom::error::ErrorKind) -> Self {
		CodecError::Malformed("parser error")
	}

	fn append(_input: I, _kind: nom::error::ErrorKind, other: Self) -> Self {
		other
	}
}

impl<I> nom::error::FromExternalError<I, CodecError> for CodecError {
	fn from_external_error(_input: I, _kind: nom::error::ErrorKind, e: CodecError) -> Self {
		e
	}
}
