use nom::bytes::complete::{take, take_till};
use nom::combinator::map;
use nom::multi::many0;
use nom::number::complete::{be_f32, be_f64, be_i32, be_i64, be_u32};
use nom::sequence::{terminated, tuple};
use nom::{IResult, Offset};

use super::error::{CodecError, CodecResult};
use super::{OscBundle, OscMessage, OscPacket, OscTimeTag, OscType};

/// Common MTU size for Ethernet; used as a sizing hint for callers, not
/// enforced as a hard cap by the decoder itself.
pub const MTU: usize = 1536;

/// The result of [`decode_proxy`]: the address, the raw type-tag string
/// (including its leading `,`), and everything after it, with no arguments
/// materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDecode<'a> {
	pub address: &'a str,
	pub type_tags: &'a str,
	pub remainder: &'a [u8]
}

/// Fast-path decode: extracts only the address and type-tag string.
///
/// Fails with the sentinel [`CodecError::IsBundle`] — not a real error —
/// when the datagram is a bundle, so the forwarding engine can tell
/// "forward me as-is" apart from "look at my address" without paying for
/// a full argument decode on the overwhelmingly common forwarding path.
pub fn decode_proxy(input: &[u8]) -> CodecResult<ProxyDecode<'_>> {
	if input.is_empty() {
		return Err(CodecError::Empty);
	}
	let (first, rest) = read_string(input, input)?;
	if first == "#bundle" {
		return Err(CodecError::IsBundle);
	}
	if first.starts_with(',') {
		// Legacy form: no address was sent, `first` is the type-tag string.
		return Ok(ProxyDecode { address: "", type_tags: first, remainder: rest });
	}
	let (type_tags, remainder) = read_string(rest, input)?;
	if !type_tags.starts_with(',') {
		return Err(CodecError::Malformed("type-tag string must start with ','"));
	}
	Ok(ProxyDecode { address: first, type_tags, remainder })
}

/// Full decode: materializes every argument of a message, or recursively
/// decodes every child of a bundle. Returns the bytes left over after the
/// packet (always empty for a datagram that contains exactly one packet).
pub fn decode(input: &[u8]) -> CodecResult<(&[u8], OscPacket)> {
	if input.is_empty() {
		return Err(CodecError::Empty);
	}
	decode_packet(input, input)
}

fn decode_packet<'a>(input: &'a [u8], original: &'a [u8]) -> CodecResult<(&'a [u8], OscPacket)> {
	let (first, rest) = read_string(input, original)?;
	if first == "#bundle" {
		let (bundle, rest) = decode_bundle(rest, original)?;
		return Ok((rest, OscPacket::Bundle(bundle)));
	}
	if first.starts_with(',') {
		let (msg, rest) = decode_args(String::new(), first, rest, original)?;
		return Ok((rest, OscPacket::Message(msg)));
	}
	let (msg, rest) = decode_message(first, rest, original)?;
	Ok((rest, OscPacket::Message(msg)))
}

fn decode_message<'a>(address: &str, input: &'a [u8], original: &'a [u8]) -> CodecResult<(OscMessage, &'a [u8])> {
	let (type_tags, rest) = read_string(input, original)?;
	decode_args(address.to_string(), type_tags, rest, original)
}

fn decode_args<'a>(address: String, type_tags: &str, mut rest: &'a [u8], original: &'a [u8]) -> CodecResult<(OscMessage, &'a [u8])> {
	if !type_tags.starts_with(',') {
		return Err(CodecError::Malformed("type-tag string must start with ','"));
	}
	let mut args = Vec::with_capacity(type_tags.len().saturating_sub(1));
	for tag in type_tags.chars().skip(1) {
		let (arg, next) = read_arg(rest, original, tag)?;
		args.push(arg);
		rest = next;
	}
	Ok((OscMessage::new(address, args), rest))
}

fn decode_bundle<'a>(input: &'a [u8], original: &'a [u8]) -> CodecResult<(OscBundle, &'a [u8])> {
	tuple((timetag_parser, many0(|i| read_bundle_element(i, original))))(input)
		.map(|(rest, (time_tag, content))| (OscBundle { time_tag, content }, rest))
		.map_err(from_nom)
}

/// One element of a bundle's content: a 32-bit length prefix followed by
/// exactly that many bytes, which must decode as a complete packet with
/// nothing left over. An empty `input` ends the bundle (`Err::Error`, which
/// `many0` treats as "no more elements"); any other malformed element is a
/// hard `Err::Failure` so `many0` doesn't silently swallow it as the end of
/// the list.
fn read_bundle_element<'a>(input: &'a [u8], original: &'a [u8]) -> IResult<&'a [u8], OscPacket, CodecError> {
	if input.is_empty() {
		return Err(nom::Err::Error(CodecError::Malformed("no more bundle elements")));
	}
	let (input, elem_size) = be_u32::<_, CodecError>(input).map_err(|_| nom::Err::Failure(CodecError::Malformed("bundle element length is truncated")))?;
	let (input, elem_bytes) = take::<_, _, CodecError>(elem_size)(input).map_err(|_| nom::Err::Failure(CodecError::Malformed("bundle element shorter than its declared length")))?;
	let (child_remainder, packet) = decode_packet(elem_bytes, original).map_err(nom::Err::Failure)?;
	if !child_remainder.is_empty() {
		return Err(nom::Err::Failure(CodecError::Malformed("bundle element has trailing bytes")));
	}
	Ok((input, packet))
}

fn read_arg<'a>(input: &'a [u8], original: &'a [u8], tag: char) -> CodecResult<(OscType, &'a [u8])> {
	match tag {
		'i' => read_i32(input).map(|(v, r)| (OscType::Int(v), r)),
		'f' => read_f32(input).map(|(v, r)| (OscType::Float(v), r)),
		'h' => read_i64(input).map(|(v, r)| (OscType::Long(v), r)),
		'd' => read_f64(input).map(|(v, r)| (OscType::Double(v), r)),
		's' => {
			let (s, rest) = read_string(input, original)?;
			Ok((OscType::String(s.to_string()), rest))
		}
		'b' => read_blob(input),
		't' => {
			let (tag, rest) = read_timetag(input)?;
			Ok((OscType::Time(tag), rest))
		}
		other => Err(CodecError::UnknownTag(other))
	}
}

/// Reads the blob argument written by [`super::encoder::encode`].
///
/// The length prefix holds the *padded* length (see the encoder's blob
/// quirk), so the bytes taken here already include any zero padding the
/// encoder appended — this crate does not attempt to strip it back off,
/// matching `chaosc`'s `decode_blob`.
fn read_blob(input: &[u8]) -> CodecResult<(OscType, &[u8])> {
	let (len, rest) = read_u32(input)?;
	let len = len as usize;
	if rest.len() < len {
		return Err(CodecError::Malformed("blob shorter than its declared length"));
	}
	let (blob, rest) = rest.split_at(len);
	Ok((OscType::Blob(blob.to_vec()), rest))
}

fn timetag_parser(input: &[u8]) -> IResult<&[u8], OscTimeTag, CodecError> {
	map(tuple((be_u32, be_u32)), |(seconds, fraction)| OscTimeTag { seconds, fraction })(input)
}

fn read_timetag(input: &[u8]) -> CodecResult<(OscTimeTag, &[u8])> {
	timetag_parser(input).map(|(rest, tag)| (tag, rest)).map_err(from_nom)
}

fn read_i32(input: &[u8]) -> CodecResult<(i32, &[u8])> {
	be_i32::<_, CodecError>(input).map(|(r, v)| (v, r)).map_err(|_| CodecError::Malformed("expected 4 bytes for an i32 argument"))
}

fn read_f32(input: &[u8]) -> CodecResult<(f32, &[u8])> {
	be_f32::<_, CodecError>(input).map(|(r, v)| (v, r)).map_err(|_| CodecError::Malformed("expected 4 bytes for an f32 argument"))
}

fn read_i64(input: &[u8]) -> CodecResult<(i64, &[u8])> {
	be_i64::<_, CodecError>(input).map(|(r, v)| (v, r)).map_err(|_| CodecError::Malformed("expected 8 bytes for an i64 argument"))
}

fn read_f64(input: &[u8]) -> CodecResult<(f64, &[u8])> {
	be_f64::<_, CodecError>(input).map(|(r, v)| (v, r)).map_err(|_| CodecError::Malformed("expected 8 bytes for an f64 argument"))
}

fn read_u32(input: &[u8]) -> CodecResult<(u32, &[u8])> {
	be_u32::<_, CodecError>(input).map(|(r, v)| (v, r)).map_err(|_| CodecError::Malformed("expected 4 bytes"))
}

/// Reads a NUL-terminated, 4-byte-aligned OSC string from `input`.
///
/// Alignment is computed relative to `original` (the start of the whole
/// packet being decoded), matching the OSC spec's requirement that
/// *every* field be 4-byte aligned from the start of the packet, not just
/// from the start of the current string. A string with no terminator
/// anywhere in `input` falls out of `take_till` as "consumed everything,
/// found nothing" — `pad_to_boundary` then has no bytes left to take and
/// fails, which is what rejects it.
fn read_string<'a>(input: &'a [u8], original: &'a [u8]) -> CodecResult<(&'a str, &'a [u8])> {
	let (rest, raw) = terminated(take_till(|b| b == 0u8), pad_to_boundary(original))(input).map_err(from_nom)?;
	let s = std::str::from_utf8(raw).map_err(|_| CodecError::Malformed("OSC string is not valid utf-8"))?;
	Ok((s, rest))
}

/// Skips from a NUL byte to the next 4-byte boundary measured from the
/// start of `original`, mirroring the teacher's `pad_to_32_bit_boundary`.
fn pad_to_boundary<'a>(original: &'a [u8]) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], (), CodecError> {
	move |input: &'a [u8]| {
		let offset = 4 - original.offset(input) % 4;
		let (input, _) = take(offset)(input)?;
		Ok((input, ()))
	}
}

fn from_nom(e: nom::Err<CodecError>) -> CodecError {
	match e {
		nom::Err::Incomplete(_) => CodecError::Malformed("incomplete data"),
		nom::Err::Error(err) | nom::Err::Failure(err) => err
	}
}
