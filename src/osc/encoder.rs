use super::{OscBundle, OscMessage, OscPacket, OscTimeTag, OscType};

/// Takes a reference to an OSC packet and returns the encoded byte vector.
///
/// # Example
///
/// ```
/// use oschub::osc::{encoder, OscMessage, OscPacket, OscType};
///
/// let packet = OscPacket::Message(OscMessage::new("/greet/me", vec![OscType::String("hi!".to_string())]));
/// let bytes = encoder::encode(&packet);
/// assert!(!bytes.is_empty());
/// ```
pub fn encode(packet: &OscPacket) -> Vec<u8> {
	let mut bytes = Vec::new();
	encode_into(packet, &mut bytes);
	bytes
}

/// Appends the encoding of `packet` to `out`.
pub fn encode_into(packet: &OscPacket, out: &mut Vec<u8>) {
	match packet {
		OscPacket::Message(msg) => encode_message(msg, out),
		OscPacket::Bundle(bundle) => encode_bundle(bundle, out)
	}
}

fn encode_message(msg: &OscMessage, out: &mut Vec<u8>) {
	encode_string_into(&msg.address, out);

	let tag_start = out.len();
	out.push(b',');
	for arg in &msg.args {
		out.push(arg.tag() as u8);
	}
	let tag_len = out.len() - tag_start;
	let new_len = tag_start + pad(tag_len as u64 + 1) as usize;
	out.resize(new_len, 0);

	for arg in &msg.args {
		encode_arg_data(arg, out);
	}
}

/// Each child is length-prefixed with the length of its own encoding,
/// mirroring `chaosc`'s bundle encoder, which runs each child through its
/// blob encoder. Since a message or bundle's encoding is always a
/// multiple of 4 bytes already, there's no distinction here between a
/// "logical" and "padded" length — the quirk in [`encode_blob_into`] only
/// has externally visible effect on `b`-tagged message arguments.
fn encode_bundle(bundle: &OscBundle, out: &mut Vec<u8>) {
	encode_string_into("#bundle", out);
	encode_timetag_into(bundle.time_tag, out);

	for child in &bundle.content {
		let len_mark = out.len();
		out.extend_from_slice(&[0u8; 4]);
		let child_start = out.len();
		encode_into(child, out);
		let child_len = out.len() - child_start;
		out[len_mark..child_start].copy_from_slice(&(child_len as u32).to_be_bytes());
	}
}

fn encode_arg_data(arg: &OscType, out: &mut Vec<u8>) {
	match arg {
		OscType::Int(x) => out.extend_from_slice(&x.to_be_bytes()),
		OscType::Long(x) => out.extend_from_slice(&x.to_be_bytes()),
		OscType::Float(x) => out.extend_from_slice(&x.to_be_bytes()),
		OscType::Double(x) => out.extend_from_slice(&x.to_be_bytes()),
		OscType::String(s) => encode_string_into(s, out),
		OscType::Blob(b) => encode_blob_into(b, out),
		OscType::Time(t) => encode_timetag_into(*t, out)
	}
}

/// Zero-pads `s` so the encoded length (including a NUL terminator) is a
/// multiple of 4, per `spec.md` §4.1.
pub fn encode_string<S: AsRef<str>>(s: S) -> Vec<u8> {
	let mut out = Vec::new();
	encode_string_into(s, &mut out);
	out
}

pub fn encode_string_into<S: AsRef<str>>(s: S, out: &mut Vec<u8>) {
	let s = s.as_ref();
	let start = out.len();
	out.extend_from_slice(s.as_bytes());
	let new_len = start + pad(s.len() as u64 + 1) as usize;
	out.resize(new_len, 0);
}

/// Encodes a blob argument.
///
/// **Quirk, preserved intentionally**: the length prefix stores the
/// *padded* length of the blob, not its logical (unpadded) length — this
/// deviates from the OSC 1.1 spec but is what the original `chaosc`
/// implementation's `encode_blob` does (`chaosc/osc_lib.py`), and this
/// crate must remain wire-compatible with it.
fn encode_blob_into(b: &[u8], out: &mut Vec<u8>) {
	let padded_len = pad(b.len() as u64) as usize;
	out.extend_from_slice(&(padded_len as u32).to_be_bytes());
	out.extend_from_slice(b);
	out.resize(out.len() + (padded_len - b.len()), 0);
}

fn encode_timetag_into(tag: OscTimeTag, out: &mut Vec<u8>) {
	out.extend_from_slice(&tag.seconds.to_be_bytes());
	out.extend_from_slice(&tag.fraction.to_be_bytes());
}

/// Rounds `pos` up to the next multiple of 4.
///
/// ```
/// use oschub::osc::encoder::pad;
/// assert_eq!(pad(10), 12);
/// ```
pub fn pad(pos: u64) -> u64 {
	match pos % 4 {
		0 => pos,
		d => pos + (4 - d)
	}
}

/// Encodes a time value expressed as seconds since the Unix epoch.
/// `seconds <= 0` encodes as the canonical immediate time tag `(0, 1)`.
pub fn encode_timetag(seconds: f64) -> [u8; 8] {
	let tag = OscTimeTag::from_unix_seconds(seconds);
	let mut out = [0u8; 8];
	out[..4].copy_from_slice(&tag.seconds.to_be_bytes());
	out[4..].copy_from_slice(&tag.fraction.to_be_bytes());
	out
}
