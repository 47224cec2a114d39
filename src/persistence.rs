//! Subscription file persistence: a simple `key=value;key=value` line
//! format, one subscriber per line.
//!
//! Grounded on `chaosc.py`'s `__save_subscriptions`/`__load_subscriptions`.

use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::Local;
use directories::ProjectDirs;
use tracing::warn;

use crate::registry::Registry;

/// Writes every current subscription to `path_override`, or to the default
/// path under the user's config directory if unset. Replaces any existing
/// file contents.
pub fn save(registry: &Registry, path_override: Option<&Path>) -> io::Result<PathBuf> {
	let path = path_override.map(Path::to_path_buf).unwrap_or_else(default_path);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}

	let mut contents = String::new();
	for (_, record) in registry.list() {
		contents.push_str(&format!("host={};port={};label={}\n", record.host, record.port, record.label));
	}
	fs::write(&path, contents)?;
	Ok(path)
}

/// The default save path: `<config_dir>/oschub/targets-<YYYYMMDD>.conf`,
/// using the `directories` crate in place of `chaosc`'s hardcoded
/// `~/.chaosc/`.
pub fn default_path() -> PathBuf {
	let base = ProjectDirs::from("", "", "oschub").map(|dirs| dirs.config_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from("."));
	let date = Local::now().format("%Y%m%d");
	base.join(format!("targets-{date}.conf"))
}

/// Reads a subscription file at startup. A missing file is not an error —
/// it just means no subscriptions are preloaded. Malformed lines are
/// logged and skipped; the caller is responsible for feeding each returned
/// `(host, port, label)` tuple through [`Registry::subscribe`] and logging
/// any duplicate-subscription error encountered there.
pub fn load(path: &Path) -> io::Result<Vec<(String, u16, String)>> {
	let contents = match fs::read_to_string(path) {
		Ok(c) => c,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(err)
	};

	let mut entries = Vec::new();
	for (lineno, line) in contents.lines().enumerate() {
		if line.is_empty() {
			continue;
		}
		match parse_line(line) {
			Some(entry) => entries.push(entry),
			None => warn!(line = lineno + 1, %line, "skipping malformed subscription line")
		}
	}
	Ok(entries)
}

fn parse_line(line: &str) -> Option<(String, u16, String)> {
	let mut host = None;
	let mut port = None;
	let mut label = None;
	for field in line.split(';') {
		let (key, value) = field.split_once('=')?;
		match key {
			"host" => host = Some(value.to_string()),
			"port" => port = Some(value.parse::<u16>().ok()?),
			"label" => label = Some(value.to_string()),
			_ => {}
		}
	}
	Some((host?, port?, label.unwrap_or_default()))
}
