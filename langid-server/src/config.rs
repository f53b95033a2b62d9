use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Server settings, read from the environment.
///
/// | Variable          | Default     |
/// |-------------------|-------------|
/// | `LANGID_HOST`     | `127.0.0.1` |
/// | `LANGID_PORT`     | `5000`      |
/// | `LANGID_DATA_DIR` | `./data`    |
/// | `LANGID_MODEL`    | none        |
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub host: IpAddr,
	pub port: u16,
	pub data_dir: PathBuf,
	/// Model loaded at start-up, if any
	pub model: Option<String>,
}

impl ServerConfig {
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
		let host = lookup("LANGID_HOST")
			.and_then(|value| value.parse::<IpAddr>().ok())
			.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

		let port = lookup("LANGID_PORT")
			.and_then(|value| value.parse::<u16>().ok())
			.unwrap_or(5000);

		let data_dir = lookup("LANGID_DATA_DIR")
			.filter(|value| !value.trim().is_empty())
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from("./data"));

		let model = lookup("LANGID_MODEL")
			.map(|value| value.trim().to_owned())
			.filter(|value| !value.is_empty());

		Self { host, port, data_dir, model }
	}

	pub fn bind_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&str, &str)]) -> ServerConfig {
		let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		ServerConfig::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn defaults() {
		let config = config(&[]);
		assert_eq!(config.bind_addr().to_string(), "127.0.0.1:5000");
		assert_eq!(config.data_dir, PathBuf::from("./data"));
		assert!(config.model.is_none());
	}

	#[test]
	fn reads_values() {
		let config = config(&[
			("LANGID_HOST", "0.0.0.0"),
			("LANGID_PORT", "8080"),
			("LANGID_DATA_DIR", "/srv/models"),
			("LANGID_MODEL", " europe "),
		]);
		assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
		assert_eq!(config.data_dir, PathBuf::from("/srv/models"));
		assert_eq!(config.model.as_deref(), Some("europe"));
	}

	#[test]
	fn invalid_values_fall_back() {
		let config = config(&[("LANGID_PORT", "http"), ("LANGID_HOST", "localhost"), ("LANGID_MODEL", "")]);
		assert_eq!(config.bind_addr().to_string(), "127.0.0.1:5000");
		assert!(config.model.is_none());
	}
}
