use std::env;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::uri::{Authority, Scheme, Uri};

#[derive(Clone, Debug)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	pub contracts_file: PathBuf,
	pub public_dir: PathBuf,
	pub llm_api_url: String,
	pub llm_timeout_secs: u64,
}

impl ServerConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		Ok(Self {
			host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
			port: parse_port(lookup("PORT"), 3020)?,
			contracts_file: lookup("CONTRACTS_FILE")
				.unwrap_or_else(|| "data/contracts.json".to_string())
				.into(),
			public_dir: lookup("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()).into(),
			llm_api_url: lookup("LLM_API_URL")
				.unwrap_or_else(|| "http://127.0.0.1:4050".to_string()),
			llm_timeout_secs: lookup("LLM_TIMEOUT")
				.and_then(|v| v.parse().ok())
				.unwrap_or(120),
		})
	}

	pub fn server_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub fn llm_timeout(&self) -> Duration {
		Duration::from_secs(self.llm_timeout_secs)
	}
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
	pub host: String,
	pub port: u16,
	pub ui_target: Upstream,
	pub api_target: Upstream,
}

impl GatewayConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let ui = lookup("UI_TARGET").unwrap_or_else(|| "http://127.0.0.1:3020".to_string());
		let api = lookup("API_TARGET").unwrap_or_else(|| "http://127.0.0.1:4050".to_string());

		Ok(Self {
			host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
			port: parse_port(lookup("PORT"), 8080)?,
			ui_target: Upstream::parse("UI_TARGET", &ui)?,
			api_target: Upstream::parse("API_TARGET", &api)?,
		})
	}

	pub fn server_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

/// A parsed upstream base URL the gateway forwards to.
#[derive(Clone, Debug)]
pub struct Upstream {
	raw: String,
	scheme: Scheme,
	authority: Authority,
	base_path: String,
}

impl Upstream {
	pub fn parse(name: &'static str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidTarget {
			name,
			value: value.to_string(),
		};

		let uri: Uri = value.trim().parse().map_err(|_| invalid())?;
		let scheme = uri.scheme().cloned().ok_or_else(invalid)?;
		if scheme != Scheme::HTTP {
			return Err(ConfigError::UnsupportedScheme {
				name,
				scheme: scheme.to_string(),
			});
		}
		let authority = uri.authority().cloned().ok_or_else(invalid)?;

		Ok(Self {
			raw: value.to_string(),
			scheme,
			authority,
			base_path: uri.path().trim_end_matches('/').to_string(),
		})
	}

	/// The URL exactly as it was configured.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	pub fn authority(&self) -> &Authority {
		&self.authority
	}

	/// Builds the upstream URI for an incoming request URI, keeping path and query.
	pub fn uri_for(&self, incoming: &Uri) -> Result<Uri, axum::http::Error> {
		let path_and_query = incoming
			.path_and_query()
			.map(|pq| pq.as_str())
			.unwrap_or("/");

		Uri::builder()
			.scheme(self.scheme.clone())
			.authority(self.authority.clone())
			.path_and_query(format!("{}{}", self.base_path, path_and_query))
			.build()
	}
}

fn parse_port(value: Option<String>, default: u16) -> Result<u16, ConfigError> {
	match value {
		Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidPort(v)),
		None => Ok(default),
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid port number: {0}")]
	InvalidPort(String),
	#[error("Invalid {name} URL: {value}")]
	InvalidTarget { name: &'static str, value: String },
	#[error("{name} must use http://, got {scheme}://")]
	UnsupportedScheme { name: &'static str, scheme: String },
}
