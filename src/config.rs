//! Runtime configuration read from environment variables.

use std::env;
use std::net::SocketAddr;
use url::Url;

use crate::errors::{NotesError, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub ollama_base_url: Url,
    pub model: String,
    /// Where edited notes are PUT. Sync is disabled when unset.
    pub sync_url: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None).expect("built-in defaults are valid")
    }
}

impl Config {
    /// Reads `NOTES_BIND`, `OLLAMA_BASE_URL`, `OLLAMA_MODEL` and `NOTES_SYNC_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_str = var("NOTES_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_str
            .parse::<SocketAddr>()
            .map_err(|e| NotesError::Config(format!("NOTES_BIND {:?}: {}", bind_str, e)))?;

        let base_str = var("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let ollama_base_url = parse_http_url("OLLAMA_BASE_URL", &base_str)?;

        let model = var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let sync_url = match var("NOTES_SYNC_URL") {
            Some(s) => Some(parse_http_url("NOTES_SYNC_URL", &s)?),
            None => None,
        };

        Ok(Self {
            bind,
            ollama_base_url,
            model,
            sync_url,
        })
    }
}

fn parse_http_url(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value.trim())
        .map_err(|e| NotesError::Config(format!("{} {:?}: {}", name, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(NotesError::Config(format!(
            "{} must be http or https, got {}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.ollama_base_url.as_str(), "http://localhost:11434/");
        assert_eq!(config.model, "llama3.2");
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("NOTES_BIND", "0.0.0.0:8080"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("OLLAMA_MODEL", "mistral"),
            ("NOTES_SYNC_URL", "https://notes.example.com/api/notes"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.ollama_base_url.host_str(), Some("gpu-box"));
        assert_eq!(config.model, "mistral");
        assert_eq!(
            config.sync_url.unwrap().as_str(),
            "https://notes.example.com/api/notes"
        );
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("OLLAMA_MODEL", "  ")])).unwrap();
        assert_eq!(config.model, "llama3.2");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("NOTES_BIND", "nope")])),
            Err(NotesError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("OLLAMA_BASE_URL", "ftp://host")])),
            Err(NotesError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("NOTES_SYNC_URL", "not a url")])),
            Err(NotesError::Config(_))
        ));
    }
}
