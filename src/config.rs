use serde::Deserialize;

/// Process configuration.
///
/// Loaded from an optional YAML file named by the `TALON_CONFIG` environment
/// variable, with the `LISTEN` environment variable overriding the listen
/// address from either source.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds, e.g. "127.0.0.1:8080".
    pub listen_addr: String,
    /// How many unterminated header bytes a request may accumulate before the
    /// application handler is expected to reply 413 and close. This is a
    /// policy constant for the handler; the server core does not enforce it.
    pub max_request_header_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_request_header_bytes: 8192,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let mut cfg = match std::env::var("TALON_CONFIG") {
            Ok(path) => match Self::from_file(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path, error = %e, "Failed to load config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.listen_addr = addr;
        }

        cfg
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}
