use crate::error::{Error, Result};

/// Connection settings for a remote capability service. Loaded once at
/// process start by whoever constructs the client; the facade itself
/// never reads the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the remote service (e.g. "https://data.example.com").
    pub endpoint: String,
    /// Publishable (anon) key sent with every request. Row-level access
    /// policy on the server decides what it can actually see.
    pub publishable_key: String,
}

impl ServiceConfig {
    pub fn new(endpoint: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            publishable_key: publishable_key.into(),
        }
    }

    /// Reads `PORTICO_URL` and `PORTICO_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("PORTICO_URL")
            .map_err(|_| Error::Config("PORTICO_URL is not set".to_string()))?;
        let publishable_key = std::env::var("PORTICO_KEY")
            .map_err(|_| Error::Config("PORTICO_KEY is not set".to_string()))?;
        if endpoint.is_empty() {
            return Err(Error::Config("PORTICO_URL is empty".to_string()));
        }
        Ok(Self {
            endpoint,
            publishable_key,
        })
    }
}
