use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Faults raised inside interposition hooks and detector callbacks. They
/// never leave the monitor: the fail-open guard logs and drops them.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("summary is busy")]
    SummaryBusy,
    #[error("malformed asset payload: {0}")]
    AssetPayload(#[from] serde_json::Error),
    #[error("{0}")]
    Hook(String),
}
