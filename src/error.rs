//! Error types shared across the crate.

use std::path::PathBuf;

use crate::location::ProviderKind;

/// Why a location subscription could not be established.
///
/// Never returned from coordinator operations; it reaches the observer
/// through `on_provider_unavailable` and the log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// None of the preferred providers is currently enabled on the platform.
    #[error("No enabled location provider among {preferred:?}")]
    NoProviderEnabled { preferred: Vec<ProviderKind> },

    /// The platform refused the subscription request.
    #[error("Provider '{provider}' rejected the subscription: {reason}")]
    Rejected { provider: ProviderKind, reason: String },
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_messages() {
        let err = ProviderError::NoProviderEnabled {
            preferred: vec![ProviderKind::Network, ProviderKind::Gps],
        };
        assert_eq!(
            err.to_string(),
            "No enabled location provider among [Network, Gps]"
        );

        let err = ProviderError::Rejected {
            provider: ProviderKind::Gps,
            reason: "hardware busy".into(),
        };
        assert_eq!(
            err.to_string(),
            "Provider 'gps' rejected the subscription: hardware busy"
        );
    }

    #[test]
    fn test_config_error_keeps_source() {
        use std::error::Error;

        let err = ConfigError::Read {
            path: PathBuf::from("/nope/config.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/nope/config.json"));
        assert!(err.source().is_some());
    }
}
