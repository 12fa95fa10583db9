//! Error types for url-sheriff.

use std::net::IpAddr;
use thiserror::Error;

/// Boxed cause of a failed DNS lookup, kept as-is so callers can downcast.
pub type ResolveError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while checking a URL.
///
/// Every unsafe outcome is one of these. There is no "false" verdict to forget
/// to look at.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be parsed into a scheme and a hostname.
    #[error("Invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL scheme is not in the configured restriction set.
    #[error("URL scheme '{scheme}' is not allowed")]
    SchemeNotAllowed { url: String, scheme: String },

    /// The hostname, or one of the addresses it resolved to, is not global unicast.
    #[error("URL uses a private hostname")]
    PrivateHostname {
        url: String,
        host: String,
        ip: Option<IpAddr>,
        reason: String,
    },

    /// A custom DNS server literal is not an IP address.
    #[error("Invalid DNS resolver address: {address}")]
    InvalidResolverAddress { address: String },

    /// Resolution through custom servers was requested but none are configured.
    #[error("DNS resolver is not defined")]
    ResolverNotConfigured,

    /// The underlying lookup failed.
    #[error("DNS lookup failed for {host}: {source}")]
    ResolutionFailed {
        host: String,
        #[source]
        source: ResolveError,
    },

    /// An allow-list pattern is not a valid regular expression.
    #[error("Invalid allow-list pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration could not be read or parsed.
    #[error("Config error: {reason}")]
    Config { reason: String },

    /// A blocking check could not start the Tokio runtime it needs.
    #[error("Runtime error: {source}")]
    Runtime {
        #[source]
        source: std::io::Error,
    },
}

/// Category of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    SchemeNotAllowed,
    PrivateHostname,
    InvalidResolverAddress,
    ResolverNotConfigured,
    ResolutionFailed,
    InvalidPattern,
    Config,
    Runtime,
}

impl Error {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::SchemeNotAllowed { .. } => ErrorKind::SchemeNotAllowed,
            Self::PrivateHostname { .. } => ErrorKind::PrivateHostname,
            Self::InvalidResolverAddress { .. } => ErrorKind::InvalidResolverAddress,
            Self::ResolverNotConfigured => ErrorKind::ResolverNotConfigured,
            Self::ResolutionFailed { .. } => ErrorKind::ResolutionFailed,
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            Self::Config { .. } => ErrorKind::Config,
            Self::Runtime { .. } => ErrorKind::Runtime,
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn scheme_not_allowed(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::SchemeNotAllowed {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    pub(crate) fn private_hostname(
        url: impl Into<String>,
        host: impl Into<String>,
        ip: Option<IpAddr>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PrivateHostname {
            url: url.into(),
            host: host.into(),
            ip,
            reason: reason.into(),
        }
    }

    pub(crate) fn resolution_failed(host: impl Into<String>, source: ResolveError) -> Self {
        Self::ResolutionFailed {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
