//! Engine configuration.
//!
//! [`SheriffConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! allowed_schemes = ["https"]
//! resolver_servers = ["1.1.1.1", "8.8.8.8"]
//! allow_list = [
//!     "localhost",
//!     { pattern = '^.*\.internal\.example\.com$' },
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allowlist::AllowEntry;
use crate::Error;

/// Construction-time settings for a [`UrlSheriff`](crate::UrlSheriff).
///
/// The default allows every scheme, has an empty allow-list and uses the
/// system resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheriffConfig {
    /// Hostnames and patterns that skip the IP and DNS checks.
    pub allow_list: Vec<AllowEntry>,
    /// Permitted schemes. Empty means every scheme is permitted.
    pub allowed_schemes: Vec<String>,
    /// DNS servers to query instead of the system resolver.
    pub resolver_servers: Option<Vec<String>>,
}

impl SheriffConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Add a literal hostname to the allow-list.
    pub fn allow(mut self, host: impl Into<String>) -> Self {
        self.allow_list.push(AllowEntry::Literal(host.into()));
        self
    }

    /// Add a hostname pattern to the allow-list.
    pub fn allow_pattern(mut self, pattern: &str) -> Result<Self, Error> {
        self.allow_list.push(AllowEntry::pattern(pattern)?);
        Ok(self)
    }

    pub fn allowed_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    pub fn resolver_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolver_servers = Some(servers.into_iter().map(Into::into).collect());
        self
    }
}
