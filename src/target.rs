//! Turning caller input into a checkable `{scheme, hostname}` pair.

use url::Url;

use crate::Error;

/// The identity of a URL that the checks run against.
///
/// `host` is the URL's host component exactly as the URL parser produced it,
/// never a resolved address. IPv6 literals keep their brackets (`[::1]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    url: String,
    scheme: String,
    host: String,
}

impl ParsedTarget {
    /// Parse a URL string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the string is not an absolute URL with a host.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::invalid_url(input, e.to_string()))?;
        Self::from_url(&url)
    }

    /// Take scheme and host from an already-parsed URL without re-parsing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL has no host (`mailto:`, `data:`, ...).
    pub fn from_url(url: &Url) -> Result<Self, Error> {
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(Error::invalid_url(url.as_str(), "URL must have a host")),
        };

        Ok(Self {
            url: url.as_str().to_string(),
            scheme: url.scheme().to_string(),
            host: host.to_string(),
        })
    }

    /// The scheme, without the trailing `:`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The hostname as written in the URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The host with IPv6 brackets removed, for IP-literal detection.
    pub fn unbracketed_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// The serialized URL, used in error reports.
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

/// Anything that can be checked: a URL string or an already-parsed [`Url`].
pub trait IntoTarget {
    /// Normalize into a [`ParsedTarget`].
    fn into_target(self) -> Result<ParsedTarget, Error>;
}

impl IntoTarget for &str {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        ParsedTarget::parse(self)
    }
}

impl IntoTarget for &String {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        ParsedTarget::parse(self)
    }
}

impl IntoTarget for String {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        ParsedTarget::parse(&self)
    }
}

impl IntoTarget for &Url {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        ParsedTarget::from_url(self)
    }
}

impl IntoTarget for Url {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        ParsedTarget::from_url(&self)
    }
}

impl IntoTarget for ParsedTarget {
    fn into_target(self) -> Result<ParsedTarget, Error> {
        Ok(self)
    }
}
