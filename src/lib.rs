//! # url-sheriff
//!
//! SSRF guard for URLs supplied by untrusted callers.
//!
//! `url-sheriff` decides whether a URL is safe to dereference before you dial
//! out. It does not make the request. A URL passes when its scheme is allowed
//! and its hostname is either allow-listed, a global unicast IP literal, or
//! resolves only to global unicast addresses. Anything else is an [`Error`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url_sheriff::{AllowEntry, SheriffConfig, UrlSheriff};
//!
//! # async fn example() -> Result<(), url_sheriff::Error> {
//! let config = SheriffConfig::new()
//!     .allowed_schemes(["https"])
//!     .allow("internal.example.com")
//!     .allow_pattern(r"^dev-\d+\.test\.com$")?;
//!
//! let mut sheriff = UrlSheriff::new(config)?;
//! sheriff.add_to_allow_list([AllowEntry::literal("localhost")]);
//!
//! sheriff.check_url("https://example.com/api").await?;
//! # Ok(())
//! # }
//! ```
//!
//! The check is a point-in-time answer. A hostname can resolve differently
//! when you connect; pin the connection to [`Checked::addresses`] if that
//! matters to you.

mod allowlist;
mod classify;
mod config;
mod error;
mod resolver;
mod scheme;
mod sheriff;
mod target;

pub use allowlist::{AllowEntry, AllowList};
pub use classify::{
    classify, is_private_ip, is_private_ip_address, is_valid_ip, non_unicast_reason, normalize_ip,
    parse_ip, AddressScope,
};
pub use config::SheriffConfig;
pub use error::{Error, ErrorKind, ResolveError};
pub use resolver::{Resolve, ServerResolver, SystemResolver};
pub use scheme::SchemeRestriction;
pub use sheriff::{Checked, CheckedBy, UrlSheriff};
pub use target::{IntoTarget, ParsedTarget};

/// Re-exported so callers can pass pre-parsed URLs without a direct dependency.
pub use url::Url;
