//! The SSRF decision engine.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, trace, warn};

use crate::allowlist::{AllowEntry, AllowList};
use crate::classify::{self, non_unicast_reason, parse_ip};
use crate::config::SheriffConfig;
use crate::error::Error;
use crate::resolver::{Resolve, ServerResolver, SystemResolver};
use crate::scheme::SchemeRestriction;
use crate::target::{IntoTarget, ParsedTarget};

/// Which step declared a URL safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckedBy {
    /// The hostname matched the allow-list. Nothing was classified or resolved.
    AllowList,
    /// The hostname is a global unicast IP literal.
    IpLiteral,
    /// Every address the hostname resolved to is global unicast.
    Resolved,
}

/// A URL that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked {
    /// Lowercase scheme.
    pub scheme: String,

    /// Hostname as written in the URL.
    pub host: String,

    /// Addresses that were classified. Empty for allow-listed hosts.
    pub addresses: Vec<IpAddr>,

    pub checked_by: CheckedBy,
}

/// Decides whether URLs are safe to dereference.
///
/// Checks run in a fixed order: scheme, allow-list, then either the IP literal
/// or every resolved address. The first failing step ends the check.
///
/// Configuration changes take `&mut self`, so they cannot race an in-flight
/// [`check_url`](Self::check_url) on the same instance. Callers sharing one
/// engine across tasks serialize changes themselves (e.g. behind a `RwLock`).
///
/// # Example
///
/// ```rust,no_run
/// use url_sheriff::{SheriffConfig, UrlSheriff};
///
/// # async fn example() -> Result<(), url_sheriff::Error> {
/// let sheriff = UrlSheriff::new(SheriffConfig::new().allowed_schemes(["https"]))?;
/// let checked = sheriff.check_url("https://example.com/api").await?;
/// println!("{} resolved to {:?}", checked.host, checked.addresses);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UrlSheriff {
    allow_list: AllowList,
    schemes: SchemeRestriction,
    resolver: Arc<dyn Resolve>,
    servers: Option<ServerResolver>,
}

impl Default for UrlSheriff {
    fn default() -> Self {
        Self {
            allow_list: AllowList::default(),
            schemes: SchemeRestriction::All,
            resolver: Arc::new(SystemResolver),
            servers: None,
        }
    }
}

impl UrlSheriff {
    /// Build an engine from `config`.
    ///
    /// With `resolver_servers` set, hostnames are resolved through those servers
    /// (A records only). Otherwise the system resolver is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResolverAddress`] if a resolver server is not an
    /// IP literal.
    pub fn new(config: SheriffConfig) -> Result<Self, Error> {
        let servers = config
            .resolver_servers
            .as_ref()
            .map(ServerResolver::new)
            .transpose()?;

        let resolver: Arc<dyn Resolve> = match &servers {
            Some(servers) => Arc::new(servers.clone()),
            None => Arc::new(SystemResolver),
        };

        Ok(Self::assemble(config, resolver, servers))
    }

    /// Build an engine that resolves hostnames through `resolver`.
    ///
    /// `resolver_servers` in `config` is still validated and still backs
    /// [`resolve_hostname_via_servers`](Self::resolve_hostname_via_servers),
    /// but [`check_url`](Self::check_url) uses `resolver`.
    pub fn with_resolver(config: SheriffConfig, resolver: Arc<dyn Resolve>) -> Result<Self, Error> {
        let servers = config
            .resolver_servers
            .as_ref()
            .map(ServerResolver::new)
            .transpose()?;

        Ok(Self::assemble(config, resolver, servers))
    }

    fn assemble(
        config: SheriffConfig,
        resolver: Arc<dyn Resolve>,
        servers: Option<ServerResolver>,
    ) -> Self {
        Self {
            allow_list: AllowList::new(config.allow_list),
            schemes: SchemeRestriction::from_schemes(&config.allowed_schemes),
            resolver,
            servers,
        }
    }

    /// Check a URL.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the input has no parseable scheme and host
    /// - [`Error::SchemeNotAllowed`] if the scheme is restricted
    /// - [`Error::PrivateHostname`] if the host is, or resolves to, a non-unicast address
    /// - [`Error::ResolutionFailed`] if the lookup fails or returns nothing
    pub async fn check_url(&self, input: impl IntoTarget) -> Result<Checked, Error> {
        let target = input.into_target()?;
        let url = target.as_str();
        let scheme = target.scheme();
        let host = target.host();

        if !self.schemes.is_allowed(scheme) {
            debug!(scheme, host, "scheme rejected");
            return Err(Error::scheme_not_allowed(url, scheme));
        }

        if let Some(entry) = self.allow_list.find_match(host) {
            debug!(host, entry = %entry, "host is allow-listed");
            return Ok(Checked {
                scheme: scheme.to_string(),
                host: host.to_string(),
                addresses: Vec::new(),
                checked_by: CheckedBy::AllowList,
            });
        }

        if let Some(ip) = parse_ip(target.unbracketed_host()) {
            if let Some(reason) = non_unicast_reason(ip) {
                debug!(host, %ip, reason, "IP literal rejected");
                return Err(Error::private_hostname(url, host, Some(ip), reason));
            }
            return Ok(Checked {
                scheme: scheme.to_string(),
                host: host.to_string(),
                addresses: vec![ip],
                checked_by: CheckedBy::IpLiteral,
            });
        }

        let addresses = self
            .resolver
            .resolve(host)
            .await
            .map_err(|e| Error::resolution_failed(host, e))?;
        trace!(host, ?addresses, "resolved");

        if addresses.is_empty() {
            return Err(Error::resolution_failed(host, "no IP addresses found".into()));
        }

        for &ip in &addresses {
            if let Some(reason) = non_unicast_reason(ip) {
                warn!(host, %ip, reason, candidates = addresses.len(), "hostname resolves to a private address");
                return Err(Error::private_hostname(url, host, Some(ip), reason));
            }
        }

        debug!(host, "all resolved addresses are global unicast");
        Ok(Checked {
            scheme: scheme.to_string(),
            host: host.to_string(),
            addresses,
            checked_by: CheckedBy::Resolved,
        })
    }

    /// Blocking version of [`check_url`](Self::check_url).
    ///
    /// Works inside and outside a Tokio runtime. On a multi-threaded runtime the
    /// current worker blocks in place. A current-thread runtime cannot block on
    /// itself, so the check runs on a scoped thread with its own runtime.
    /// Outside any runtime a temporary one is created.
    ///
    /// # Errors
    ///
    /// Same as [`check_url`](Self::check_url), plus [`Error::Runtime`] if a
    /// runtime cannot be built.
    pub fn check_url_sync(&self, input: impl IntoTarget) -> Result<Checked, Error> {
        let target = input.into_target()?;

        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.check_url(target)))
            }
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.check_on_new_runtime(target))
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
            Err(_) => self.check_on_new_runtime(target),
        }
    }

    fn check_on_new_runtime(&self, target: ParsedTarget) -> Result<Checked, Error> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| Error::Runtime { source })?;
        rt.block_on(self.check_url(target))
    }

    /// Is `ip` an IP literal outside global unicast?
    pub fn is_private_ip_address(&self, ip: &str) -> bool {
        classify::is_private_ip_address(ip)
    }

    /// Resolve `host` through the configured DNS servers, A records only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolverNotConfigured`] if the engine was built without
    /// `resolver_servers`, or [`Error::ResolutionFailed`] if the lookup fails.
    pub async fn resolve_hostname_via_servers(&self, host: &str) -> Result<Vec<IpAddr>, Error> {
        let servers = self.servers.as_ref().ok_or(Error::ResolverNotConfigured)?;
        let ips = servers
            .resolve_ipv4(host)
            .await
            .map_err(|e| Error::resolution_failed(host, e))?;
        Ok(ips.into_iter().map(IpAddr::V4).collect())
    }

    /// Append entries to the allow-list.
    pub fn add_to_allow_list(&mut self, entries: impl IntoIterator<Item = AllowEntry>) {
        self.allow_list.extend(entries);
    }

    /// Remove entries equal by value. Patterns compare by source text.
    pub fn remove_from_allow_list(&mut self, entries: impl IntoIterator<Item = AllowEntry>) {
        self.allow_list.remove(entries);
    }

    /// A copy of the current allow-list.
    pub fn allow_list(&self) -> Vec<AllowEntry> {
        self.allow_list.to_vec()
    }

    /// Replace the scheme restriction. An empty list lifts it.
    ///
    /// Returns the normalized list, or `None` when unrestricted.
    pub fn set_allowed_schemes<I, S>(&mut self, schemes: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemes = SchemeRestriction::from_schemes(schemes);
        self.schemes.schemes()
    }

    pub fn clear_scheme_restrictions(&mut self) {
        self.schemes = SchemeRestriction::All;
    }

    /// The normalized scheme list, or `None` when every scheme is allowed.
    pub fn allowed_schemes(&self) -> Option<Vec<String>> {
        self.schemes.schemes()
    }

    /// DNS servers configured at construction, if any.
    pub fn resolver_servers(&self) -> Option<&[SocketAddr]> {
        self.servers.as_ref().map(ServerResolver::servers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every lookup with a fixed set of addresses and counts calls.
    #[derive(Debug, Default)]
    struct StubResolver {
        answer: Vec<IpAddr>,
        calls: AtomicUsize,
    }

    impl StubResolver {
        fn new(answer: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.iter().map(|s| s.parse().unwrap()).collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Resolve for StubResolver {
        async fn resolve(&self, _host: &str) -> Result<Vec<IpAddr>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }
    }

    #[derive(Debug)]
    struct FailingResolver;

    #[async_trait]
    impl Resolve for FailingResolver {
        async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
            Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("NXDOMAIN {host}"),
            )))
        }
    }

    fn sheriff(config: SheriffConfig, stub: &Arc<StubResolver>) -> UrlSheriff {
        UrlSheriff::with_resolver(config, stub.clone()).unwrap()
    }

    // ==================== Ordering ====================

    #[tokio::test]
    async fn test_scheme_checked_before_everything() {
        let stub = StubResolver::new(&["127.0.0.1"]);
        let s = sheriff(
            SheriffConfig::new().allowed_schemes(["https"]).allow("example.com"),
            &stub,
        );

        let err = s.check_url("http://example.com").await.unwrap_err();
        assert!(matches!(err, Error::SchemeNotAllowed { ref scheme, .. } if scheme == "http"));

        let err = s.check_url("http://127.0.0.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemeNotAllowed);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_allow_list_skips_classification_and_dns() {
        let stub = StubResolver::new(&["127.0.0.1"]);
        let s = sheriff(SheriffConfig::new().allow("evil.com").allow("127.0.0.1"), &stub);

        let checked = s.check_url("https://evil.com").await.unwrap();
        assert_eq!(checked.checked_by, CheckedBy::AllowList);
        assert!(checked.addresses.is_empty());

        // A private literal would fail classification, so this proves it never ran
        let checked = s.check_url("http://127.0.0.1:3000").await.unwrap();
        assert_eq!(checked.checked_by, CheckedBy::AllowList);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_allow_list_matches_hostname_not_resolved_ip() {
        let stub = StubResolver::new(&["127.0.0.1"]);
        let s = sheriff(SheriffConfig::new().allow("evil.com").allow("127.0.0.1"), &stub);

        let err = s.check_url("https://other.com").await.unwrap_err();
        assert!(matches!(
            err,
            Error::PrivateHostname { ref host, ip: Some(ip), .. }
                if host == "other.com" && ip.is_loopback()
        ));
        assert_eq!(stub.calls(), 1);
    }

    // ==================== IP literals ====================

    #[tokio::test]
    async fn test_ip_literal_never_resolves() {
        let stub = StubResolver::new(&["8.8.8.8"]);
        let s = sheriff(SheriffConfig::new(), &stub);

        let err = s.check_url("http://127.0.0.1:3000").await.unwrap_err();
        assert_eq!(err.to_string(), "URL uses a private hostname");

        let checked = s.check_url("https://172.32.1.2").await.unwrap();
        assert_eq!(checked.checked_by, CheckedBy::IpLiteral);
        assert_eq!(checked.addresses, vec!["172.32.1.2".parse::<IpAddr>().unwrap()]);

        assert!(s.check_url("http://[::1]/").await.is_err());
        assert!(s.check_url("http://[::ffff:10.0.0.1]/").await.is_err());
        assert!(s.check_url("https://[::ffff:192.0.2.128]:3000").await.is_err());
        assert!(s.check_url("http://0177.0.0.1/").await.is_err());
        assert_eq!(stub.calls(), 0);
    }

    // ==================== Resolution ====================

    #[tokio::test]
    async fn test_any_private_candidate_blocks() {
        let stub = StubResolver::new(&["93.184.216.34", "8.8.8.8", "10.0.0.5", "1.1.1.1"]);
        let s = sheriff(SheriffConfig::new(), &stub);

        let err = s.check_url("https://rebind.example").await.unwrap_err();
        assert!(matches!(
            err,
            Error::PrivateHostname { ip: Some(ip), .. } if ip == "10.0.0.5".parse::<IpAddr>().unwrap()
        ));
    }

    #[tokio::test]
    async fn test_mapped_candidate_blocks() {
        let stub = StubResolver::new(&["2606:4700::1", "::ffff:127.0.0.1"]);
        let s = sheriff(SheriffConfig::new(), &stub);
        assert!(s.check_url("https://mapped.example").await.is_err());
    }

    #[tokio::test]
    async fn test_all_public_candidates_pass() {
        let stub = StubResolver::new(&["93.184.216.34", "2606:2800:220:1::1"]);
        let s = sheriff(SheriffConfig::new(), &stub);

        let checked = s.check_url("https://example.com").await.unwrap();
        assert_eq!(checked.checked_by, CheckedBy::Resolved);
        assert_eq!(checked.addresses.len(), 2);
        assert_eq!(checked.host, "example.com");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_is_failure() {
        let stub = StubResolver::new(&[]);
        let s = sheriff(SheriffConfig::new(), &stub);
        let err = s.check_url("https://empty.example").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionFailed);
    }

    #[tokio::test]
    async fn test_resolution_failure_propagates() {
        let s = UrlSheriff::with_resolver(SheriffConfig::new(), Arc::new(FailingResolver)).unwrap();
        let err = s.check_url("https://nxdomain.example").await.unwrap_err();

        let Error::ResolutionFailed { host, source } = err else {
            panic!("expected ResolutionFailed");
        };
        assert_eq!(host, "nxdomain.example");
        assert!(source.to_string().contains("NXDOMAIN"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let s = UrlSheriff::default();
        let err = s.check_url("not a url").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }

    #[tokio::test]
    async fn test_localhost_via_system_resolver() {
        let s = UrlSheriff::default();
        let err = s.check_url("http://localhost:3000").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrivateHostname);
    }

    // ==================== Configuration ====================

    #[test]
    fn test_invalid_resolver_address_fails_construction() {
        let err = UrlSheriff::new(SheriffConfig::new().resolver_servers(["999.999.999.999"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResolverAddress);

        let err = UrlSheriff::new(SheriffConfig::new().resolver_servers(["not-an-ip-address"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResolverAddress);
    }

    #[test]
    fn test_resolver_servers_kept() {
        let s = UrlSheriff::new(SheriffConfig::new().resolver_servers(["1.1.1.1", "8.8.8.8"])).unwrap();
        assert_eq!(s.resolver_servers().map(<[SocketAddr]>::len), Some(2));
        assert!(UrlSheriff::default().resolver_servers().is_none());
    }

    #[tokio::test]
    async fn test_resolve_via_servers_requires_servers() {
        let err = UrlSheriff::default()
            .resolve_hostname_via_servers("example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolverNotConfigured);
        assert_eq!(err.to_string(), "DNS resolver is not defined");
    }

    #[tokio::test]
    async fn test_scheme_mutation() {
        let stub = StubResolver::new(&["8.8.8.8"]);
        let mut s = sheriff(SheriffConfig::new(), &stub);
        assert_eq!(s.allowed_schemes(), None);
        assert!(s.check_url("ftp://example.com").await.is_ok());

        let set = s.set_allowed_schemes(["HTTPS"]);
        assert_eq!(set, Some(vec!["https".to_string()]));
        assert!(s.check_url("http://example.com").await.is_err());
        assert!(s.check_url("https://example.com").await.is_ok());

        assert_eq!(s.set_allowed_schemes(Vec::<String>::new()), None);
        assert!(s.check_url("gopher://example.com").await.is_ok());

        s.set_allowed_schemes(["https"]);
        s.clear_scheme_restrictions();
        assert_eq!(s.allowed_schemes(), None);
        assert!(s.check_url("http://example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_allow_list_mutation() {
        let stub = StubResolver::new(&["127.0.0.1"]);
        let mut s = sheriff(SheriffConfig::new().allow("keep.example"), &stub);
        let before = s.allow_list();

        let added = vec![
            AllowEntry::literal("dynamic-allow.example.com"),
            AllowEntry::pattern(r"^dynamic-\d+\.example\.com$").unwrap(),
        ];
        s.add_to_allow_list(added.clone());
        assert!(s.check_url("https://dynamic-allow.example.com/api").await.is_ok());
        assert!(s.check_url("https://dynamic-123.example.com/api").await.is_ok());

        s.remove_from_allow_list(added);
        assert_eq!(s.allow_list(), before);
        assert!(s.check_url("https://dynamic-123.example.com/api").await.is_err());
    }

    #[test]
    fn test_is_private_ip_address_method() {
        let s = UrlSheriff::default();
        assert!(s.is_private_ip_address("10.0.0.1"));
        assert!(s.is_private_ip_address("::ffff:10.0.0.1"));
        assert!(!s.is_private_ip_address("8.8.8.8"));
    }

    #[test]
    fn test_check_url_sync_outside_runtime() {
        let stub = StubResolver::new(&["8.8.8.8"]);
        let s = sheriff(SheriffConfig::new(), &stub);
        assert!(s.check_url_sync("https://example.com").is_ok());
        assert!(s.check_url_sync("http://127.0.0.1").is_err());
    }

    #[tokio::test]
    async fn test_check_url_sync_inside_current_thread_runtime() {
        let stub = StubResolver::new(&["8.8.8.8"]);
        let s = sheriff(SheriffConfig::new(), &stub);

        let err = s.check_url_sync("http://127.0.0.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrivateHostname);

        let checked = s.check_url_sync("https://example.com").unwrap();
        assert_eq!(checked.checked_by, CheckedBy::Resolved);
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_check_url_sync_inside_multi_thread_runtime() {
        let stub = StubResolver::new(&["8.8.8.8"]);
        let s = sheriff(SheriffConfig::new(), &stub);

        assert!(s.check_url_sync("https://example.com").is_ok());
        let err = s.check_url_sync("http://[::1]/").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrivateHostname);
    }

    #[test]
    fn test_check_url_sync_invalid_url_needs_no_runtime() {
        let err = UrlSheriff::default().check_url_sync("not a url").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }
}
