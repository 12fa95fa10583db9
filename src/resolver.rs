//! Hostname resolution strategies.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::Resolver;

use crate::error::{Error, ResolveError};

/// Turns a hostname into the addresses it currently points at.
///
/// Implementations must not filter or cache: the caller classifies every
/// address returned, and one private address fails the whole check.
#[async_trait]
pub trait Resolve: Send + Sync + fmt::Debug {
    /// Resolve `host` to its candidate addresses.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// The operating system resolver (`getaddrinfo`), including `/etc/hosts`.
///
/// Returns every A and AAAA result, de-duplicated in the order received.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}

/// Queries specific DNS servers for A records only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResolver {
    servers: Vec<SocketAddr>,
}

impl ServerResolver {
    /// Port used for servers given without one.
    pub const PORT: u16 = 53;

    /// Validate server literals up front.
    ///
    /// Each entry is an IP literal (`1.1.1.1`, `2606:4700:4700::1111`) or an
    /// address with a port (`127.0.0.1:5353`, `[::1]:5353`). Surrounding
    /// whitespace is not accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResolverAddress`] for the first entry that is
    /// neither.
    pub fn new<I, S>(servers: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let servers = servers
            .into_iter()
            .map(|s| parse_server(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { servers })
    }

    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    /// Look up A records for `host` through the configured servers.
    pub async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, ResolveError> {
        let name_servers: Vec<NameServerConfig> = self
            .servers
            .iter()
            .flat_map(|&addr| {
                [
                    NameServerConfig::new(addr, Protocol::Udp),
                    NameServerConfig::new(addr, Protocol::Tcp),
                ]
            })
            .collect();
        let group = NameServerConfigGroup::from(name_servers);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let resolver =
            Resolver::builder_with_config(config, TokioConnectionProvider::default()).build();

        let lookup = resolver.ipv4_lookup(host).await?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }
}

fn parse_server(text: &str) -> Result<SocketAddr, Error> {
    text.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, ServerResolver::PORT))
        .or_else(|_| text.parse::<SocketAddr>())
        .map_err(|_| Error::InvalidResolverAddress {
            address: text.to_string(),
        })
}

#[async_trait]
impl Resolve for ServerResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let ips = self.resolve_ipv4(host).await?;
        Ok(ips.into_iter().map(IpAddr::V4).collect())
    }
}
