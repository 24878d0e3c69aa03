//! HTTP clients bound to specific local source addresses.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use reqwest::Url;

use crate::error::{Error, Result};

/// An HTTP client whose outbound connections originate from one local
/// source address, with the local port auto-assigned.
///
/// The client is safe for concurrent use; connection reuse across requests
/// is left to the transport.
#[derive(Debug, Clone)]
pub struct AddressBoundClient {
    client: reqwest::Client,
    source_addr: Option<IpAddr>,
}

impl AddressBoundClient {
    /// Creates a client bound to `source_addr`, or an unbound client using
    /// the default route when `None`.
    ///
    /// Fails with [`Error::Bind`] when the host does not own the address.
    pub fn new(source_addr: Option<IpAddr>) -> Result<Self> {
        if let Some(addr) = source_addr {
            // reqwest only binds at connect time. Probe the address now so a
            // source address this host does not own fails construction
            // instead of silently degrading to the default route.
            std::net::UdpSocket::bind((addr, 0)).map_err(|source| Error::Bind { addr, source })?;
        }

        let mut builder = reqwest::Client::builder();
        if let Some(addr) = source_addr {
            builder = builder.local_address(addr);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            source_addr,
        })
    }

    /// The source address this client is bound to, if any.
    pub fn source_addr(&self) -> Option<IpAddr> {
        self.source_addr
    }

    /// Performs one GET with the given per-call timeout.
    ///
    /// Returns the response status, body, and elapsed wall-clock time.
    /// Network failures surface as [`Error::Request`] with enough detail
    /// for logging.
    pub async fn get(&self, url: &Url, timeout: Duration) -> Result<Fetched> {
        let started = Instant::now();
        let response = self.client.get(url.clone()).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(Fetched {
            status,
            body,
            elapsed: started.elapsed(),
        })
    }
}

/// The outcome of one successful GET round trip.
#[derive(Debug)]
pub struct Fetched {
    /// HTTP status code.
    pub status: u16,
    /// Full response body.
    pub body: Bytes,
    /// Wall-clock time from send to fully received body.
    pub elapsed: Duration,
}

/// A fixed set of clients, one per configured source address.
///
/// Built once before dispatch begins and shared read-only across all
/// concurrent measurement tasks for the run's duration.
#[derive(Debug)]
pub struct ClientPool {
    clients: Vec<AddressBoundClient>,
}

impl ClientPool {
    /// Builds one client per source address, or a single unbound client when
    /// no addresses are configured.
    pub fn new(source_addrs: &[IpAddr]) -> Result<Self> {
        let clients = if source_addrs.is_empty() {
            vec![AddressBoundClient::new(None)?]
        } else {
            source_addrs
                .iter()
                .map(|&addr| AddressBoundClient::new(Some(addr)))
                .collect::<Result<_>>()?
        };

        Ok(Self { clients })
    }

    /// Number of clients in the pool.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if the pool is empty. Construction never produces an
    /// empty pool.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// The client at `idx`.
    pub fn get(&self, idx: usize) -> &AddressBoundClient {
        &self.clients[idx]
    }

    /// Picks one client uniformly at random.
    pub fn pick(&self, rng: &mut impl Rng) -> &AddressBoundClient {
        &self.clients[rng.random_range(0..self.clients.len())]
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn loopback_address_binds() {
        let client = AddressBoundClient::new(Some(IpAddr::V4(Ipv4Addr::LOCALHOST))).unwrap();
        assert_eq!(client.source_addr(), Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn foreign_address_fails_construction() {
        // TEST-NET-3, never assigned to this host.
        let addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        let err = AddressBoundClient::new(Some(addr)).unwrap_err();
        assert!(matches!(err, Error::Bind { addr: a, .. } if a == addr));
    }

    #[test]
    fn empty_address_list_yields_one_unbound_client() {
        let pool = ClientPool::new(&[]).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(0).source_addr(), None);
    }

    #[test]
    fn pool_has_one_client_per_address() {
        let addrs = [
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
        ];
        let pool = ClientPool::new(&addrs).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.clients.iter().all(|c| c.source_addr().is_some()));
    }
}
