//! Fixed-count UDP packet blaster.
//!
//! A straight-line send loop with an optional inter-packet delay; no
//! scheduling or adaptive logic. Source-address binding works the same way
//! as for the HTTP clients.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};

use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::net::UdpSocket;

use crate::config::UdpConfig;
use crate::error::Error;

/// What a blast run accomplished.
#[derive(Debug)]
pub struct BlastReport {
    /// Packets successfully handed to the socket.
    pub packets_sent: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Wall-clock duration of the send loop.
    pub elapsed: Duration,
}

impl BlastReport {
    /// Average throughput over the send loop in KB/s.
    pub fn throughput_kbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_sent as f64 / 1024.0 / secs
        } else {
            0.0
        }
    }
}

/// Sends `packet_count` packets of random alphanumeric payload to the
/// configured target.
///
/// Individual send failures are logged and skipped; binding a source
/// address the host does not own fails the whole blast with
/// [`Error::Bind`].
pub async fn blast(config: &UdpConfig) -> anyhow::Result<BlastReport> {
    let bind_addr = match config.source_addr {
        Some(addr) => SocketAddr::new(addr, 0),
        None => match config.target {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        },
    };

    let socket = UdpSocket::bind(bind_addr).await.map_err(|source| Error::Bind {
        addr: bind_addr.ip(),
        source,
    })?;
    socket.connect(config.target).await?;

    let mut rng = rand::rng();
    let payload: Vec<u8> = (0..config.packet_size).map(|_| rng.sample(Alphanumeric)).collect();

    tracing::info!(
        target = %config.target,
        packet_size = config.packet_size,
        packet_count = config.packet_count,
        "starting UDP blast"
    );

    let started = Instant::now();
    let mut packets_sent = 0u64;
    for _ in 0..config.packet_count {
        match socket.send(&payload).await {
            Ok(_) => packets_sent += 1,
            Err(err) => tracing::warn!(%err, "failed to send UDP packet"),
        }
        if !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
    }

    Ok(BlastReport {
        packets_sent,
        bytes_sent: packets_sent * config.packet_size as u64,
        elapsed: started.elapsed(),
    })
}
