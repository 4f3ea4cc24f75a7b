//! Neighbor discovery by TCP probing nearby hosts and ports.
//!
//! Candidates are formed by adding each offset to the last octet of the
//! node's own IPv4 host and pairing it with every port in range. A candidate
//! is a neighbor when a TCP connection to it succeeds within the timeout.

use parking_lot::RwLock;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Enumerates probe targets around `host:my_port`, excluding the node itself.
/// Returns nothing when `host` is not an IPv4 address.
pub fn candidates(
    host: &str,
    my_port: u16,
    ip_offsets: RangeInclusive<u8>,
    ports: RangeInclusive<u16>,
) -> Vec<SocketAddr> {
    let ip: Ipv4Addr = match host.parse() {
        Ok(ip) => ip,
        Err(_) => {
            warn!(host, "neighbor discovery needs an IPv4 host");
            return Vec::new();
        }
    };
    let [a, b, c, d] = ip.octets();
    let own = SocketAddr::V4(SocketAddrV4::new(ip, my_port));

    let mut targets = Vec::new();
    for offset in ip_offsets {
        let Some(last) = d.checked_add(offset) else {
            break;
        };
        let guess = Ipv4Addr::new(a, b, c, last);
        for port in ports.clone() {
            let target = SocketAddr::V4(SocketAddrV4::new(guess, port));
            if target != own {
                targets.push(target);
            }
        }
    }
    targets
}

async fn is_reachable(target: SocketAddr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(_)) => {
            debug!(%target, "neighbor found");
            true
        }
        Ok(Err(e)) => {
            debug!(%target, error = %e, "probe refused");
            false
        }
        Err(_) => {
            debug!(%target, "probe timed out");
            false
        }
    }
}

/// Probes every candidate concurrently and returns the reachable ones in
/// candidate order.
pub async fn find_neighbors(
    host: &str,
    my_port: u16,
    ip_offsets: RangeInclusive<u8>,
    ports: RangeInclusive<u16>,
    timeout: Duration,
) -> Vec<SocketAddr> {
    let targets = candidates(host, my_port, ip_offsets, ports);

    let mut probes = JoinSet::new();
    for (index, target) in targets.iter().copied().enumerate() {
        probes.spawn(async move { (index, target, is_reachable(target, timeout).await) });
    }

    let mut found = Vec::new();
    while let Some(result) = probes.join_next().await {
        match result {
            Ok((index, target, true)) => found.push((index, target)),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "neighbor probe task failed"),
        }
    }
    found.sort_by_key(|(index, _)| *index);
    found.into_iter().map(|(_, target)| target).collect()
}

/// Latest discovery result, shared between the refresh loop and the API.
#[derive(Debug, Default)]
pub struct NeighborSet {
    neighbors: RwLock<Vec<SocketAddr>>,
}

impl NeighborSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, neighbors: Vec<SocketAddr>) {
        let mut current = self.neighbors.write();
        if *current != neighbors {
            info!(count = neighbors.len(), "neighbor set updated");
        }
        *current = neighbors;
    }

    pub fn list(&self) -> Vec<SocketAddr> {
        self.neighbors.read().clone()
    }

    pub fn len(&self) -> usize {
        self.neighbors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.read().is_empty()
    }
}
