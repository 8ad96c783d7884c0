use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpStream, UdpSocket};
use tokio::time;
use tracing::trace;

use crate::types::{PortOutcome, Protocol};

/// One connectivity check against `target:port`.
///
/// Implementations must return within roughly `timeout` and must never fail:
/// every transport problem is reported as a closed port.
pub trait PortProbe: Send + Sync + 'static {
    fn probe(
        &self,
        target: IpAddr,
        port: u16,
        protocol: Protocol,
        timeout: Duration,
    ) -> impl Future<Output = PortOutcome> + Send;
}

/// Real network prober: TCP connect or UDP send/receive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetProber;

impl PortProbe for NetProber {
    async fn probe(
        &self,
        target: IpAddr,
        port: u16,
        protocol: Protocol,
        timeout: Duration,
    ) -> PortOutcome {
        let open = match protocol {
            Protocol::Tcp => probe_tcp(target, port, timeout).await,
            Protocol::Udp => probe_udp(target, port, timeout).await,
        };
        if open {
            PortOutcome::open(port, protocol)
        } else {
            PortOutcome::closed(port, protocol)
        }
    }
}

/// TCP connect check. Refused, unreachable and timed-out attempts all count as closed.
pub async fn probe_tcp(target: IpAddr, port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::new(target, port);
    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "tcp connect failed");
            false
        }
        Err(_) => {
            trace!(%addr, "tcp connect timed out");
            false
        }
    }
}

/// UDP check: one `0x00` datagram, then wait for any reply.
///
/// Silence within the deadline is reported as closed, as is an ICMP
/// port-unreachable surfaced through the connected socket.
pub async fn probe_udp(target: IpAddr, port: u16, timeout: Duration) -> bool {
    let local: SocketAddr = match target {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let addr = SocketAddr::new(target, port);

    let socket = match UdpSocket::bind(local).await {
        Ok(s) => s,
        Err(e) => {
            trace!(%addr, error = %e, "udp bind failed");
            return false;
        }
    };
    if let Err(e) = socket.connect(addr).await {
        trace!(%addr, error = %e, "udp connect failed");
        return false;
    }
    if let Err(e) = socket.send(&[0u8]).await {
        trace!(%addr, error = %e, "udp send failed");
        return false;
    }

    let mut buf = [0u8; 512];
    match time::timeout(timeout, socket.recv(&mut buf)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "udp reply error");
            false
        }
        Err(_) => false,
    }
}
