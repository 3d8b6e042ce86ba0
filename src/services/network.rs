//! Local network address discovery

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::debug;

/// Unroutable route target; connecting a UDP socket sends no packets
const ROUTE_TARGET: (&str, u16) = ("10.255.255.255", 1);

/// Address of the interface this machine would use for outbound traffic
///
/// Falls back to loopback when no route is available.
pub fn local_ip() -> IpAddr {
    match outbound_ip() {
        Ok(ip) => ip,
        Err(e) => {
            debug!(error = %e, "Outbound address discovery failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(ROUTE_TARGET)?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ip_is_ipv4() {
        // Either the discovered interface or the loopback fallback
        assert!(local_ip().is_ipv4());
    }
}
