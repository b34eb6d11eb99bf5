//! Local network address lookup

use crate::{Result, VoiceKitError};
use std::net::{IpAddr, UdpSocket};
use std::process::Command;
use tracing::debug;

/// Source of the address spoken by AnnounceIp
pub type IpResolver = Box<dyn Fn() -> Result<IpAddr> + Send + Sync>;

/// First local address of this device
///
/// Asks `hostname -I` first and falls back to the address the kernel would
/// route outbound traffic from. The fallback sends no packets.
pub fn local_ip() -> Result<IpAddr> {
    match ip_from_hostname() {
        Ok(ip) => Ok(ip),
        Err(e) => {
            debug!(error = %e, "hostname -I unavailable, using route lookup");
            ip_from_route()
        }
    }
}

fn ip_from_hostname() -> Result<IpAddr> {
    let output = Command::new("hostname").arg("-I").output()?;
    if !output.status.success() {
        return Err(VoiceKitError::ContentError(format!(
            "hostname exited with {}",
            output.status
        )));
    }

    parse_first_address(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| VoiceKitError::ContentError("hostname reported no address".into()))
}

fn ip_from_route() -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(VoiceKitError::ContentError("No routable local address".into()));
    }
    Ok(ip)
}

/// Parse the first IPv4 address in `hostname -I` output
pub fn parse_first_address(output: &str) -> Option<IpAddr> {
    output
        .split_whitespace()
        .filter_map(|token| token.parse::<IpAddr>().ok())
        .find(IpAddr::is_ipv4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_first_address() {
        assert_eq!(
            parse_first_address("192.168.1.23 172.17.0.1 fe80::1\n"),
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 23)))
        );
        assert_eq!(
            parse_first_address("fe80::1 192.168.1.2\n"),
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)))
        );
        assert_eq!(parse_first_address("fe80::1 ::1"), None);
        assert_eq!(parse_first_address("\n"), None);
        assert_eq!(parse_first_address("not-an-ip"), None);
    }
}
