//! Datagram transport for telemetry packets.
//!
//! One JSON record per UDP datagram, no framing. Delivery is best effort:
//! nothing here retries, acknowledges or reorders.

use crate::error::{StreamError, StreamResult};
use bytes::Bytes;
use groundlink_core::{Destination, TelemetryPacket, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, ToSocketAddrs, UdpSocket};
use tracing::debug;

/// Producer-side socket bound to an ephemeral port and aimed at one destination.
#[derive(Debug)]
pub struct PacketSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl PacketSender {
    /// Resolve `destination` and bind a socket of the matching address family.
    pub async fn open(destination: &Destination) -> StreamResult<Self> {
        let target = lookup_host((destination.host.as_str(), destination.port))
            .await?
            .next()
            .ok_or_else(|| StreamError::Unresolved {
                destination: destination.to_string(),
            })?;

        let local: SocketAddr = if target.is_ipv6() {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!(%target, local = ?socket.local_addr().ok(), "Opened packet sender");

        Ok(Self { socket, target })
    }

    /// Resolved destination address.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Encode and transmit one packet. Returns the datagram size.
    pub async fn send(&self, packet: &TelemetryPacket) -> StreamResult<usize> {
        let payload = packet.encode()?;
        self.send_raw(&payload).await
    }

    /// Transmit an already-encoded record.
    pub async fn send_raw(&self, payload: &[u8]) -> StreamResult<usize> {
        Ok(self.socket.send_to(payload, self.target).await?)
    }
}

/// One received datagram.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// Raw payload, exactly as read off the socket
    pub payload: Bytes,
    /// Sender address
    pub source: SocketAddr,
    /// The datagram exceeded `MAX_DATAGRAM_SIZE` and `payload` is cut short
    pub oversized: bool,
}

/// Consumer-side listening socket.
#[derive(Debug)]
pub struct PacketReceiver {
    socket: UdpSocket,
}

impl PacketReceiver {
    /// Bind the listening socket.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Wait at most `timeout` for one datagram.
    ///
    /// `Ok(None)` means the wait elapsed with no traffic; it is not an error.
    /// One spare byte past `MAX_DATAGRAM_SIZE` lets oversized datagrams be
    /// told apart from ones that fit exactly.
    pub async fn recv_timeout(&self, timeout: Duration) -> std::io::Result<Option<Datagram>> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE + 1];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, source))) => Ok(Some(Datagram {
                payload: Bytes::copy_from_slice(&buf[..len.min(MAX_DATAGRAM_SIZE)]),
                source,
                oversized: len > MAX_DATAGRAM_SIZE,
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_packet_crosses_the_wire_unchanged() {
        let receiver = PacketReceiver::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sender = PacketSender::open(&Destination::new("127.0.0.1", port))
            .await
            .unwrap();
        let packet = TelemetryPacket {
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            description: "Battery Voltage".to_string(),
            value: 12.into(),
            unit: "V".to_string(),
        };
        let sent = sender.send(&packet).await.unwrap();

        let datagram = receiver
            .recv_timeout(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("datagram should arrive on loopback");
        assert_eq!(datagram.payload.len(), sent);
        assert_eq!(sender.target().port(), port);
        assert!(!datagram.oversized);
        assert_eq!(datagram.payload.as_ref(), packet.encode().unwrap().as_slice());
        assert_eq!(TelemetryPacket::decode(&datagram.payload).unwrap(), packet);
    }

    #[tokio::test]
    async fn test_datagram_size_limit() {
        let receiver = PacketReceiver::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let sender = PacketSender::open(&Destination::new("127.0.0.1", port))
            .await
            .unwrap();

        sender.send_raw(&[b'a'; MAX_DATAGRAM_SIZE]).await.unwrap();
        let exact = receiver
            .recv_timeout(Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exact.payload.len(), MAX_DATAGRAM_SIZE);
        assert!(!exact.oversized);

        sender.send_raw(&[b'a'; 1500]).await.unwrap();
        let oversized = receiver
            .recv_timeout(Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();
        assert!(oversized.oversized);
        assert_eq!(oversized.payload.len(), MAX_DATAGRAM_SIZE);
    }

    #[tokio::test]
    async fn test_recv_timeout_without_traffic() {
        let receiver = PacketReceiver::bind("127.0.0.1:0").await.unwrap();
        let result = receiver.recv_timeout(Duration::from_millis(20)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unresolvable_destination() {
        let result = PacketSender::open(&Destination::new("host.invalid", 9)).await;
        assert!(result.is_err());
    }
}
