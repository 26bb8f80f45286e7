//! The one concrete transport adapter: a UDP socket carrying framed wire
//! records. Kept in the binary crate so the core pipeline crates never
//! assume a specific transport.

use tokio::net::UdpSocket;

use auralink_foundation::TransportError;

/// Large enough for `4 + max_compressed_frame` with headroom; Opus voice
/// frames at 48kHz/20ms rarely exceed a few hundred bytes.
const MAX_DATAGRAM_BYTES: usize = 1500;

pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<std::net::SocketAddr>,
}

impl UdpTransport {
    pub async fn bind(bind_addr: &str, peer_addr: Option<&str>) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let peer = peer_addr
            .map(|addr| addr.parse())
            .transpose()
            .map_err(|_| TransportError::NoPeer)?;
        Ok(Self { socket, peer })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Send one already-framed wire record to the configured peer.
    pub async fn send(&self, record: &[u8]) -> Result<(), TransportError> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        self.socket.send_to(record, peer).await?;
        Ok(())
    }

    /// Receive one wire record. The sender's address is adopted as the peer
    /// if none was configured, so a receive-only binary can reply without a
    /// `--peer` flag.
    pub async fn recv(&mut self, buf: &mut [u8; MAX_DATAGRAM_BYTES]) -> Result<usize, TransportError> {
        let (len, from) = self.socket.recv_from(buf).await?;
        if self.peer.is_none() {
            self.peer = Some(from);
        }
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auralink_transport::{deframe, frame};

    #[tokio::test]
    async fn loopback_round_trip_preserves_index_and_payload() {
        let mut receiver = UdpTransport::bind("127.0.0.1:0", None).await.unwrap();
        let recv_addr = receiver.local_addr().unwrap();

        let sender = UdpTransport::bind("127.0.0.1:0", Some(&recv_addr.to_string()))
            .await
            .unwrap();

        let record = frame(42, &[1, 2, 3, 4]);
        sender.send(&record).await.unwrap();

        let mut buf = [0u8; MAX_DATAGRAM_BYTES];
        let len = receiver.recv(&mut buf).await.unwrap();
        let (index, payload) = deframe(&buf[..len]).unwrap();

        assert_eq!(index, 42);
        assert_eq!(payload, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn send_without_peer_is_rejected() {
        let transport = UdpTransport::bind("127.0.0.1:0", None).await.unwrap();
        let record = frame(1, &[]);
        assert!(matches!(
            transport.send(&record).await,
            Err(TransportError::NoPeer)
        ));
    }
}
