//! A [`TunnelStream`] over any length-delimited byte stream.
//!
//! Covers the common case where the transport hands back a plain
//! `AsyncRead + AsyncWrite` substream that's already demultiplexed (a QUIC
//! stream, an already-accepted TCP connection used for testing, a named
//! pipe) but carries no message framing of its own. `LengthDelimitedCodec`
//! is the standard `tokio-util` way to turn such a byte stream into a
//! stream of discrete messages without hand-rolling a length prefix.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use tunnel_protocol::Frame;

use crate::stream::{TunnelReceiver, TunnelSender, TunnelStream};

/// Wraps a byte stream with length-delimited framing and splits it into
/// independent sender/receiver halves.
pub struct FramedStream<T> {
    inner: T,
}

impl<T> FramedStream<T> {
    pub fn new(io: T) -> Self {
        Self { inner: io }
    }
}

pub struct FramedSender<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
}

pub struct FramedReceiver<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
}

impl<T> TunnelStream for FramedStream<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    type Error = std::io::Error;
    type Sender = FramedSender<tokio::io::WriteHalf<T>>;
    type Receiver = FramedReceiver<tokio::io::ReadHalf<T>>;

    fn into_split(self) -> (Self::Sender, Self::Receiver) {
        let (read_half, write_half) = tokio::io::split(self.inner);
        (
            FramedSender {
                inner: FramedWrite::new(write_half, LengthDelimitedCodec::new()),
            },
            FramedReceiver {
                inner: FramedRead::new(read_half, LengthDelimitedCodec::new()),
            },
        )
    }
}

#[async_trait]
impl<W> TunnelSender for FramedSender<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    type Error = std::io::Error;

    async fn send(&mut self, frame: Frame) -> Result<(), Self::Error> {
        self.inner.send(frame.into_wire()).await
    }

    async fn close_send(&mut self) -> Result<(), Self::Error> {
        SinkExt::close(&mut self.inner).await
    }
}

#[async_trait]
impl<R> TunnelReceiver for FramedReceiver<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    type Error = std::io::Error;

    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(Frame::from_wire(bytes.freeze()))),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunnel_protocol::Classified;

    #[tokio::test]
    async fn round_trips_a_payload_over_a_duplex_pipe() {
        let (client, server) = tokio::io::duplex(4096);
        let (mut client_tx, _client_rx) = FramedStream::new(client).into_split();
        let (_server_tx, mut server_rx) = FramedStream::new(server).into_split();

        client_tx
            .send(Frame::encode_payload(&b"hello over a byte stream"[..]))
            .await
            .unwrap();

        let frame = server_rx.recv().await.unwrap().unwrap();
        match frame.classify().unwrap() {
            Classified::Payload(bytes) => assert_eq!(&bytes[..], b"hello over a byte stream"),
            other => panic!("expected Payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_send_is_observed_as_eof_by_the_peer() {
        let (client, server) = tokio::io::duplex(4096);
        let (mut client_tx, _client_rx) = FramedStream::new(client).into_split();
        let (_server_tx, mut server_rx) = FramedStream::new(server).into_split();

        client_tx.close_send().await.unwrap();
        assert!(server_rx.recv().await.unwrap().is_none());
    }
}
