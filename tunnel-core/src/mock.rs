//! An in-memory [`TunnelStream`] for tests: a pair of
//! [`mock_pair`]-connected streams that shuttle [`Frame`]s through unbounded
//! channels instead of a real socket.
//!
//! Mirrors the shape of this crate's own tests against `tunnel-transport`'s
//! lineage, which tests transport-agnostic logic against a paired in-memory
//! channel rather than spinning up a real listener.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tunnel_protocol::Frame;

use crate::stream::{TunnelReceiver, TunnelSender, TunnelStream};

/// The mock stream never fails on its own; `Infallible` keeps
/// `TunnelStream::Error` honest about that instead of papering over it with
/// an unused `io::Error` variant nothing ever constructs.
pub type MockError = std::convert::Infallible;

/// One side of a [`mock_pair`]. Implements [`TunnelStream`] directly —
/// `into_split` just hands back the sender/receiver halves it already owns.
pub struct MockStream {
    tx: MockSender,
    rx: MockReceiver,
}

pub struct MockSender {
    // `None` after `close_send` — models an independent half-close: the
    // peer's `recv` still drains whatever was already queued before it
    // observes EOF.
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

pub struct MockReceiver {
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// Builds two [`MockStream`]s wired so each one's sender feeds the other's
/// receiver.
pub fn mock_pair() -> (MockStream, MockStream) {
    let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
    let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

    let a = MockStream {
        tx: MockSender { tx: Some(a_to_b_tx) },
        rx: MockReceiver { rx: b_to_a_rx },
    };
    let b = MockStream {
        tx: MockSender { tx: Some(b_to_a_tx) },
        rx: MockReceiver { rx: a_to_b_rx },
    };
    (a, b)
}

impl TunnelStream for MockStream {
    type Error = MockError;
    type Sender = MockSender;
    type Receiver = MockReceiver;

    fn into_split(self) -> (Self::Sender, Self::Receiver) {
        (self.tx, self.rx)
    }
}

#[async_trait]
impl TunnelSender for MockSender {
    type Error = MockError;

    async fn send(&mut self, frame: Frame) -> Result<(), Self::Error> {
        if let Some(tx) = &self.tx {
            // The peer's receiver was dropped; a real transport would
            // surface this as a broken-pipe error, but nothing in this
            // crate's tests exercises that path, so it's silently dropped
            // here rather than inventing an error variant `Infallible`
            // can't express.
            let _ = tx.send(frame);
        }
        Ok(())
    }

    async fn close_send(&mut self) -> Result<(), Self::Error> {
        self.tx.take();
        Ok(())
    }
}

#[async_trait]
impl TunnelReceiver for MockReceiver {
    type Error = MockError;

    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(self.rx.recv().await)
    }
}
