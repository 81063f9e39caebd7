//! The tunnel endpoint: one side of a router tunnel session once `dial` has
//! completed the handshake.
//!
//! A [`Tunnel`] wraps a split [`TunnelStream`] and exposes `Send`/`Recv` for
//! whole payloads plus `Read`/`Write` for the partial-transfer case where a
//! caller's buffer is smaller than a received frame. `WriteTo`/`ReadFrom`
//! pump against any local `AsyncWrite`/`AsyncRead` without a wrapper type.
//! `Close` is idempotent and only half-closes the send side — the receive
//! side keeps draining until the peer closes too, or the stream errors, per
//! the independent send/receive state machines in the endpoint's contract.
//! `Done` lets any number of observers await session teardown without racing
//! the close itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use tunnel_protocol::{Classified, Frame, Operation, Role, TunnelConfig};

use crate::error::{DialError, TransferError, TunnelError};
use crate::pool::PooledBuffer;
use crate::stream::{TunnelReceiver, TunnelSender, TunnelStream};

/// Convenience alias: a fallible [`Tunnel`] method's error, reference-counted
/// so every concurrent awaiter of a sticky outcome (currently only `close`)
/// can hold a clone without requiring `S::Error: Clone`.
pub type TunnelResult<T, E> = Result<T, Arc<TunnelError<E>>>;

struct ReadSide<R> {
    receiver: R,
    /// The tail of a `Payload` frame too large for the caller's last `read`
    /// buffer, held until the next `read`/`recv` call drains it.
    leftover: Option<Bytes>,
}

/// One side of a dialed router tunnel session.
///
/// Safe to share behind an `Arc` and drive from two tasks at once — one
/// calling `Recv`/`Read`, the other calling `Send`/`Write` — per the
/// concurrency contract; nothing in this type assumes a single caller, but
/// it does assume at most one concurrent caller *per direction*.
pub struct Tunnel<S: TunnelStream> {
    sender: AsyncMutex<S::Sender>,
    receiver: AsyncMutex<ReadSide<S::Receiver>>,
    /// Serializes concurrent `close()` callers and caches the first call's
    /// outcome. `None` means `close()` has never completed.
    close_outcome: AsyncMutex<Option<TunnelResult<(), S::Error>>>,
    /// Set as soon as the first `close()` call begins, before `close_send`
    /// resolves, so `done()` observes it without awaiting the close mutex.
    closing: AtomicBool,
    notify: Notify,
}

impl<S: TunnelStream> Tunnel<S> {
    fn new(sender: S::Sender, receiver: S::Receiver) -> Self {
        Self {
            sender: AsyncMutex::new(sender),
            receiver: AsyncMutex::new(ReadSide {
                receiver,
                leftover: None,
            }),
            close_outcome: AsyncMutex::new(None),
            closing: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// `true` once `close()` has been called, even if it hasn't finished
    /// running `close_send` yet. Gates `send`/`write`: the send side is
    /// considered half-closed from the caller's perspective the moment
    /// `close()` is invoked, not only once it returns.
    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    async fn next_frame_payload(
        &self,
        guard: &mut ReadSide<S::Receiver>,
    ) -> TunnelResult<Option<Bytes>, S::Error> {
        loop {
            match guard.receiver.recv().await {
                Ok(Some(frame)) => match frame.classify() {
                    Ok(Classified::Payload(bytes)) => return Ok(Some(bytes)),
                    Ok(Classified::Init(_)) | Ok(Classified::Other) => continue,
                    Err(e) => return Err(Arc::new(TunnelError::Protocol(e))),
                },
                Ok(None) => return Ok(None),
                Err(e) => return Err(Arc::new(TunnelError::Recv(e))),
            }
        }
    }

    /// Returns the next payload, or `None` on clean stream EOF.
    ///
    /// Unaffected by this side's own `close()` — the receive side keeps
    /// draining until the peer closes or the stream itself errors, per the
    /// half-close contract.
    pub async fn recv(&self) -> TunnelResult<Option<Bytes>, S::Error> {
        let mut guard = self.receiver.lock().await;
        if let Some(bytes) = guard.leftover.take() {
            return Ok(Some(bytes));
        }
        self.next_frame_payload(&mut guard).await
    }

    /// Fills `buf` with up to `buf.len()` bytes from the next payload,
    /// buffering any remainder for the following call. Returns `0` only on
    /// clean EOF or an empty `buf`.
    pub async fn read(&self, buf: &mut [u8]) -> TunnelResult<usize, S::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut guard = self.receiver.lock().await;
        let bytes = match guard.leftover.take() {
            Some(bytes) => bytes,
            None => match self.next_frame_payload(&mut guard).await? {
                Some(bytes) => bytes,
                None => return Ok(0),
            },
        };
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        if n < bytes.len() {
            guard.leftover = Some(bytes.slice(n..));
        }
        Ok(n)
    }

    /// Sends `payload` as a single frame. No copy of `payload` is made by
    /// this layer — pass a [`Bytes`] clone of a buffer you already hold to
    /// avoid one at the caller too.
    ///
    /// Each call surfaces the transport's outcome fresh: a failed `Send`
    /// does not poison later calls, which keep attempting to reach the
    /// peer and report whatever the transport gives them.
    pub async fn send(&self, payload: Bytes) -> TunnelResult<(), S::Error> {
        if self.is_closing() {
            return Err(Arc::new(TunnelError::Closed));
        }
        let frame = Frame::encode_payload(payload);
        let mut sender = self.sender.lock().await;
        sender
            .send(frame)
            .await
            .map_err(|e| Arc::new(TunnelError::Send(e)))
    }

    /// Sends `buf` as a single frame, copying it once into an owned buffer.
    /// Writing an empty slice is a no-op that returns `Ok(0)`.
    pub async fn write(&self, buf: &[u8]) -> TunnelResult<usize, S::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.send(Bytes::copy_from_slice(buf)).await?;
        Ok(buf.len())
    }

    /// Copies every received payload to `dst`, preferring the zero-copy
    /// `recv` path, until clean EOF. Returns the total bytes written.
    pub async fn write_to<W>(&self, dst: &mut W) -> Result<u64, TransferError<S::Error>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut total = 0u64;
        loop {
            match self.recv().await.map_err(TransferError::Tunnel)? {
                Some(bytes) => {
                    dst.write_all(&bytes).await.map_err(TransferError::Local)?;
                    total += bytes.len() as u64;
                }
                None => break,
            }
        }
        dst.flush().await.map_err(TransferError::Local)?;
        Ok(total)
    }

    /// Reads from `src` in [`tunnel_protocol::DEFAULT_BUFFER_SIZE`] chunks
    /// and sends each as a frame until `src` reaches EOF. Returns the total
    /// bytes sent. Does not half-close the send side on completion — a
    /// caller using this for a one-shot upload calls `close` afterward.
    pub async fn read_from<R>(&self, src: &mut R) -> Result<u64, TransferError<S::Error>>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut total = 0u64;
        loop {
            let mut buf = PooledBuffer::acquire();
            let n = src.read(&mut buf).await.map_err(TransferError::Local)?;
            if n == 0 {
                break;
            }
            self.send(Bytes::copy_from_slice(&buf[..n]))
                .await
                .map_err(TransferError::Tunnel)?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Half-closes the send side. Idempotent: concurrent or sequential
    /// callers all observe the same outcome — the first call's result,
    /// cached — and the underlying stream's `close_send` runs at most once.
    ///
    /// Does not affect the receive side: frames already in flight from the
    /// peer, or still to come before the peer's own close, remain readable
    /// via `recv`/`read`.
    pub async fn close(&self) -> TunnelResult<(), S::Error> {
        let mut guard = self.close_outcome.lock().await;
        if let Some(cached) = guard.as_ref() {
            return cached.clone();
        }
        self.closing.store(true, Ordering::Release);
        let result = self
            .sender
            .lock()
            .await
            .close_send()
            .await
            .map_err(|e| Arc::new(TunnelError::Send(e)));
        *guard = Some(result.clone());
        drop(guard);
        self.notify.notify_waiters();
        result
    }

    /// Resolves once `close()` has been called at least once, by any
    /// caller. Uses the construct-then-check-then-await idiom so a
    /// concurrent `close()` between the check and the await can never be
    /// missed.
    pub async fn done(&self) {
        let notified = self.notify.notified();
        if self.is_closing() {
            return;
        }
        notified.await;
    }
}

/// Bounds how long [`dial`] waits to establish a session before giving up.
pub struct DialOptions {
    pub connect_timeout: Duration,
    pub cancellation: Option<CancellationToken>,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            cancellation: None,
        }
    }
}

async fn wait_cancelled(token: &Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Opens `stream`, sends the mandatory `Init` frame derived from `config`,
/// and returns the resulting [`Tunnel`].
///
/// `open` performs whatever the caller's transport needs to produce a
/// concrete [`TunnelStream`] for `role` (the router pairs a `User` stream
/// and an `Agent` stream by matching `session_key`); `dial` itself is
/// transport-agnostic and only drives the handshake once `open` resolves.
/// If `open` or the init send fails, no `Tunnel` is returned — the caller
/// never observes a partially-initialized session.
#[instrument(skip(open, opts), fields(session_key = %config.session_key(), role = ?role))]
pub async fn dial<S, F, Fut>(
    role: Role,
    config: TunnelConfig,
    opts: DialOptions,
    open: F,
) -> Result<Tunnel<S>, DialError<S::Error>>
where
    S: TunnelStream,
    F: FnOnce(Role) -> Fut,
    Fut: std::future::Future<Output = Result<S, S::Error>>,
{
    let init = config.to_init();
    debug!(operation = ?op_kind(config.operation()), "dialing");

    let stream = tokio::select! {
        biased;
        _ = wait_cancelled(&opts.cancellation) => return Err(DialError::Cancelled),
        res = tokio::time::timeout(opts.connect_timeout, open(role)) => {
            match res {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(DialError::Connect(e)),
                Err(_) => return Err(DialError::Timeout),
            }
        }
    };

    let (mut sender, receiver) = stream.into_split();
    // A well-formed `TunnelInit` derived from a validated `TunnelConfig`
    // cannot fail to encode; bincode only rejects unsupported types.
    let frame = Frame::encode_init(&init).expect("TunnelInit is always encodable");
    sender.send(frame).await.map_err(DialError::SendInit)?;

    debug!("init frame sent");
    Ok(Tunnel::new(sender, receiver))
}

fn op_kind(op: &Operation) -> &'static str {
    match op {
        Operation::Exec { .. } => "exec",
        Operation::PortForward { .. } => "port-forward",
        Operation::Rsync => "rsync",
        Operation::WebSocket => "websocket",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{mock_pair, MockStream};

    fn sample_config() -> TunnelConfig {
        TunnelConfig::new("sess-1", "cookie-1", "wf-1", Operation::rsync()).unwrap()
    }

    async fn dialed_pair() -> (Tunnel<MockStream>, Tunnel<MockStream>) {
        let (a, b) = mock_pair();
        let config = sample_config();
        let (a_tunnel, b_tunnel) = tokio::join!(
            dial(Role::User, config.clone(), DialOptions::default(), move |_| async move {
                Ok::<_, std::convert::Infallible>(a)
            }),
            dial(Role::Agent, config, DialOptions::default(), move |_| async move {
                Ok::<_, std::convert::Infallible>(b)
            }),
        );
        (a_tunnel.unwrap(), b_tunnel.unwrap())
    }

    #[tokio::test]
    async fn dial_sends_init_and_peer_skips_it() {
        let (a, b) = dialed_pair().await;
        a.send(Bytes::from_static(b"payload-1")).await.unwrap();
        let got = b.recv().await.unwrap().unwrap();
        assert_eq!(&got[..], b"payload-1");
    }

    #[tokio::test]
    async fn read_drains_leftover_across_calls() {
        let (a, b) = dialed_pair().await;
        a.send(Bytes::from_static(b"0123456789")).await.unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(b.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(b.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(b.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_wakes_done() {
        let (a, _b) = dialed_pair().await;
        let first = a.close().await.unwrap();
        let second = a.close().await.unwrap();
        assert_eq!(first, second);
        a.done().await; // must not hang
    }

    #[tokio::test]
    async fn send_after_close_is_an_error() {
        let (a, _b) = dialed_pair().await;
        a.close().await.unwrap();
        assert!(matches!(
            *a.send(Bytes::from_static(b"x")).await.unwrap_err(),
            TunnelError::Closed
        ));
    }

    #[tokio::test]
    async fn recv_keeps_draining_after_local_close_until_peer_closes_too() {
        let (a, b) = dialed_pair().await;
        a.send(Bytes::from_static(b"still queued")).await.unwrap();
        // Closing a's send side must not prevent b from reading what a
        // already sent, or from observing EOF once a's stream actually
        // drains — the two directions are independent.
        a.close().await.unwrap();
        let got = b.recv().await.unwrap().unwrap();
        assert_eq!(&got[..], b"still queued");
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recv_returns_none_on_peer_close() {
        let (a, b) = dialed_pair().await;
        b.close().await.unwrap();
        assert!(a.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_to_copies_until_eof() {
        let (a, b) = dialed_pair().await;
        a.send(Bytes::from_static(b"hello ")).await.unwrap();
        a.send(Bytes::from_static(b"world")).await.unwrap();
        a.close().await.unwrap();

        let mut out = Vec::new();
        let n = b.write_to(&mut out).await.unwrap();
        assert_eq!(n, 11);
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn read_from_sends_every_chunk() {
        let (a, b) = dialed_pair().await;
        let mut src: &[u8] = b"a small upload";
        let n = a.read_from(&mut src).await.unwrap();
        assert_eq!(n, 14);

        let mut out = Vec::new();
        a.close().await.unwrap();
        let got = b.write_to(&mut out).await.unwrap();
        assert_eq!(got, 14);
        assert_eq!(out, b"a small upload");
    }

    #[tokio::test]
    async fn write_and_read_empty_slices_are_no_ops() {
        let (a, b) = dialed_pair().await;
        assert_eq!(a.write(b"").await.unwrap(), 0);
        let mut buf = [0u8; 0];
        assert_eq!(b.read(&mut buf).await.unwrap(), 0);
    }
}
