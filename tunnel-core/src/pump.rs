//! Bidirectional copy pump: concurrently copies `tunnel -> local` and
//! `local -> tunnel` until either side reaches EOF or errors.
//!
//! The two directions run as independent [`tokio::spawn`]ed tasks under one
//! supervising [`CancellationToken`] — the idiomatic Rust shape for the
//! `errgroup`-style supervisor this crate's design is modeled on. The first
//! task to hit a real transfer error cancels the token; the other task's
//! next cancellation-aware `select!` branch observes it and returns early
//! instead of blocking on a read/write that will never complete. Per
//! `context.Canceled`'s place in the error taxonomy, a direction that only
//! ever observes cancellation (its own or the caller's) contributes no error
//! to the result — only a genuine transport or local I/O failure does.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{PumpError, TransferError, TransferFailed};
use crate::pool::PooledBuffer;
use crate::stream::TunnelStream;
use crate::tunnel::Tunnel;

async fn pump_tunnel_to_local<S, W>(
    tunnel: &Tunnel<S>,
    dst: &mut W,
    cancel: &CancellationToken,
) -> Result<(), PumpError<S::Error>>
where
    S: TunnelStream,
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PumpError::Cancelled),
            recvd = tunnel.recv() => recvd.map_err(TransferError::Tunnel).map_err(PumpError::from_transfer)?,
        };
        match received {
            Some(bytes) => {
                dst.write_all(&bytes)
                    .await
                    .map_err(TransferError::Local)
                    .map_err(PumpError::from_transfer)?;
            }
            None => break,
        }
    }
    dst.flush()
        .await
        .map_err(TransferError::Local)
        .map_err(PumpError::from_transfer)
}

async fn pump_local_to_tunnel<S, R>(
    tunnel: &Tunnel<S>,
    src: &mut R,
    cancel: &CancellationToken,
) -> Result<(), PumpError<S::Error>>
where
    S: TunnelStream,
    R: AsyncRead + Unpin + Send,
{
    loop {
        let mut buf = PooledBuffer::acquire();
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PumpError::Cancelled),
            res = src.read(&mut buf) => res.map_err(TransferError::Local).map_err(PumpError::from_transfer)?,
        };
        if n == 0 {
            break;
        }
        tunnel
            .send(Bytes::copy_from_slice(&buf[..n]))
            .await
            .map_err(TransferError::Tunnel)
            .map_err(PumpError::from_transfer)?;
    }
    Ok(())
}

/// Concurrently copies `tunnel -> local` and `local -> tunnel` until both
/// directions reach EOF, or returns the first genuine error encountered.
///
/// `cancel` scopes the whole pump from the caller's side — cancelling it
/// (or its parent, if it's a child token) unblocks both directions at their
/// next cancellation-aware await point, the same way it would unblock a
/// `Dial` in progress. A direction that ends because of cancellation alone,
/// with no underlying transport or local I/O error, does not contribute an
/// error to the result: cancellation is treated as an expected close, not a
/// failure, matching `context.Canceled`'s place in the error taxonomy.
#[instrument(skip(tunnel, local, cancel))]
pub async fn copy_bidirectional<S, L>(
    tunnel: Arc<Tunnel<S>>,
    local: L,
    cancel: CancellationToken,
) -> Result<(), TransferFailed<S::Error>>
where
    S: TunnelStream,
    L: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let supervisor = cancel.child_token();
    let (mut local_read, mut local_write) = tokio::io::split(local);

    let tunnel_to_local = {
        let tunnel = tunnel.clone();
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            let result = pump_tunnel_to_local(&tunnel, &mut local_write, &supervisor).await;
            if matches!(result, Err(PumpError::Transfer(_))) {
                supervisor.cancel();
            }
            result
        })
    };

    let local_to_tunnel = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            let result = pump_local_to_tunnel(&tunnel, &mut local_read, &supervisor).await;
            if matches!(result, Err(PumpError::Transfer(_))) {
                supervisor.cancel();
            }
            result
        })
    };

    let (tunnel_to_local, local_to_tunnel) = tokio::join!(tunnel_to_local, local_to_tunnel);

    let tunnel_to_local_err = transfer_error(tunnel_to_local.expect("tunnel->local pump task panicked"));
    let local_to_tunnel_err = transfer_error(local_to_tunnel.expect("local->tunnel pump task panicked"));

    match (tunnel_to_local_err, local_to_tunnel_err) {
        (None, None) => Ok(()),
        (tunnel_to_local, local_to_tunnel) => Err(TransferFailed {
            tunnel_to_local,
            local_to_tunnel,
        }),
    }
}

fn transfer_error<E>(result: Result<(), PumpError<E>>) -> Option<TransferError<E>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(()) | Err(PumpError::Cancelled) => None,
        Err(PumpError::Transfer(e)) => Some(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{mock_pair, MockStream};
    use crate::tunnel::{dial, DialOptions};
    use tunnel_protocol::{Operation, Role, TunnelConfig};

    async fn dialed_pair() -> (Tunnel<MockStream>, Tunnel<MockStream>) {
        let (a, b) = mock_pair();
        let config = TunnelConfig::new("sess-1", "cookie-1", "wf-1", Operation::rsync()).unwrap();
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
    async fn echoes_through_a_duplex_local_pair() {
        let (user, agent) = dialed_pair().await;
        let (client_half, server_half) = tokio::io::duplex(256);

        let agent = Arc::new(agent);
        let agent_pump = {
            let agent = agent.clone();
            tokio::spawn(copy_bidirectional(agent, server_half, CancellationToken::new()))
        };

        user.send(Bytes::from_static(b"hello\n")).await.unwrap();
        let mut echoed = [0u8; 6];
        let mut local = client_half;
        local.read_exact(&mut echoed).await.unwrap();
        // The local side behind `agent` doesn't echo on its own in this
        // test; assert the bytes arrived at the local duplex half instead.
        assert_eq!(&echoed, b"hello\n");

        drop(local);
        user.close().await.unwrap();
        let outcome = agent_pump.await.unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn local_read_error_surfaces_as_transfer_failed() {
        struct FailingRead;
        impl AsyncRead for FailingRead {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "boom",
                )))
            }
        }
        impl AsyncWrite for FailingRead {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                buf: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Ready(Ok(buf.len()))
            }
            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let (_user, agent) = dialed_pair().await;
        let err = copy_bidirectional(Arc::new(agent), FailingRead, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.local_to_tunnel.is_some());
    }
}
