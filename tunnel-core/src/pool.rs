//! A process-wide pool of fixed-size byte buffers for the copy fallback
//! path: reusing buffers across `Read`/`ReadFrom` calls avoids an allocation
//! per frame on a connection that's shuttling many small payloads.
//!
//! `parking_lot::Mutex` is used instead of `std::sync::Mutex` for the
//! uncontended acquire/release pair on the hot copy path — no poisoning to
//! check, cheaper lock/unlock, and it's already this stack's choice for
//! low-latency shared state.

use std::sync::OnceLock;

use parking_lot::Mutex;

use tunnel_protocol::DEFAULT_BUFFER_SIZE;

fn pool() -> &'static Mutex<Vec<Box<[u8]>>> {
    static POOL: OnceLock<Mutex<Vec<Box<[u8]>>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

/// A buffer checked out of the process-wide pool. Returned to the pool on
/// drop rather than deallocated, so repeated `acquire`/drop cycles on a
/// long-lived connection settle into zero allocations after warmup.
pub struct PooledBuffer {
    buf: Option<Box<[u8]>>,
}

impl PooledBuffer {
    /// Checks out a buffer of [`DEFAULT_BUFFER_SIZE`], reusing one returned
    /// by an earlier `drop` if the pool has one available.
    pub fn acquire() -> Self {
        let buf = pool()
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; DEFAULT_BUFFER_SIZE].into_boxed_slice());
        Self { buf: Some(buf) }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().expect("buffer taken before drop")
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().expect("buffer taken before drop")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            pool().lock().push(buf);
        }
    }
}
