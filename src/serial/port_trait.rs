//! Trait abstraction for serial link operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Trait for the byte-stream link to the GPS receiver
///
/// Reads are timed so the receive loop can poll its termination flag at a
/// bounded interval; writes are fire-and-forget for the short (≤ 40 byte)
/// command frames this driver sends.
#[async_trait]
pub trait SerialLink: Send {
    /// Read up to `buf.len()` bytes, giving up after `timeout`
    ///
    /// Returns the number of bytes read; 0 means the timeout expired before
    /// any data arrived.
    async fn read_with_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write all data to the link
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Fill `buf` completely, allowing `timeout` per chunk of data
    ///
    /// Returns the total bytes read, which is short of `buf.len()` when the
    /// link goes quiet mid-frame.
    async fn read_exact_with_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            let n = self.read_with_timeout(&mut buf[filled..], timeout).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(filled)
    }
}
