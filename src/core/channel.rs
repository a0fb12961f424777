use std::io;

/// Byte-oriented transport the session reads from and writes to.
///
/// The reader loop and the writer loop call into the same channel from two
/// threads, so every method takes `&self`. Implementations keep separate
/// handles (or locks) for the read and write halves so that a read parked in
/// the driver never blocks a write.
pub trait Channel: Send + Sync {
    /// Name used in banners and log records
    fn name(&self) -> &str;

    /// Read up to `max_bytes`.
    ///
    /// Blocks until at least one byte is available, the read timeout expires,
    /// or `cancel_read` is called. The last two return an empty buffer.
    fn read(&self, max_bytes: usize) -> io::Result<Vec<u8>>;

    /// Write all of `data`
    fn write(&self, data: &[u8]) -> io::Result<()>;

    /// Number of bytes that can be read without blocking, if known
    fn bytes_available(&self) -> Option<usize> {
        None
    }

    /// Whether `cancel_read` can interrupt a parked `read`
    fn supports_cancel_read(&self) -> bool {
        false
    }

    /// Abort a pending `read`. Channels without support rely on their read
    /// timeout instead.
    fn cancel_read(&self) {}

    /// Release the underlying device. Must not race a read or write.
    fn close(&self) -> io::Result<()>;
}
