//! Random-access byte sources for uploads.
//!
//! Upload workers read disjoint ranges of the same source concurrently, so a
//! [`ReadAt`] implementation must serve positional reads through `&self`
//! without a shared cursor.

use std::io;
use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;

/// Bytes read from the source per step while streaming a chunk body.
pub const STREAM_BLOCK: u64 = 256 * 1024;

/// Positional, concurrently readable byte source.
pub trait ReadAt: Send + Sync {
    /// Read into `buf` starting at `offset`. Returns the number of bytes read;
    /// `0` means end of source.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

#[cfg(unix)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }
}

/// Read exactly `range` from `source`.
///
/// Fails with `UnexpectedEof` if the source ends before `range.end`.
pub(crate) fn read_range<S: ReadAt + ?Sized>(source: &S, range: Range<u64>) -> io::Result<Vec<u8>> {
    let len = usize::try_from(range.end - range.start)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk exceeds address space"))?;
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match source.read_at(&mut buf[filled..], range.start + filled as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "source ended at offset {} inside range {}..{}",
                        range.start + filled as u64,
                        range.start,
                        range.end
                    ),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(buf)
}

/// Stream exactly `range` of `source` in blocks of at most `block` bytes.
///
/// Each block is read on the blocking pool, so only one block per stream is
/// held in memory. Fails with `UnexpectedEof` like [`read_range`].
pub(crate) fn range_stream<S>(
    source: Arc<S>,
    range: Range<u64>,
    block: u64,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: ReadAt + ?Sized + 'static,
{
    let block = block.max(1);
    let end = range.end;
    futures::stream::try_unfold(range.start, move |offset| {
        let source = Arc::clone(&source);
        async move {
            if offset >= end {
                return Ok(None);
            }
            let next = offset.saturating_add(block).min(end);
            let data = tokio::task::spawn_blocking(move || read_range(&*source, offset..next))
                .await
                .map_err(io::Error::other)??;
            Ok(Some((Bytes::from(data), next)))
        }
    })
}
