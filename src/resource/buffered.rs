//! Read-ahead buffering for resources read in small sequential chunks.
//!
//! Parsers typically read a resource a few hundred bytes at a time, moving
//! forward. Against an HTTP server or a deflated zip entry, each of those
//! reads is expensive. [`BufferedResource`] rounds every read up to the next
//! multiple of its buffer size and keeps the tail of what it fetched, so the
//! following forward reads are served from memory.

use std::ops::Range;
use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;
use tracing::trace;

use super::{Resource, ResourceError, clamp_range};
use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::link::Link;

/// Bytes of the wrapped resource, with the range they were read from.
#[derive(Debug)]
struct Buffer {
    data: Bytes,
    range: Range<u64>,
}

impl Buffer {
    /// Keeps at most the trailing `size` bytes of `data`, read at `start`.
    fn trailing(data: Bytes, start: u64, size: u64) -> Self {
        let len = data.len() as u64;
        let keep = len.min(size);
        let data = data.slice(to_usize(len - keep)..);
        Self {
            data,
            range: start + len - keep..start + len,
        }
    }

    fn contains(&self, range: &Range<u64>) -> bool {
        self.range.start <= range.start && range.end <= self.range.end
    }

    fn contains_start(&self, range: &Range<u64>) -> bool {
        self.range.start <= range.start && range.start < self.range.end
    }

    fn slice(&self, range: &Range<u64>) -> Bytes {
        slice_at(&self.data, self.range.start, range)
    }
}

/// Returns the part of `data`, read at offset `start`, covering `range`.
fn slice_at(data: &Bytes, start: u64, range: &Range<u64>) -> Bytes {
    let from = to_usize(range.start.saturating_sub(start)).min(data.len());
    let to = to_usize(range.end.saturating_sub(start)).min(data.len());
    data.slice(from..to.max(from))
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Decorator buffering forward reads of the wrapped resource.
///
/// Reads of the whole resource are passed through untouched. Ranged reads
/// issue at most one read on the wrapped resource, and memory stays bounded
/// by the buffer size.
#[derive(Debug)]
pub struct BufferedResource<R> {
    resource: R,
    buffer_size: u64,
    buffer: Mutex<Option<Buffer>>,
}

impl<R: Resource> BufferedResource<R> {
    /// Wraps `resource` with a buffer of `buffer_size` bytes.
    ///
    /// A size of zero is raised to one byte.
    pub fn new(resource: R, buffer_size: u64) -> Self {
        Self {
            resource,
            buffer_size: buffer_size.max(1),
            buffer: Mutex::new(None),
        }
    }

    /// Wraps `resource` with the default 256 KiB buffer.
    pub fn with_default_size(resource: R) -> Self {
        Self::new(resource, DEFAULT_BUFFER_SIZE)
    }

    /// Returns the buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    /// Returns the wrapped resource.
    pub fn get_ref(&self) -> &R {
        &self.resource
    }

    /// Unwraps the decorated resource.
    pub fn into_inner(self) -> R {
        self.resource
    }

    fn aligned_end(&self, end: u64, length: u64) -> u64 {
        end.div_ceil(self.buffer_size)
            .saturating_mul(self.buffer_size)
            .min(length)
    }
}

#[async_trait]
impl<R: Resource> Resource for BufferedResource<R> {
    fn link(&self) -> &Link {
        self.resource.link()
    }

    fn file(&self) -> Option<&Path> {
        self.resource.file()
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        self.resource.length().await
    }

    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        let Some(range) = range else {
            return self.resource.read(None).await;
        };

        let length = self.resource.length().await?;
        let range = clamp_range(range, length);
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let aligned_end = self.aligned_end(range.end, length);

        let mut buffer = self.buffer.lock().await;

        if let Some(current) = buffer.as_ref() {
            if current.contains(&range) {
                trace!(?range, "serving read from buffer");
                return Ok(current.slice(&range));
            }

            if current.contains_start(&range) {
                let missing = current.range.end..aligned_end;
                trace!(?range, ?missing, "extending buffer");
                let suffix = self.resource.read(Some(missing)).await?;

                let start = current.range.start;
                let mut data = BytesMut::with_capacity(current.data.len() + suffix.len());
                data.extend_from_slice(&current.data);
                data.extend_from_slice(&suffix);
                let data = data.freeze();

                let result = slice_at(&data, start, &range);
                *buffer = Some(Buffer::trailing(data, start, self.buffer_size));
                return Ok(result);
            }
        }

        let window = range.start..aligned_end;
        trace!(?range, ?window, "filling buffer");
        let data = self.resource.read(Some(window)).await?;
        let result = slice_at(&data, range.start, &range);
        *buffer = if data.is_empty() {
            None
        } else {
            Some(Buffer::trailing(data, range.start, self.buffer_size))
        };
        Ok(result)
    }

    fn close(&self) {
        self.resource.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryResource;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts the reads reaching the wrapped resource.
    struct CountingResource {
        inner: MemoryResource,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Resource for CountingResource {
        fn link(&self) -> &Link {
            self.inner.link()
        }

        async fn length(&self) -> Result<u64, ResourceError> {
            self.inner.length().await
        }

        async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(range).await
        }
    }

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
    }

    fn counting(len: usize) -> (CountingResource, Arc<AtomicUsize>, Vec<u8>) {
        let data = content(len);
        let reads = Arc::new(AtomicUsize::new(0));
        let resource = CountingResource {
            inner: MemoryResource::new(Link::new("/data.bin"), data.clone()),
            reads: Arc::clone(&reads),
        };
        (resource, reads, data)
    }

    #[tokio::test]
    async fn test_forward_reads_match_unbuffered() {
        let (resource, reads, data) = counting(1000);
        let buffered = BufferedResource::new(resource, 64);

        let mut offset = 0_u64;
        let mut naive_reads = 0;
        while offset < 1000 {
            let chunk = buffered.read(Some(offset..offset + 10)).await.unwrap();
            let end = usize::try_from((offset + 10).min(1000)).unwrap();
            assert_eq!(chunk.as_ref(), &data[usize::try_from(offset).unwrap()..end]);
            offset += 10;
            naive_reads += 1;
        }
        let upstream = reads.load(Ordering::SeqCst);
        assert!(upstream < naive_reads, "{upstream} upstream reads");
    }

    #[tokio::test]
    async fn test_read_inside_buffer_does_not_hit_upstream() {
        let (resource, reads, data) = counting(200);
        let buffered = BufferedResource::new(resource, 100);

        assert_eq!(buffered.read(Some(0..10)).await.unwrap().as_ref(), &data[0..10]);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(buffered.read(Some(20..90)).await.unwrap().as_ref(), &data[20..90]);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_overlapping_buffer_end_reads_suffix_once() {
        let (resource, reads, data) = counting(300);
        let buffered = BufferedResource::new(resource, 100);

        buffered.read(Some(0..10)).await.unwrap();
        let chunk = buffered.read(Some(90..150)).await.unwrap();
        assert_eq!(chunk.as_ref(), &data[90..150]);
        assert_eq!(reads.load(Ordering::SeqCst), 2);

        // The buffer now holds the trailing 100 bytes, 100..200.
        assert_eq!(buffered.read(Some(120..200)).await.unwrap().as_ref(), &data[120..200]);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backward_read_refills_buffer() {
        let (resource, reads, data) = counting(300);
        let buffered = BufferedResource::new(resource, 100);

        buffered.read(Some(200..210)).await.unwrap();
        assert_eq!(buffered.read(Some(5..15)).await.unwrap().as_ref(), &data[5..15]);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_whole_read_bypasses_buffer() {
        let (resource, reads, data) = counting(50);
        let buffered = BufferedResource::new(resource, 16);
        assert_eq!(buffered.read(None).await.unwrap().as_ref(), data.as_slice());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(buffered.buffer.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_range_past_end_is_empty_without_io() {
        let (resource, reads, data) = counting(50);
        let buffered = BufferedResource::new(resource, 16);
        assert!(buffered.read(Some(60..80)).await.unwrap().is_empty());
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(buffered.read(Some(40..80)).await.unwrap().as_ref(), &data[40..50]);
    }
}
