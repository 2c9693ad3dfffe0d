//! Resources held in memory.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Resource, ResourceError, clamp_range};
use crate::link::Link;

/// Resource serving bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemoryResource {
    link: Link,
    data: Bytes,
}

impl MemoryResource {
    /// Creates a resource serving `data`.
    pub fn new(link: Link, data: impl Into<Bytes>) -> Self {
        Self {
            link,
            data: data.into(),
        }
    }
}

#[async_trait]
impl Resource for MemoryResource {
    fn link(&self) -> &Link {
        &self.link
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        Ok(self.data.len() as u64)
    }

    async fn read(&self, range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        let Some(range) = range else {
            return Ok(self.data.clone());
        };
        let range = clamp_range(range, self.data.len() as u64);
        // Clamped to the buffer length, so both ends fit in usize.
        let start = usize::try_from(range.start).unwrap_or(self.data.len());
        let end = usize::try_from(range.end).unwrap_or(self.data.len());
        Ok(self.data.slice(start..end))
    }
}
