//! Resources standing for a failed lookup.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Resource, ResourceError};
use crate::link::Link;

/// Resource failing every operation with the same error.
///
/// Fetchers return it for links they cannot resolve, so that the failure
/// surfaces when the resource is actually used.
#[derive(Debug, Clone)]
pub struct FailureResource {
    link: Link,
    error: ResourceError,
}

impl FailureResource {
    /// Creates a resource failing with `error`.
    #[must_use]
    pub fn new(link: Link, error: ResourceError) -> Self {
        Self { link, error }
    }

    /// Creates a resource failing with [`ResourceError::NotFound`].
    #[must_use]
    pub fn not_found(link: Link) -> Self {
        Self::new(link, ResourceError::NotFound)
    }

    /// Returns the error reported by this resource.
    #[must_use]
    pub fn error(&self) -> &ResourceError {
        &self.error
    }
}

#[async_trait]
impl Resource for FailureResource {
    fn link(&self) -> &Link {
        &self.link
    }

    async fn length(&self) -> Result<u64, ResourceError> {
        Err(self.error.clone())
    }

    async fn read(&self, _range: Option<Range<u64>>) -> Result<Bytes, ResourceError> {
        Err(self.error.clone())
    }
}
