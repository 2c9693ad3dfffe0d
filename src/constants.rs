//! Shared defaults for HTTP timeouts, buffering and request recovery.

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large resources).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default chunk size kept in memory by a `BufferedResource` (256 KiB).
pub const DEFAULT_BUFFER_SIZE: u64 = 256 * 1024;

/// Maximum number of replacement requests accepted from a client delegate
/// for a single logical request.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Media type of RFC 7807 problem details payloads.
pub const PROBLEM_DETAILS_MEDIA_TYPE: &str = "application/problem+json";
