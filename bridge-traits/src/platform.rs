//! Platform-specific helper abstractions used to keep trait bounds aligned with
//! the threading guarantees of each target.
//!
//! Logger sinks are shared with the tracing subscriber, which may emit events
//! from any thread, so they must be `Send + Sync`. PCM sinks carry no such
//! bound: a JNI sink borrows the calling thread's `JNIEnv` and never leaves it.

/// Marker trait that applies `Send + Sync` bounds.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}
