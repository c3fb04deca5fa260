use thiserror::Error;

/// An integration mistake detected while setting up a resource or cache.
///
/// These are not runtime failures of the wrapped operations. Those only ever surface through
/// [`Resource::read`](crate::Resource::read). A `MisuseError` means the caller wired things up
/// wrongly and is not meant to be recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MisuseError {
    /// Resources and caches spawn background work and need a tokio runtime to do so.
    #[error("no tokio runtime available, resources must be created from within a runtime")]
    MissingRuntime,
    /// The sweep would have to run continuously.
    #[error("the sweep interval of a resource cache must be greater than zero")]
    ZeroSweepInterval,
}
