use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;

use crate::MisuseError;

/// The underlying operation, shared between the driver task and every reader.
type Operation<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// The settlement state of a [`Resource`].
///
/// Transitions are one-way: a resource starts out [`Pending`](Self::Pending) and moves to
/// either terminal state exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// The operation is still running.
    Pending,
    /// The operation completed successfully.
    Resolved,
    /// The operation failed.
    Rejected,
}

/// A non-blocking handle to the eventual outcome of a single asynchronous operation.
///
/// The operation is spawned onto a tokio runtime as soon as the resource is created and runs
/// to completion regardless of whether anyone reads it, or whether all handles are dropped
/// in the meantime. Cloning a resource is cheap, and all clones observe the same operation.
///
/// `T` and `E` are cloned out on every successful or failed [`read`](Self::read), so values
/// that are expensive to clone should be wrapped in an [`Arc`](std::sync::Arc).
///
/// An operation that panics is a bug in the caller: the panic is propagated to everyone
/// reading or awaiting the resource afterwards.
pub struct Resource<T, E> {
    operation: Operation<T, E>,
}

impl<T, E> Clone for Resource<T, E> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
        }
    }
}

impl<T, E> Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Starts `operation` on the current tokio runtime and wraps it.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime, just like [`tokio::spawn`].
    /// Use [`try_new`](Self::try_new) to get an error instead.
    pub fn new<F>(operation: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::spawn_on(&Handle::current(), operation)
    }

    /// Starts `operation` on the current tokio runtime, if there is one.
    pub fn try_new<F>(operation: F) -> Result<Self, MisuseError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| MisuseError::MissingRuntime)?;
        Ok(Self::spawn_on(&runtime, operation))
    }

    /// Starts `operation` on the given runtime and wraps it.
    pub fn spawn_on<F>(runtime: &Handle, operation: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let operation = operation.boxed().shared();
        // The driver task is detached on purpose: the operation outlives every reader.
        runtime.spawn(operation.clone().map(drop));
        Self { operation }
    }

    /// Creates a resource that has already resolved to `value`.
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates a resource that has already been rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self::settled(Err(error))
    }

    fn settled(result: Result<T, E>) -> Self {
        let operation = future::ready(result).boxed().shared();
        // `Shared` only records the output once it has been polled to completion.
        let output = operation.clone().now_or_never();
        debug_assert!(output.is_some());
        Self { operation }
    }

    /// Returns the current state of the operation.
    pub fn status(&self) -> ResourceStatus {
        match self.operation.peek() {
            None => ResourceStatus::Pending,
            Some(Ok(_)) => ResourceStatus::Resolved,
            Some(Err(_)) => ResourceStatus::Rejected,
        }
    }

    /// Reads the outcome of the operation without blocking.
    ///
    /// While the operation is running this returns [`Read::Pending`] with a handle that
    /// completes once the operation settled. Reading never starts or drives any work.
    pub fn read(&self) -> Read<T, E> {
        match self.operation.peek() {
            None => Read::Pending(Suspended {
                operation: self.operation.clone(),
            }),
            Some(Ok(value)) => Read::Ready(value.clone()),
            Some(Err(error)) => Read::Failed(error.clone()),
        }
    }

    /// Waits for the operation to settle and returns its outcome.
    ///
    /// This is the suspend-and-retry loop a renderer would run around [`read`](Self::read).
    pub async fn wait(&self) -> Result<T, E> {
        loop {
            match self.read() {
                Read::Ready(value) => return Ok(value),
                Read::Failed(error) => return Err(error),
                Read::Pending(suspended) => suspended.await,
            }
        }
    }

    /// Returns `true` if both handles refer to the same resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.operation, &other.operation)
    }
}

impl<T, E> fmt::Debug for Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("status", &self.status())
            .finish()
    }
}

/// The outcome of [`Resource::read`].
#[must_use]
pub enum Read<T, E> {
    /// The operation resolved to this value.
    Ready(T),
    /// The operation is still running.
    ///
    /// Await the [`Suspended`] handle and read again afterwards.
    Pending(Suspended<T, E>),
    /// The operation failed with this reason.
    Failed(E),
}

impl<T, E> Read<T, E> {
    /// Whether the operation resolved.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether the operation is still running.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Whether the operation failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the resolved value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Converts a settled read into a [`Result`], or `None` while pending.
    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            Self::Ready(value) => Some(Ok(value)),
            Self::Failed(error) => Some(Err(error)),
            Self::Pending(_) => None,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Read<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(suspended) => f.debug_tuple("Pending").field(suspended).finish(),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

/// The recoverable "not ready yet" signal of a [`Resource`].
///
/// This future refers to the same operation as the resource it was read from and completes
/// once that operation has settled. It does not yield the outcome itself, callers are
/// expected to [`read`](Resource::read) the resource again.
#[must_use = "a suspension does nothing unless awaited"]
pub struct Suspended<T, E> {
    operation: Operation<T, E>,
}

impl<T: Clone, E: Clone> Future for Suspended<T, E> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.operation.poll_unpin(cx).map(drop)
    }
}

impl<T, E> fmt::Debug for Suspended<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspended").finish_non_exhaustive()
    }
}
