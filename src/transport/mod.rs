use std::{fmt::Debug, path::Path, path::PathBuf};

use auto_impl::auto_impl;
use bytes::Bytes;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::{
    error::TransportResult,
    progress::{OnProgress, TransferProgress},
    request::{Request, ResumeToken, UploadSource},
    response::Response,
};

mod destination;

pub use destination::{publish, staging_path_for};

/// Per-call context handed to every transport primitive.
///
/// Carries the call's cancellation token, which the transport must observe
/// by aborting in-flight I/O, and the caller's optional progress sink.
#[derive(Clone)]
pub struct TransportContext {
    cancellation: CancellationToken,
    on_progress: Option<OnProgress>,
}

impl TransportContext {
    /// Creates a context for the given cancellation token.
    #[inline]
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            on_progress: None,
        }
    }

    /// Attaches a progress sink.
    #[inline]
    pub fn with_progress(mut self, on_progress: Option<OnProgress>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Gets the call's cancellation token.
    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the call has been cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Reports progress to the caller's sink, if one was supplied.
    ///
    /// Best effort: never blocks, never fails, never gates the transfer.
    #[inline]
    pub fn progress(&self, progress: TransferProgress) {
        if let Some(on_progress) = &self.on_progress {
            on_progress(progress);
        }
    }
}

impl Debug for TransportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext")
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("has_progress_sink", &self.on_progress.is_some())
            .finish()
    }
}

/// The component performing actual network I/O for one attempt.
///
/// Implement this over an HTTP stack of choice; the session never opens
/// sockets itself. Contract, uniform across the four primitives:
///
/// - An error status that still produced a response envelope is returned as
///   `Ok`; the interceptor chain judges whether to retry it. `Err` means no
///   usable response existed and is propagated by the session without retry.
/// - When the context's cancellation fires mid-transfer, abort and return a
///   [`TransportErrorKind::UserCanceled`](crate::TransportErrorKind) error;
///   downloads attach a best-effort [`ResumeToken`] to it first.
/// - Completed downloads must atomically place the finished bytes at the
///   requested destination (or a fresh temporary path when `destination` is
///   `None`), with no partial file ever visible there; see
///   [`staging_path_for`] and [`publish`].
///
/// Implementations must be safe for concurrent use.
#[auto_impl(&, Box, Arc)]
pub trait Transport: Debug + Send + Sync {
    /// Executes one request, buffering the response payload in memory.
    fn fetch<'a>(
        &'a self,
        request: &'a Request,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>>;

    /// Downloads one request's payload to `destination` (or a fresh
    /// temporary path), returning where the finished bytes were placed.
    fn download<'a>(
        &'a self,
        request: &'a Request,
        destination: Option<&'a Path>,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>>;

    /// Continues an interrupted download from its resume token.
    fn resume<'a>(
        &'a self,
        resume_token: &'a ResumeToken,
        destination: Option<&'a Path>,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>>;

    /// Uploads a payload, buffering the response payload in memory.
    fn upload<'a>(
        &'a self,
        request: &'a Request,
        source: &'a UploadSource,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>>;
}
