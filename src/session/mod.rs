//! The request pipeline: an interceptor chain, a retry budget and a
//! transport, driven by one shared attempt loop.

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use bytes::Bytes;

use crate::{
    interceptor::Interceptor,
    request::{Request, ResumeToken, UploadSource},
    transport::Transport,
};

mod attempt;
mod ops;

pub use ops::{DownloadCall, FetchCall, ResumeCall, UploadCall};

/// Sends requests through an ordered interceptor chain over a transport,
/// retrying on demand within a per-call budget.
///
/// Cheap to clone; clones share the transport and the chain. Configuration
/// is immutable once built, so a session is safe to use from many tasks at
/// once.
#[derive(Clone, Debug)]
pub struct Session {
    transport: Arc<dyn Transport>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    maximum_retry_count: usize,
}

impl Session {
    /// Creates a session over the given transport with no interceptors and
    /// the default retry budget of one.
    #[inline]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    /// Creates a session builder over the given transport.
    #[inline]
    pub fn builder(transport: impl Transport + 'static) -> SessionBuilder {
        SessionBuilder {
            transport: Arc::new(transport),
            interceptors: Vec::new(),
            maximum_retry_count: 1,
        }
    }

    /// Gets the per-call retry budget.
    #[inline]
    pub fn maximum_retry_count(&self) -> usize {
        self.maximum_retry_count
    }

    pub(super) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub(super) fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Starts a fetch of the given request.
    #[inline]
    pub fn fetch(&self, request: impl Into<Request>) -> FetchCall<'_> {
        FetchCall::new(self, request.into())
    }

    /// Starts a fresh download of the given request's payload.
    #[inline]
    pub fn download(&self, request: impl Into<Request>) -> DownloadCall<'_> {
        DownloadCall::new(self, request.into())
    }

    /// Continues an interrupted download from its resume token.
    #[inline]
    pub fn resume(&self, resume_token: impl Into<ResumeToken>) -> ResumeCall<'_> {
        ResumeCall::new(self, resume_token.into())
    }

    /// Starts an upload of an in-memory payload.
    #[inline]
    pub fn upload(&self, request: impl Into<Request>, body: impl Into<Bytes>) -> UploadCall<'_> {
        UploadCall::new(self, request.into(), UploadSource::Bytes(body.into()))
    }

    /// Starts an upload of a file on disk.
    #[inline]
    pub fn upload_file(&self, request: impl Into<Request>, file: impl Into<PathBuf>) -> UploadCall<'_> {
        UploadCall::new(self, request.into(), UploadSource::File(file.into()))
    }
}

/// Builder for [`Session`].
#[derive(Debug)]
pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    maximum_retry_count: usize,
}

impl SessionBuilder {
    /// Appends an interceptor to the chain.
    ///
    /// Registration order matters: prepare hooks run first-to-last, retry
    /// hooks last-to-first.
    #[inline]
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends already-shared interceptors to the chain.
    #[inline]
    pub fn interceptors(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// Sets how many retries one call may consume. Zero disables retrying
    /// entirely; the first attempt always runs.
    #[inline]
    pub fn maximum_retry_count(mut self, maximum_retry_count: usize) -> Self {
        self.maximum_retry_count = maximum_retry_count;
        self
    }

    /// Builds the session.
    #[inline]
    pub fn build(self) -> Session {
        Session {
            transport: self.transport,
            interceptors: self.interceptors.into(),
            maximum_retry_count: self.maximum_retry_count,
        }
    }
}
