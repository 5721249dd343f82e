//! The four operation shapes and their call builders.

use std::path::PathBuf;

use anyhow::Result as AnyResult;
use bytes::Bytes;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{attempt::{run_attempts, OperationShape}, Session};
use crate::{
    error::{Result, TransportError, TransportResult},
    interceptor::Interceptor,
    progress::{OnProgress, OnResumeData},
    request::{Request, ResumeToken, UploadSource},
    response::Response,
    transport::{Transport, TransportContext},
};

struct FetchShape<'a> {
    transport: &'a dyn Transport,
    context: TransportContext,
}

impl OperationShape for FetchShape<'_> {
    type Input = Request;
    type Payload = Bytes;

    fn prepare<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a mut Request,
    ) -> BoxFuture<'a, AnyResult<()>> {
        interceptor.prepare(input)
    }

    fn call<'a>(&'a self, input: &'a Request) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        self.transport.fetch(input, &self.context)
    }

    fn should_retry<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a Request,
        response: &'a mut Response,
        payload: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        interceptor.should_retry(input, response, payload)
    }
}

struct DownloadShape<'a> {
    transport: &'a dyn Transport,
    context: TransportContext,
    destination: Option<PathBuf>,
    on_resume_data: Option<OnResumeData>,
}

impl DownloadShape<'_> {
    fn deliver_resume_data(&self, error: &mut TransportError) {
        if let Some(on_resume_data) = &self.on_resume_data {
            if let Some(resume_token) = error.take_resume_token() {
                on_resume_data(resume_token);
            }
        }
    }
}

impl OperationShape for DownloadShape<'_> {
    type Input = Request;
    type Payload = PathBuf;

    fn prepare<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a mut Request,
    ) -> BoxFuture<'a, AnyResult<()>> {
        interceptor.prepare_download(input)
    }

    fn call<'a>(&'a self, input: &'a Request) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        self.transport.download(input, self.destination.as_deref(), &self.context)
    }

    fn should_retry<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a Request,
        response: &'a mut Response,
        payload: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        interceptor.should_retry_download(input, response, payload)
    }

    fn on_transport_failure(&self, error: &mut TransportError) {
        self.deliver_resume_data(error);
    }
}

struct ResumeShape<'a> {
    transport: &'a dyn Transport,
    context: TransportContext,
    destination: Option<PathBuf>,
    on_resume_data: Option<OnResumeData>,
}

impl ResumeShape<'_> {
    fn deliver_resume_data(&self, error: &mut TransportError) {
        if let Some(on_resume_data) = &self.on_resume_data {
            if let Some(resume_token) = error.take_resume_token() {
                on_resume_data(resume_token);
            }
        }
    }
}

impl OperationShape for ResumeShape<'_> {
    type Input = ResumeToken;
    type Payload = PathBuf;

    fn prepare<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a mut ResumeToken,
    ) -> BoxFuture<'a, AnyResult<()>> {
        interceptor.prepare_resume(input)
    }

    fn call<'a>(&'a self, input: &'a ResumeToken) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        self.transport.resume(input, self.destination.as_deref(), &self.context)
    }

    fn should_retry<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a ResumeToken,
        response: &'a mut Response,
        payload: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        interceptor.should_retry_resumed_download(input, response, payload)
    }

    fn on_transport_failure(&self, error: &mut TransportError) {
        self.deliver_resume_data(error);
    }
}

struct UploadShape<'a> {
    transport: &'a dyn Transport,
    context: TransportContext,
    source: UploadSource,
}

impl OperationShape for UploadShape<'_> {
    type Input = Request;
    type Payload = Bytes;

    fn prepare<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a mut Request,
    ) -> BoxFuture<'a, AnyResult<()>> {
        interceptor.prepare_upload(input, &self.source)
    }

    fn call<'a>(&'a self, input: &'a Request) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        self.transport.upload(input, &self.source, &self.context)
    }

    fn should_retry<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a Request,
        response: &'a mut Response,
        payload: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        interceptor.should_retry_upload(input, &self.source, response, payload)
    }
}

/// Pending fetch. Configure, then [`call`](FetchCall::call).
#[must_use = "configures a call but does not send it; await `call()`"]
pub struct FetchCall<'a> {
    session: &'a Session,
    request: Request,
    cancellation: CancellationToken,
    on_progress: Option<OnProgress>,
}

impl<'a> FetchCall<'a> {
    pub(super) fn new(session: &'a Session, request: Request) -> Self {
        Self {
            session,
            request,
            cancellation: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Ties the call to an external cancellation token.
    #[inline]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Installs a best-effort progress sink.
    #[inline]
    pub fn on_progress(mut self, on_progress: impl Fn(crate::TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(std::sync::Arc::new(on_progress));
        self
    }

    /// Sends the request, returning the final response and its payload.
    pub async fn call(self) -> Result<(Response, Bytes)> {
        let shape = FetchShape {
            transport: self.session.transport(),
            context: TransportContext::new(self.cancellation.clone()).with_progress(self.on_progress),
        };
        run_attempts(
            self.session.interceptors(),
            self.session.maximum_retry_count(),
            &self.cancellation,
            &shape,
            self.request,
        )
        .await
    }
}

/// Pending fresh download. Configure, then [`call`](DownloadCall::call).
#[must_use = "configures a call but does not send it; await `call()`"]
pub struct DownloadCall<'a> {
    session: &'a Session,
    request: Request,
    destination: Option<PathBuf>,
    cancellation: CancellationToken,
    on_progress: Option<OnProgress>,
    on_resume_data: Option<OnResumeData>,
}

impl<'a> DownloadCall<'a> {
    pub(super) fn new(session: &'a Session, request: Request) -> Self {
        Self {
            session,
            request,
            destination: None,
            cancellation: CancellationToken::new(),
            on_progress: None,
            on_resume_data: None,
        }
    }

    /// Requests the finished bytes be placed at `destination` instead of a
    /// fresh temporary path.
    #[inline]
    pub fn to(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Ties the call to an external cancellation token.
    #[inline]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Installs a best-effort progress sink.
    #[inline]
    pub fn on_progress(mut self, on_progress: impl Fn(crate::TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(std::sync::Arc::new(on_progress));
        self
    }

    /// Installs a sink receiving the resume token when the transfer is
    /// interrupted partway.
    #[inline]
    pub fn on_resume_data(mut self, on_resume_data: impl Fn(ResumeToken) + Send + Sync + 'static) -> Self {
        self.on_resume_data = Some(std::sync::Arc::new(on_resume_data));
        self
    }

    /// Runs the download, returning the final response and where the
    /// finished bytes were placed.
    pub async fn call(self) -> Result<(Response, PathBuf)> {
        let shape = DownloadShape {
            transport: self.session.transport(),
            context: TransportContext::new(self.cancellation.clone()).with_progress(self.on_progress),
            destination: self.destination,
            on_resume_data: self.on_resume_data,
        };
        run_attempts(
            self.session.interceptors(),
            self.session.maximum_retry_count(),
            &self.cancellation,
            &shape,
            self.request,
        )
        .await
    }
}

/// Pending resumed download. Configure, then [`call`](ResumeCall::call).
#[must_use = "configures a call but does not send it; await `call()`"]
pub struct ResumeCall<'a> {
    session: &'a Session,
    resume_token: ResumeToken,
    destination: Option<PathBuf>,
    cancellation: CancellationToken,
    on_progress: Option<OnProgress>,
    on_resume_data: Option<OnResumeData>,
}

impl<'a> ResumeCall<'a> {
    pub(super) fn new(session: &'a Session, resume_token: ResumeToken) -> Self {
        Self {
            session,
            resume_token,
            destination: None,
            cancellation: CancellationToken::new(),
            on_progress: None,
            on_resume_data: None,
        }
    }

    /// Requests the finished bytes be placed at `destination` instead of a
    /// fresh temporary path.
    #[inline]
    pub fn to(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Ties the call to an external cancellation token.
    #[inline]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Installs a best-effort progress sink.
    #[inline]
    pub fn on_progress(mut self, on_progress: impl Fn(crate::TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(std::sync::Arc::new(on_progress));
        self
    }

    /// Installs a sink receiving a fresh resume token should this
    /// continuation be interrupted as well.
    #[inline]
    pub fn on_resume_data(mut self, on_resume_data: impl Fn(ResumeToken) + Send + Sync + 'static) -> Self {
        self.on_resume_data = Some(std::sync::Arc::new(on_resume_data));
        self
    }

    /// Continues the download, returning the final response and where the
    /// finished bytes were placed.
    pub async fn call(self) -> Result<(Response, PathBuf)> {
        let shape = ResumeShape {
            transport: self.session.transport(),
            context: TransportContext::new(self.cancellation.clone()).with_progress(self.on_progress),
            destination: self.destination,
            on_resume_data: self.on_resume_data,
        };
        run_attempts(
            self.session.interceptors(),
            self.session.maximum_retry_count(),
            &self.cancellation,
            &shape,
            self.resume_token,
        )
        .await
    }
}

/// Pending upload. Configure, then [`call`](UploadCall::call).
#[must_use = "configures a call but does not send it; await `call()`"]
pub struct UploadCall<'a> {
    session: &'a Session,
    request: Request,
    source: UploadSource,
    cancellation: CancellationToken,
    on_progress: Option<OnProgress>,
}

impl<'a> UploadCall<'a> {
    pub(super) fn new(session: &'a Session, request: Request, source: UploadSource) -> Self {
        Self {
            session,
            request,
            source,
            cancellation: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Ties the call to an external cancellation token.
    #[inline]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Installs a best-effort progress sink.
    #[inline]
    pub fn on_progress(mut self, on_progress: impl Fn(crate::TransferProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(std::sync::Arc::new(on_progress));
        self
    }

    /// Runs the upload, returning the final response and its payload.
    pub async fn call(self) -> Result<(Response, Bytes)> {
        let shape = UploadShape {
            transport: self.session.transport(),
            context: TransportContext::new(self.cancellation.clone()).with_progress(self.on_progress),
            source: self.source,
        };
        run_attempts(
            self.session.interceptors(),
            self.session.maximum_retry_count(),
            &self.cancellation,
            &shape,
            self.request,
        )
        .await
    }
}
