use std::path::PathBuf;

use anyhow::Result as AnyResult;
use bytes::Bytes;
use futures::future::BoxFuture;
use log::{log, Level};

use super::Interceptor;
use crate::{
    request::{Request, ResumeToken, UploadSource},
    response::Response,
};

/// Logs outgoing requests and completed responses through the `log` crate.
///
/// Never votes on retries and never fails.
#[derive(Clone, Copy, Debug)]
pub struct LoggerInterceptor {
    level: Level,
}

impl LoggerInterceptor {
    /// Creates a logging interceptor at the given level.
    #[inline]
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for LoggerInterceptor {
    #[inline]
    fn default() -> Self {
        Self::new(Level::Debug)
    }
}

impl Interceptor for LoggerInterceptor {
    fn prepare<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        log!(self.level, "sending {} {}", request.method(), request.url());
        Box::pin(async { Ok(()) })
    }

    fn prepare_download<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        log!(self.level, "downloading {} {}", request.method(), request.url());
        Box::pin(async { Ok(()) })
    }

    fn prepare_resume<'a>(&'a self, resume_token: &'a mut ResumeToken) -> BoxFuture<'a, AnyResult<()>> {
        log!(self.level, "resuming download from {} bytes of resume state", resume_token.as_bytes().len());
        Box::pin(async { Ok(()) })
    }

    fn prepare_upload<'a>(
        &'a self,
        request: &'a mut Request,
        source: &'a UploadSource,
    ) -> BoxFuture<'a, AnyResult<()>> {
        log!(self.level, "uploading {:?} to {} {}", source, request.method(), request.url());
        Box::pin(async { Ok(()) })
    }

    fn should_retry<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        log!(
            self.level,
            "received {} from {} {} with {} bytes",
            response.status_code(),
            request.method(),
            request.url(),
            body.len(),
        );
        Box::pin(async { Ok(false) })
    }

    fn should_retry_download<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        log!(
            self.level,
            "received {} from {} {}, payload at {}",
            response.status_code(),
            request.method(),
            request.url(),
            destination.display(),
        );
        Box::pin(async { Ok(false) })
    }

    fn should_retry_resumed_download<'a>(
        &'a self,
        _resume_token: &'a ResumeToken,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        log!(
            self.level,
            "resumed download finished with {}, payload at {}",
            response.status_code(),
            destination.display(),
        );
        Box::pin(async { Ok(false) })
    }

    fn should_retry_upload<'a>(
        &'a self,
        request: &'a Request,
        _source: &'a UploadSource,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        log!(
            self.level,
            "upload to {} {} finished with {} and {} response bytes",
            request.method(),
            request.url(),
            response.status_code(),
            body.len(),
        );
        Box::pin(async { Ok(false) })
    }
}
