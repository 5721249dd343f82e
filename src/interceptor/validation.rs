use std::{fmt::{self, Debug}, fs, path::PathBuf};

use anyhow::Result as AnyResult;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::StatusCode;

use super::Interceptor;
use crate::{
    request::{Request, ResumeToken, UploadSource},
    response::Response,
};

/// Raised by [`ValidationInterceptor`] when a response fails validation.
///
/// Carries the offending response and its materialized payload. For
/// downloads, the bytes are read back from the destination so callers can
/// inspect an error body that was written to disk.
#[derive(Debug, thiserror::Error)]
#[error("response failed validation with status {}", .response.status_code())]
pub struct ValidationError {
    response: Response,
    body: Bytes,
}

impl ValidationError {
    /// Gets the offending response.
    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Gets the materialized payload.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

type ValidateFn = Box<dyn Fn(&Response) -> bool + Send + Sync>;
type MakeErrorFn = Box<dyn Fn(&Response, &Bytes) -> anyhow::Error + Send + Sync>;

/// Fails the call when a response is unacceptable.
///
/// A validation failure is a hook *error*, not a retry vote: it aborts the
/// call immediately. Register this interceptor last so it is consulted first
/// in the reverse-order retry pass, before outer policy interceptors react.
///
/// The produced error defaults to [`ValidationError`] and can be replaced
/// with [`error_with`](ValidationInterceptor::error_with).
pub struct ValidationInterceptor {
    is_valid: ValidateFn,
    make_error: MakeErrorFn,
}

impl ValidationInterceptor {
    /// Creates a validation interceptor from an arbitrary predicate.
    #[inline]
    pub fn with(is_valid: impl Fn(&Response) -> bool + Send + Sync + 'static) -> Self {
        Self {
            is_valid: Box::new(is_valid),
            make_error: Box::new(|response, body| {
                ValidationError {
                    response: response.to_owned(),
                    body: body.to_owned(),
                }
                .into()
            }),
        }
    }

    /// Accepts only the given status codes.
    pub fn statuses(accept: impl Fn(StatusCode) -> bool + Send + Sync + 'static) -> Self {
        Self::with(move |response| accept(response.status_code()))
    }

    /// Replaces the error produced on validation failure.
    #[inline]
    pub fn error_with(
        mut self,
        make_error: impl Fn(&Response, &Bytes) -> anyhow::Error + Send + Sync + 'static,
    ) -> Self {
        self.make_error = Box::new(make_error);
        self
    }

    fn check(&self, response: &Response, body: &Bytes) -> AnyResult<bool> {
        if (self.is_valid)(response) {
            Ok(false)
        } else {
            Err((self.make_error)(response, body))
        }
    }

    fn check_destination(&self, response: &Response, destination: &PathBuf) -> AnyResult<bool> {
        if (self.is_valid)(response) {
            Ok(false)
        } else {
            let body = fs::read(destination).unwrap_or_default().into();
            Err((self.make_error)(response, &body))
        }
    }
}

impl Default for ValidationInterceptor {
    /// Accepts 2xx status codes.
    #[inline]
    fn default() -> Self {
        Self::statuses(|status| status.is_success())
    }
}

impl Interceptor for ValidationInterceptor {
    fn should_retry<'a>(
        &'a self,
        _request: &'a Request,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let result = self.check(response, body);
        Box::pin(async { result })
    }

    fn should_retry_download<'a>(
        &'a self,
        _request: &'a Request,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let result = self.check_destination(response, destination);
        Box::pin(async { result })
    }

    fn should_retry_resumed_download<'a>(
        &'a self,
        _resume_token: &'a ResumeToken,
        response: &'a mut Response,
        destination: &'a mut PathBuf,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let result = self.check_destination(response, destination);
        Box::pin(async { result })
    }

    fn should_retry_upload<'a>(
        &'a self,
        _request: &'a Request,
        _source: &'a UploadSource,
        response: &'a mut Response,
        body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        let result = self.check(response, body);
        Box::pin(async { result })
    }
}

impl Debug for ValidationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationInterceptor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_gateway() -> Response {
        Response::builder().status_code(StatusCode::BAD_GATEWAY).build()
    }

    #[tokio::test]
    async fn test_default_error_carries_response_and_body() {
        let interceptor = ValidationInterceptor::default();
        let request = Request::get("http://fake.example/data".parse().unwrap());
        let mut response = bad_gateway();
        let mut body = Bytes::from_static(b"oops");

        let err = interceptor
            .should_retry(&request, &mut response, &mut body)
            .await
            .unwrap_err();
        let validation = err.downcast_ref::<ValidationError>().unwrap();
        assert_eq!(validation.response().status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(validation.body().as_ref(), b"oops");
    }

    #[tokio::test]
    async fn test_error_factory_replaces_the_default_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("payload rejected with {0}")]
        struct Rejected(StatusCode);

        let interceptor = ValidationInterceptor::default()
            .error_with(|response, _body| Rejected(response.status_code()).into());
        let request = Request::get("http://fake.example/data".parse().unwrap());
        let mut response = bad_gateway();
        let mut body = Bytes::new();

        let err = interceptor
            .should_retry(&request, &mut response, &mut body)
            .await
            .unwrap_err();
        let rejected = err.downcast_ref::<Rejected>().unwrap();
        assert_eq!(rejected.0, StatusCode::BAD_GATEWAY);
    }
}
