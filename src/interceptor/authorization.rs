use std::fmt::{self, Debug};

use anyhow::Result as AnyResult;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::{header::AUTHORIZATION, HeaderName, HeaderValue, StatusCode};
use log::debug;

use super::Interceptor;
use crate::{request::Request, response::Response};

type AuthenticateFn =
    Box<dyn for<'a> Fn(bool, &'a Request) -> BoxFuture<'a, AnyResult<HeaderValue>> + Send + Sync>;

/// Sets an authorization header on outgoing requests and reacts to `401`
/// responses.
///
/// The credential provider is called with `refresh = false` during
/// preparation when the header is absent, and with `refresh = true` after a
/// `401` response; a successful refresh approves one retry, a failed refresh
/// declines (without failing the call).
pub struct AuthorizationInterceptor {
    header_name: HeaderName,
    authenticate: AuthenticateFn,
}

impl AuthorizationInterceptor {
    /// Creates an authorization interceptor filling the `Authorization`
    /// header from the given credential provider.
    #[inline]
    pub fn new(
        authenticate: impl for<'a> Fn(bool, &'a Request) -> BoxFuture<'a, AnyResult<HeaderValue>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            header_name: AUTHORIZATION,
            authenticate: Box::new(authenticate),
        }
    }

    /// Uses a different header for the credential.
    #[inline]
    pub fn header_name(mut self, header_name: HeaderName) -> Self {
        self.header_name = header_name;
        self
    }
}

impl Interceptor for AuthorizationInterceptor {
    fn prepare<'a>(&'a self, request: &'a mut Request) -> BoxFuture<'a, AnyResult<()>> {
        Box::pin(async move {
            if request.header(&self.header_name).is_none() {
                let value = (self.authenticate)(false, request).await?;
                request.headers_mut().insert(self.header_name.to_owned(), value);
            }
            Ok(())
        })
    }

    fn should_retry<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
        _body: &'a mut Bytes,
    ) -> BoxFuture<'a, AnyResult<bool>> {
        Box::pin(async move {
            if response.status_code() != StatusCode::UNAUTHORIZED {
                return Ok(false);
            }
            match (self.authenticate)(true, request).await {
                Ok(_) => Ok(true),
                Err(err) => {
                    debug!("credential refresh after 401 failed, not retrying: {}", err);
                    Ok(false)
                }
            }
        })
    }
}

impl Debug for AuthorizationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationInterceptor")
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}
