use http::{header::IntoHeaderName, HeaderMap, HeaderValue, StatusCode};

/// HTTP response envelope.
///
/// Carries status and headers only; the payload (in-memory bytes for fetch
/// and upload, a destination path for download) travels separately so the
/// retry-decision phase can transform either independently.
#[derive(Clone, Debug, Default)]
pub struct Response {
    status_code: StatusCode,
    headers: HeaderMap,
}

impl Response {
    /// Creates a response builder.
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Gets the status code.
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Gets the status code mutably.
    #[inline]
    pub fn status_code_mut(&mut self) -> &mut StatusCode {
        &mut self.status_code
    }

    /// Gets the response headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the response headers mutably.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Gets a single header value, if present.
    #[inline]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }
}

/// Builder for [`Response`], used by transports and test doubles.
#[derive(Clone, Debug, Default)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    /// Sets the status code.
    #[inline]
    pub fn status_code(mut self, status_code: StatusCode) -> Self {
        self.inner.status_code = status_code;
        self
    }

    /// Adds a response header.
    #[inline]
    pub fn header(mut self, name: impl IntoHeaderName, value: HeaderValue) -> Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// Builds the response.
    #[inline]
    pub fn build(self) -> Response {
        self.inner
    }
}
