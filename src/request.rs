use std::{
    fmt::{self, Debug},
    path::PathBuf,
};

use bytes::Bytes;
use http::{header::IntoHeaderName, HeaderMap, HeaderValue, Method, Uri};

/// HTTP request value handed to prepare hooks and the transport.
///
/// The session clones the caller's request once per attempt; prepare hooks
/// mutate that working copy, never the original, so a retried attempt always
/// starts from what the caller supplied.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// Creates a request builder.
    #[inline]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Creates a `GET` request for the given URL.
    #[inline]
    pub fn get(url: Uri) -> Self {
        Self::builder().url(url).build()
    }

    /// Gets the HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Gets the HTTP method mutably.
    #[inline]
    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    /// Gets the request URL.
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Gets the request URL mutably.
    #[inline]
    pub fn url_mut(&mut self) -> &mut Uri {
        &mut self.url
    }

    /// Gets the request headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the request headers mutably.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Gets a single header value, if present.
    #[inline]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Gets the request body, if any.
    #[inline]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Replaces the request body.
    #[inline]
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }
}

impl From<Uri> for Request {
    #[inline]
    fn from(url: Uri) -> Self {
        Self::get(url)
    }
}

/// Builder for [`Request`].
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Default for RequestBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: Uri::default(),
            headers: Default::default(),
            body: None,
        }
    }
}

impl RequestBuilder {
    /// Sets the HTTP method.
    #[inline]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request URL.
    #[inline]
    pub fn url(mut self, url: Uri) -> Self {
        self.url = url;
        self
    }

    /// Replaces all request headers.
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a request header.
    #[inline]
    pub fn header(mut self, name: impl IntoHeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body.
    #[inline]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the request.
    #[inline]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Opaque state allowing a failed or cancelled download to be continued
/// without restarting from byte zero.
///
/// The pipeline never parses the token; it is produced by a transport,
/// possibly rewritten by `prepare_resume` hooks, and handed back to the same
/// transport's resume primitive.
#[derive(Clone, PartialEq, Eq)]
pub struct ResumeToken(Bytes);

impl ResumeToken {
    /// Wraps raw resume state.
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Gets the raw resume state.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the raw resume state.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for ResumeToken {
    #[inline]
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<Vec<u8>> for ResumeToken {
    #[inline]
    fn from(data: Vec<u8>) -> Self {
        Self(data.into())
    }
}

impl Debug for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeToken").field("len", &self.0.len()).finish()
    }
}

/// Payload handed to an upload, either already in memory or on disk.
///
/// Upload hooks observe the source but never mutate it.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum UploadSource {
    /// Upload from an in-memory buffer.
    Bytes(Bytes),

    /// Upload from a file on disk.
    File(PathBuf),
}

impl UploadSource {
    /// Gets the in-memory buffer, if this source is one.
    #[inline]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::File(_) => None,
        }
    }

    /// Gets the file path, if this source is one.
    #[inline]
    pub fn as_file(&self) -> Option<&std::path::Path> {
        match self {
            Self::Bytes(_) => None,
            Self::File(path) => Some(path),
        }
    }
}
