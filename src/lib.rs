//! Interceptor-chain HTTP request pipeline.
//!
//! A [`Session`] owns an ordered list of [`Interceptor`]s, a retry budget and
//! a [`Transport`]. Each operation (fetch, download, resumed download,
//! upload) runs the same template: clone the caller's request, let every
//! interceptor prepare it in registration order, delegate to the transport,
//! then consult the interceptors' retry hooks in reverse order. The first
//! hook that approves a retry (while budget remains) restarts the attempt
//! from the pristine original request.
//!
//! The actual network I/O lives behind the [`Transport`] trait; this crate
//! only coordinates preparation, delegation and retry decisions.

mod error;
mod progress;
mod request;
mod response;

pub mod interceptor;
pub mod session;
pub mod transport;

pub use error::{Error, Result, TransportError, TransportErrorKind, TransportResult};
pub use interceptor::Interceptor;
pub use progress::{OnProgress, OnResumeData, TransferProgress};
pub use request::{Request, RequestBuilder, ResumeToken, UploadSource};
pub use response::{Response, ResponseBuilder};
pub use session::{Session, SessionBuilder};
pub use transport::{Transport, TransportContext};

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
pub use tokio_util::sync::CancellationToken;
