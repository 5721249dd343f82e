use std::{error, fmt, io::Error as IoError};

use crate::request::ResumeToken;

/// Result of a pipeline operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Result of a single transport primitive.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Failure of a pipeline operation.
///
/// Nothing is absorbed by the orchestrator: every hook failure, transport
/// failure and cancellation surfaces here with its cause preserved. Budget
/// exhaustion is not an error; it merely lets the last response stand.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The call observed its cancellation token at a checkpoint.
    #[error("the call was cancelled")]
    Cancelled,

    /// A prepare hook failed; the transport was not invoked for this attempt.
    #[error("interceptor failed while preparing the request: {0}")]
    Prepare(anyhow::Error),

    /// A retry-decision hook failed. Distinct from a hook declining a retry;
    /// this aborts the call regardless of remaining budget.
    #[error("interceptor failed while judging the response: {0}")]
    RetryDecision(anyhow::Error),

    /// The transport produced neither a response nor resumable state.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Whether this error is a cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Transport failure categories.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportErrorKind {
    /// Network connection failed.
    ConnectError,

    /// The attempt timed out.
    TimeoutError,

    /// Sending the request failed.
    SendError,

    /// Receiving the response failed.
    ReceiveError,

    /// Local I/O failed (e.g. staging file for a download).
    LocalIoError,

    /// The transport observed the call's cancellation while in flight.
    UserCanceled,

    /// Anything else.
    UnknownError,
}

/// Hard failure raised by a [`Transport`](crate::Transport) when no usable
/// response could be produced.
///
/// Interrupted downloads attach a best-effort [`ResumeToken`]; the session
/// delivers it to the caller's resume-data sink before the error propagates.
#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
    error: Box<dyn error::Error + Send + Sync>,
    resume_token: Option<ResumeToken>,
}

impl TransportError {
    /// Creates a transport error.
    #[inline]
    pub fn new(kind: TransportErrorKind, err: impl Into<Box<dyn error::Error + Send + Sync>>) -> Self {
        Self {
            kind,
            error: err.into(),
            resume_token: None,
        }
    }

    /// Creates a transport error from a plain message.
    #[inline]
    pub fn new_with_msg(kind: TransportErrorKind, msg: impl Into<String>) -> Self {
        Self::new(kind, msg.into())
    }

    /// Attaches resumable download state to this error.
    #[inline]
    pub fn with_resume_token(mut self, token: ResumeToken) -> Self {
        self.resume_token = Some(token);
        self
    }

    /// Gets the failure category.
    #[inline]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Gets the attached resume token, if any.
    #[inline]
    pub fn resume_token(&self) -> Option<&ResumeToken> {
        self.resume_token.as_ref()
    }

    /// Removes and returns the attached resume token.
    #[inline]
    pub fn take_resume_token(&mut self) -> Option<ResumeToken> {
        self.resume_token.take()
    }

    /// Unwraps the underlying cause.
    #[inline]
    pub fn into_inner(self) -> Box<dyn error::Error + Send + Sync> {
        self.error
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failed ({:?}): {}", self.kind, self.error)
    }
}

impl error::Error for TransportError {
    #[inline]
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<IoError> for TransportError {
    #[inline]
    fn from(err: IoError) -> Self {
        Self::new(TransportErrorKind::LocalIoError, err)
    }
}
