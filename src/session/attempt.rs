//! The retry/cancellation template shared by all operation shapes.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use futures::future::BoxFuture;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result, TransportError, TransportErrorKind, TransportResult},
    interceptor::Interceptor,
    response::Response,
};

/// One operation shape (fetch, fresh download, resumed download, upload),
/// expressed as the three points where the template dispatches differently:
/// which prepare hook to run, which transport primitive to call, which
/// retry hook to consult.
pub(super) trait OperationShape: Sync {
    /// What an attempt starts from: a request, or a resume token.
    type Input: Clone + Send + Sync;

    /// What a completed attempt yields besides the response envelope.
    type Payload: Send;

    fn prepare<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a mut Self::Input,
    ) -> BoxFuture<'a, AnyResult<()>>;

    fn call<'a>(&'a self, input: &'a Self::Input)
        -> BoxFuture<'a, TransportResult<(Response, Self::Payload)>>;

    fn should_retry<'a>(
        &'a self,
        interceptor: &'a dyn Interceptor,
        input: &'a Self::Input,
        response: &'a mut Response,
        payload: &'a mut Self::Payload,
    ) -> BoxFuture<'a, AnyResult<bool>>;

    /// Last look at a hard transport failure before it propagates; download
    /// shapes salvage the resume token for the caller's sink here.
    fn on_transport_failure(&self, error: &mut TransportError) {
        let _ = error;
    }
}

#[inline]
fn checkpoint(cancellation: &CancellationToken) -> Result<()> {
    if cancellation.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs one top-level call: attempts until success, a hard failure, or the
/// retry budget forecloses further attempts.
///
/// Every attempt starts from a fresh clone of `original`, so prepare-hook
/// mutations never accumulate across retries. Cancellation is polled at
/// fixed checkpoints only; a request to cancel between checkpoints takes
/// effect at the next one, never mid-hook.
pub(super) async fn run_attempts<S: OperationShape>(
    interceptors: &[Arc<dyn Interceptor>],
    maximum_retry_count: usize,
    cancellation: &CancellationToken,
    shape: &S,
    original: S::Input,
) -> Result<(Response, S::Payload)> {
    let mut budget = maximum_retry_count;
    'attempt: loop {
        checkpoint(cancellation)?;

        let mut input = original.clone();
        for interceptor in interceptors {
            shape
                .prepare(interceptor.as_ref(), &mut input)
                .await
                .map_err(Error::Prepare)?;
        }

        // Preparation may have been slow (e.g. a credential refresh).
        checkpoint(cancellation)?;

        let (mut response, mut payload) = match shape.call(&input).await {
            Ok(outcome) => outcome,
            Err(mut error) => {
                shape.on_transport_failure(&mut error);
                return Err(if error.kind() == TransportErrorKind::UserCanceled {
                    Error::Cancelled
                } else {
                    Error::Transport(error)
                });
            }
        };

        checkpoint(cancellation)?;

        // Reverse order: the interceptor closest to the wire judges first.
        // The first approval wins the pass; the rest are not consulted.
        for interceptor in interceptors.iter().rev() {
            let retry = shape
                .should_retry(interceptor.as_ref(), &input, &mut response, &mut payload)
                .await
                .map_err(Error::RetryDecision)?;
            if retry {
                if budget > 0 {
                    budget -= 1;
                    debug!("interceptor approved a retry, {} left in budget", budget);
                    checkpoint(cancellation)?;
                    continue 'attempt;
                }
                debug!("retry approved but budget exhausted, keeping the response");
            }
        }

        checkpoint(cancellation)?;

        return Ok((response, payload));
    }
}
