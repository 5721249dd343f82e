//! End-to-end exercises of the pipeline over file-backed test transports.

use std::{
    fs,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering::Relaxed},
        Arc, Mutex,
    },
};

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::Notify;
use http_session::{
    transport::{publish, staging_path_for},
    CancellationToken, Error, HeaderMap, Request, Response, ResumeToken, Session, StatusCode,
    TransferProgress, Transport, TransportContext, TransportError, TransportErrorKind,
    TransportResult, UploadSource,
};

fn env_logger_init() {
    env_logger::builder().is_test(true).try_init().ok();
}

fn request() -> Request {
    Request::get("http://fake.example/data".parse().unwrap())
}

const PAYLOAD: &[u8] = b"the quick brown fox jumps over the lazy dog";

/// Serves a fixed payload in chunks, supporting interruption partway and
/// continuation from the partial bytes carried in the resume token.
#[derive(Debug)]
struct ChunkedFileTransport {
    payload: Bytes,
    chunk_size: usize,
    interrupt_after: Option<usize>,
    interrupted: AtomicBool,
    resumes: AtomicUsize,
}

impl ChunkedFileTransport {
    fn new(chunk_size: usize) -> Self {
        Self {
            payload: Bytes::from_static(PAYLOAD),
            chunk_size,
            interrupt_after: None,
            interrupted: AtomicBool::new(false),
            resumes: AtomicUsize::new(0),
        }
    }

    /// Drops the (first) connection once at least `bytes` have been served.
    fn interrupt_after(mut self, bytes: usize) -> Self {
        self.interrupt_after = Some(bytes);
        self
    }

    fn serve<'a>(
        &'a self,
        already_served: usize,
        destination: Option<&'a Path>,
        context: &'a TransportContext,
    ) -> TransportResult<(Response, PathBuf)> {
        let total = self.payload.len();
        let staging = staging_path_for(destination)?;
        let mut file = File::create(&staging)?;
        file.write_all(&self.payload[..already_served])?;

        let mut served = already_served;
        while served < total {
            if context.is_cancelled() {
                drop(file);
                fs::remove_file(&staging).ok();
                return Err(TransportError::new_with_msg(
                    TransportErrorKind::UserCanceled,
                    "transfer cancelled",
                )
                .with_resume_token(ResumeToken::new(self.payload.slice(..served))));
            }
            if let Some(limit) = self.interrupt_after {
                if served >= limit && !self.interrupted.swap(true, Relaxed) {
                    drop(file);
                    fs::remove_file(&staging).ok();
                    return Err(TransportError::new_with_msg(
                        TransportErrorKind::ReceiveError,
                        "connection reset",
                    )
                    .with_resume_token(ResumeToken::new(self.payload.slice(..served))));
                }
            }
            let next = (served + self.chunk_size).min(total);
            file.write_all(&self.payload[served..next])?;
            served = next;
            context.progress(TransferProgress::new(served as u64, Some(total as u64)));
        }

        drop(file);
        let placed = publish(&staging, destination)?;
        Ok((Response::builder().status_code(StatusCode::OK).build(), placed))
    }
}

impl Transport for ChunkedFileTransport {
    fn fetch<'a>(
        &'a self,
        _request: &'a Request,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }

    fn download<'a>(
        &'a self,
        _request: &'a Request,
        destination: Option<&'a Path>,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        Box::pin(async move { self.serve(0, destination, context) })
    }

    fn resume<'a>(
        &'a self,
        resume_token: &'a ResumeToken,
        destination: Option<&'a Path>,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        Box::pin(async move {
            self.resumes.fetch_add(1, Relaxed);
            if !self.payload.starts_with(resume_token.as_bytes()) {
                return Err(TransportError::new_with_msg(
                    TransportErrorKind::UnknownError,
                    "unrecognized resume state",
                ));
            }
            self.serve(resume_token.as_bytes().len(), destination, context)
        })
    }

    fn upload<'a>(
        &'a self,
        _request: &'a Request,
        _source: &'a UploadSource,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }
}

#[tokio::test]
async fn test_download_is_placed_atomically_at_the_destination() -> anyhow::Result<()> {
    env_logger_init();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let session = Session::new(ChunkedFileTransport::new(7));

    let (response, placed) = session.download(request()).to(&destination).call().await?;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(placed, destination);
    assert_eq!(fs::read(&destination)?, PAYLOAD);

    // The staging file was renamed away, not copied: the directory holds
    // exactly the finished file.
    let entries: Vec<_> = fs::read_dir(dir.path())?.collect();
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_download_without_destination_picks_a_temporary_path() -> anyhow::Result<()> {
    env_logger_init();

    let session = Session::new(ChunkedFileTransport::new(16));
    let (_response, placed) = session.download(request()).call().await?;
    assert_eq!(fs::read(&placed)?, PAYLOAD);
    fs::remove_file(&placed)?;
    Ok(())
}

#[tokio::test]
async fn test_interrupted_download_hands_resume_data_to_the_sink() -> anyhow::Result<()> {
    env_logger_init();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let session = Session::new(ChunkedFileTransport::new(5).interrupt_after(10));

    let captured = Arc::new(Mutex::new(None));
    let sink = captured.to_owned();
    let error = session
        .download(request())
        .to(&destination)
        .on_resume_data(move |token| {
            *sink.lock().unwrap() = Some(token);
        })
        .call()
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Transport(_)));
    // No partial file is ever visible at the destination.
    assert!(!destination.exists());
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);

    let token = captured.lock().unwrap().take().unwrap();
    assert!(!token.as_bytes().is_empty());
    assert!(token.as_bytes().len() < PAYLOAD.len());
    assert!(PAYLOAD.starts_with(token.as_bytes()));
    Ok(())
}

#[tokio::test]
async fn test_resume_continues_from_the_partial_state() -> anyhow::Result<()> {
    env_logger_init();

    let transport = Arc::new(ChunkedFileTransport::new(5).interrupt_after(10));
    let session = Session::new(transport.to_owned());

    let captured = Arc::new(Mutex::new(None));
    let sink = captured.to_owned();
    session
        .download(request())
        .on_resume_data(move |token| {
            *sink.lock().unwrap() = Some(token);
        })
        .call()
        .await
        .unwrap_err();
    let token = captured.lock().unwrap().take().unwrap();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let (response, placed) = session.resume(token).to(&destination).call().await?;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(placed, destination);
    assert_eq!(fs::read(&destination)?, PAYLOAD);
    assert_eq!(transport.resumes.load(Relaxed), 1);
    Ok(())
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_complete() -> anyhow::Result<()> {
    env_logger_init();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let session = Session::new(ChunkedFileTransport::new(4));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.to_owned();
    session
        .download(request())
        .to(&destination)
        .on_progress(move |progress| {
            sink.lock().unwrap().push(progress);
        })
        .call()
        .await?;

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for window in seen.windows(2) {
        assert!(window[0].transferred_bytes() <= window[1].transferred_bytes());
    }
    let last = seen.last().unwrap();
    assert_eq!(last.transferred_bytes(), PAYLOAD.len() as u64);
    assert_eq!(last.fraction(), Some(1.0));
    Ok(())
}

#[tokio::test]
async fn test_cancellation_mid_transfer_surfaces_resume_data() -> anyhow::Result<()> {
    env_logger_init();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let session = Session::new(ChunkedFileTransport::new(4));

    let cancellation = CancellationToken::new();
    let cancel_from_progress = cancellation.clone();
    let captured = Arc::new(Mutex::new(None));
    let sink = captured.to_owned();

    let error = session
        .download(request())
        .to(&destination)
        .cancellation(cancellation)
        .on_progress(move |_progress| {
            // Pull the plug as soon as the first bytes arrive.
            cancel_from_progress.cancel();
        })
        .on_resume_data(move |token| {
            *sink.lock().unwrap() = Some(token);
        })
        .call()
        .await
        .unwrap_err();

    assert!(error.is_cancelled());
    assert!(!destination.exists());
    let token = captured.lock().unwrap().take().unwrap();
    assert!(PAYLOAD.starts_with(token.as_bytes()));
    Ok(())
}

/// Writes half the payload into staging, then parks until the test lets it
/// finish, so the test can probe the destination mid-transfer.
#[derive(Debug)]
struct PausingTransport {
    payload: Bytes,
    reached_midpoint: Arc<Notify>,
    proceed: Arc<Notify>,
}

impl Transport for PausingTransport {
    fn fetch<'a>(
        &'a self,
        _request: &'a Request,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }

    fn download<'a>(
        &'a self,
        _request: &'a Request,
        destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        Box::pin(async move {
            let staging = staging_path_for(destination)?;
            let mut file = File::create(&staging)?;
            let half = self.payload.len() / 2;
            file.write_all(&self.payload[..half])?;

            self.reached_midpoint.notify_one();
            self.proceed.notified().await;

            file.write_all(&self.payload[half..])?;
            drop(file);
            let placed = publish(&staging, destination)?;
            Ok((Response::builder().status_code(StatusCode::OK).build(), placed))
        })
    }

    fn resume<'a>(
        &'a self,
        _resume_token: &'a ResumeToken,
        _destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        unimplemented!("not exercised here")
    }

    fn upload<'a>(
        &'a self,
        _request: &'a Request,
        _source: &'a UploadSource,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }
}

#[tokio::test]
async fn test_destination_stays_invisible_while_bytes_are_in_flight() -> anyhow::Result<()> {
    env_logger_init();

    let dir = tempfile::tempdir()?;
    let destination = dir.path().join("payload.txt");
    let reached_midpoint = Arc::new(Notify::new());
    let proceed = Arc::new(Notify::new());
    let session = Session::new(PausingTransport {
        payload: Bytes::from_static(PAYLOAD),
        reached_midpoint: reached_midpoint.to_owned(),
        proceed: proceed.to_owned(),
    });

    let call = tokio::spawn({
        let destination = destination.to_owned();
        async move { session.download(request()).to(&destination).call().await }
    });

    // Half the payload has landed in staging; the destination must not
    // exist yet.
    reached_midpoint.notified().await;
    assert!(!destination.exists());

    proceed.notify_one();
    let (response, placed) = call.await??;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(placed, destination);
    assert_eq!(fs::read(&destination)?, PAYLOAD);
    Ok(())
}

/// Accepts only the current credential; everything else earns a `401`.
#[derive(Debug)]
struct GatedTransport {
    accepted: &'static str,
    calls: AtomicUsize,
}

impl Transport for GatedTransport {
    fn fetch<'a>(
        &'a self,
        request: &'a Request,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Relaxed);
            let authorized = request
                .header(http::header::AUTHORIZATION)
                .map(|value| value.as_bytes() == self.accepted.as_bytes())
                .unwrap_or(false);
            let status = if authorized {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            };
            Ok((Response::builder().status_code(status).build(), Bytes::new()))
        })
    }

    fn download<'a>(
        &'a self,
        _request: &'a Request,
        _destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        unimplemented!("not exercised here")
    }

    fn resume<'a>(
        &'a self,
        _resume_token: &'a ResumeToken,
        _destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        unimplemented!("not exercised here")
    }

    fn upload<'a>(
        &'a self,
        _request: &'a Request,
        _source: &'a UploadSource,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }
}

#[tokio::test]
async fn test_authorization_refreshes_after_401_and_retries() -> anyhow::Result<()> {
    use http_session::interceptor::AuthorizationInterceptor;

    env_logger_init();

    let transport = Arc::new(GatedTransport {
        accepted: "Bearer fresh",
        calls: AtomicUsize::new(0),
    });
    let refreshed = Arc::new(AtomicBool::new(false));
    let provider_state = refreshed.to_owned();

    let session = Session::builder(transport.to_owned())
        .interceptor(AuthorizationInterceptor::new(move |refresh, _request| {
            let state = provider_state.to_owned();
            Box::pin(async move {
                if refresh {
                    state.store(true, Relaxed);
                }
                let value = if state.load(Relaxed) {
                    "Bearer fresh"
                } else {
                    "Bearer stale"
                };
                Ok(value.parse()?)
            })
        }))
        .maximum_retry_count(1)
        .build();

    let (response, _body) = session.fetch(request()).call().await?;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(transport.calls.load(Relaxed), 2);
    Ok(())
}

/// Echoes the upload payload back as the response body, requiring a trace
/// header on every request.
#[derive(Debug)]
struct EchoUploadTransport;

impl Transport for EchoUploadTransport {
    fn fetch<'a>(
        &'a self,
        _request: &'a Request,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        unimplemented!("not exercised here")
    }

    fn download<'a>(
        &'a self,
        _request: &'a Request,
        _destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        unimplemented!("not exercised here")
    }

    fn resume<'a>(
        &'a self,
        _resume_token: &'a ResumeToken,
        _destination: Option<&'a Path>,
        _context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, PathBuf)>> {
        unimplemented!("not exercised here")
    }

    fn upload<'a>(
        &'a self,
        request: &'a Request,
        source: &'a UploadSource,
        context: &'a TransportContext,
    ) -> BoxFuture<'a, TransportResult<(Response, Bytes)>> {
        Box::pin(async move {
            if request.header("x-trace").is_none() {
                return Err(TransportError::new_with_msg(
                    TransportErrorKind::SendError,
                    "trace header missing",
                ));
            }
            let body = match source {
                UploadSource::Bytes(bytes) => bytes.to_owned(),
                UploadSource::File(path) => fs::read(path)?.into(),
                _ => {
                    return Err(TransportError::new_with_msg(
                        TransportErrorKind::UnknownError,
                        "unsupported source",
                    ))
                }
            };
            let total = body.len() as u64;
            context.progress(TransferProgress::new(total / 2, Some(total)));
            context.progress(TransferProgress::new(total, Some(total)));
            Ok((Response::builder().status_code(StatusCode::OK).build(), body))
        })
    }
}

fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-trace", "it-1".parse().unwrap());
    headers
}

#[tokio::test]
async fn test_upload_buffer_passes_through_prepare_hooks() -> anyhow::Result<()> {
    use http_session::interceptor::HeadersInterceptor;

    env_logger_init();

    let session = Session::builder(EchoUploadTransport)
        .interceptor(HeadersInterceptor::add(trace_headers()))
        .build();

    let (response, body) = session.upload(request(), &b"hello upload"[..]).call().await?;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(body.as_ref(), b"hello upload");
    Ok(())
}

#[tokio::test]
async fn test_upload_file_reads_the_source_from_disk() -> anyhow::Result<()> {
    use http_session::interceptor::HeadersInterceptor;

    env_logger_init();

    let dir = tempfile::tempdir()?;
    let source = dir.path().join("source.bin");
    fs::write(&source, b"bytes on disk")?;

    let session = Session::builder(EchoUploadTransport)
        .interceptor(HeadersInterceptor::add(trace_headers()))
        .build();

    let (response, body) = session.upload_file(request(), &source).call().await?;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(body.as_ref(), b"bytes on disk");
    Ok(())
}

#[tokio::test]
async fn test_upload_progress_is_monotonic_and_ends_complete() -> anyhow::Result<()> {
    use http_session::interceptor::HeadersInterceptor;

    env_logger_init();

    let session = Session::builder(EchoUploadTransport)
        .interceptor(HeadersInterceptor::add(trace_headers()))
        .build();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.to_owned();
    session
        .upload(request(), &b"hello upload"[..])
        .on_progress(move |progress| {
            sink.lock().unwrap().push(progress);
        })
        .call()
        .await?;

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    for window in seen.windows(2) {
        assert!(window[0].transferred_bytes() <= window[1].transferred_bytes());
    }
    assert_eq!(seen.last().unwrap().fraction(), Some(1.0));
    Ok(())
}

#[tokio::test]
async fn test_fetch_with_no_progress_events_still_succeeds() -> anyhow::Result<()> {
    env_logger_init();

    // Progress delivery is best effort; a transport that reports nothing is
    // within contract and the sink simply stays silent.
    let session = Session::new(GatedTransport {
        accepted: "Bearer fresh",
        calls: AtomicUsize::new(0),
    });

    let events = Arc::new(AtomicUsize::new(0));
    let sink = events.to_owned();
    let authorized = Request::builder()
        .url("http://fake.example/data".parse()?)
        .header(http::header::AUTHORIZATION, "Bearer fresh".parse()?)
        .build();
    let (response, _body) = session
        .fetch(authorized)
        .on_progress(move |_progress| {
            sink.fetch_add(1, Relaxed);
        })
        .call()
        .await?;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(events.load(Relaxed), 0);
    Ok(())
}
