use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{BACKOFF_BASE_MS, BACKOFF_CAP_MS, REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::error::FetchError;

/// Seam between retry policy and the actual network call, so the engine can
/// be exercised against fake transports in tests.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<(u16, String), FetchError>> + Send;
}

/// Production transport backed by reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: &str) -> Result<(u16, String), FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        Ok((status, body))
    }
}

/// Issues rate-limited, retried GET requests. Each engine keeps its own
/// last-request clock, so one source's backoff never throttles the other.
pub struct HttpFetchEngine<T: Transport = HttpTransport> {
    transport: Option<T>,
    max_retries: u32,
    delay_between_requests: Duration,
    last_request: Mutex<Option<Instant>>,
    cancel: CancellationToken,
}

impl HttpFetchEngine<HttpTransport> {
    pub fn new(max_retries: u32, delay_between_requests: Duration) -> Result<Self, FetchError> {
        Ok(Self::with_transport(
            HttpTransport::new()?,
            max_retries,
            delay_between_requests,
        ))
    }
}

impl<T: Transport> HttpFetchEngine<T> {
    pub fn with_transport(transport: T, max_retries: u32, delay_between_requests: Duration) -> Self {
        Self {
            transport: Some(transport),
            max_retries,
            delay_between_requests,
            last_request: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Caller-supplied cancellation signal, checked between attempts.
    pub fn set_cancellation(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    /// GET `url`, honoring the inter-request delay and retrying transient
    /// failures (timeout, 429, 5xx) with exponential backoff. A non-retriable
    /// status fails immediately. Returns the final error once `max_retries`
    /// attempts are exhausted.
    pub async fn fetch(&self, url: &str) -> Result<(u16, String), FetchError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| FetchError::Network("engine is closed".to_string()))?;

        // max_retries is the total attempt budget; 0 still gets one attempt.
        let attempts = self.max_retries.max(1);
        let mut last_err = FetchError::Network("no attempts made".to_string());

        for attempt in 0..attempts {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Network("cancelled".to_string()));
            }
            if attempt > 0 {
                let backoff = backoff_delay(attempt - 1);
                debug!(%url, attempt, backoff_ms = backoff.as_millis() as u64, "retrying fetch");
                tokio::time::sleep(backoff).await;
            }
            self.enforce_request_delay().await;

            match transport.send(url).await {
                Ok((status, body)) => match classify_status(status) {
                    StatusClass::Ok => {
                        debug!(%url, status, bytes = body.len(), "fetched");
                        return Ok((status, body));
                    }
                    StatusClass::Transient(err) => {
                        warn!(%url, status, attempt, "transient HTTP failure");
                        last_err = err;
                    }
                    StatusClass::Fatal(err) => {
                        warn!(%url, status, "non-retriable HTTP failure");
                        return Err(err);
                    }
                },
                Err(err) if err.is_retriable() => {
                    warn!(%url, error = %err, attempt, "transient transport failure");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }

    /// Drops the transport; safe to call exactly once and a no-op thereafter.
    /// A fetch after close fails with a network error.
    pub fn close(&mut self) {
        self.transport = None;
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /// Minimum inter-request spacing, regardless of target. The lock is held
    /// across the sleep so concurrent callers on the same engine serialize.
    async fn enforce_request_delay(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay_between_requests {
                tokio::time::sleep(self.delay_between_requests - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

enum StatusClass {
    Ok,
    Transient(FetchError),
    Fatal(FetchError),
}

fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Ok,
        429 => StatusClass::Transient(FetchError::RateLimited),
        500..=599 => StatusClass::Transient(FetchError::HttpStatus(status)),
        _ => StatusClass::Fatal(FetchError::HttpStatus(status)),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}
