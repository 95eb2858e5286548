// src/encroachment/retry.rs
//
// Bounded retry for the segmentation call.
//
// Only 503 (model warming up) is retried, after sleeping for the wait the
// server suggests. Every request, 503 or not, consumes one attempt. Any
// other status or a transport failure stops immediately.

use super::transport::SegmentationTransport;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const STATUS_OK: u16 = 200;
const STATUS_WARMING_UP: u16 = 503;

/// Source of retry delays, swapped for a recording fake in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// 200 with the raw response body
    Success(Vec<u8>),
    /// Non-200, non-503 status
    Rejected(u16),
    /// Every attempt answered 503
    Exhausted { attempts: u32 },
    /// Timeout, refused connection or unreadable body
    TransportFailed(String),
}

#[derive(Debug, Deserialize)]
struct WarmupBody {
    estimated_time: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub default_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_wait: Duration::from_secs(10),
            max_wait: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, default_wait_secs: f64, max_wait_secs: f64) -> Self {
        let default_wait = Duration::from_secs_f64(default_wait_secs.max(0.0));
        let max_wait = Duration::from_secs_f64(max_wait_secs.max(default_wait_secs).max(0.0));
        Self {
            max_attempts: max_attempts.max(1),
            default_wait,
            max_wait,
        }
    }

    /// Wait suggested by a 503 body, falling back to the default and capped
    /// at `max_wait`.
    pub fn warmup_delay(&self, body: &[u8]) -> Duration {
        let cap = self.max_wait.as_secs_f64();
        serde_json::from_slice::<WarmupBody>(body)
            .ok()
            .and_then(|b| b.estimated_time)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Duration::from_secs_f64(secs.min(cap)))
            .unwrap_or(self.default_wait)
            .min(self.max_wait)
    }

    pub async fn execute<T, S>(&self, transport: &T, sleeper: &S, payload: &[u8]) -> CallOutcome
    where
        T: SegmentationTransport,
        S: Sleeper,
    {
        for attempt in 1..=self.max_attempts {
            let response = match transport.post(payload).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Segmentation request failed on attempt {}: {}", attempt, e);
                    return CallOutcome::TransportFailed(e.to_string());
                }
            };

            match response.status {
                STATUS_OK => {
                    debug!("Segmentation succeeded on attempt {}", attempt);
                    return CallOutcome::Success(response.body);
                }
                STATUS_WARMING_UP => {
                    if attempt == self.max_attempts {
                        break;
                    }
                    let delay = self.warmup_delay(&response.body);
                    warn!(
                        "⏳ Segmentation model warming up (attempt {}/{}), retrying in {:.1}s",
                        attempt,
                        self.max_attempts,
                        delay.as_secs_f64()
                    );
                    sleeper.sleep(delay).await;
                }
                status => {
                    warn!(
                        "Segmentation service returned {}: {}",
                        status,
                        String::from_utf8_lossy(&response.body)
                    );
                    return CallOutcome::Rejected(status);
                }
            }
        }

        warn!(
            "Segmentation model still unavailable after {} attempts",
            self.max_attempts
        );
        CallOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encroachment::transport::TransportResponse;
    use crate::error::{AnalysisError, Result};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned responses in order and counts requests.
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedTransport {
        pub(crate) fn new(responses: Vec<Result<TransportResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SegmentationTransport for ScriptedTransport {
        fn post(&self, _image: &[u8]) -> impl Future<Output = Result<TransportResponse>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AnalysisError::Network("script exhausted".into())));
            async move { next }
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            self.slept.lock().unwrap().push(duration);
            async {}
        }
    }

    pub(crate) fn reply(status: u16, body: &str) -> Result<TransportResponse> {
        Ok(TransportResponse {
            status,
            body: body.as_bytes().to_vec(),
        })
    }

    #[tokio::test]
    async fn test_retries_warmup_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            reply(503, r#"{"estimated_time": 2.5}"#),
            reply(503, ""),
            reply(200, "[]"),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = RetryPolicy::default()
            .execute(&transport, &sleeper, b"jpeg")
            .await;

        assert_eq!(outcome, CallOutcome::Success(b"[]".to_vec()));
        assert_eq!(transport.calls(), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs_f64(2.5), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let transport = ScriptedTransport::new(vec![
            reply(503, "{}"),
            reply(503, "{}"),
            reply(503, "{}"),
            reply(200, "[]"),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = RetryPolicy::default()
            .execute(&transport, &sleeper, b"jpeg")
            .await;

        assert_eq!(outcome, CallOutcome::Exhausted { attempts: 3 });
        assert_eq!(transport.calls(), 3);
        // no sleep after the final attempt
        assert_eq!(sleeper.slept.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            reply(429, "slow down"),
            reply(200, "[]"),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = RetryPolicy::default()
            .execute(&transport, &sleeper, b"jpeg")
            .await;

        assert_eq!(outcome, CallOutcome::Rejected(429));
        assert_eq!(transport.calls(), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(AnalysisError::Network("connection refused".into())),
            reply(200, "[]"),
        ]);
        let sleeper = RecordingSleeper::default();

        let outcome = RetryPolicy::default()
            .execute(&transport, &sleeper, b"jpeg")
            .await;

        assert!(matches!(outcome, CallOutcome::TransportFailed(msg) if msg.contains("refused")));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_warmup_delay_is_capped() {
        let policy = RetryPolicy::new(3, 10.0, 60.0);
        assert_eq!(
            policy.warmup_delay(br#"{"estimated_time": 900}"#),
            Duration::from_secs(60)
        );
        assert_eq!(policy.warmup_delay(b"not json"), Duration::from_secs(10));
        assert_eq!(
            policy.warmup_delay(br#"{"estimated_time": -4}"#),
            Duration::from_secs(10)
        );
    }
}
