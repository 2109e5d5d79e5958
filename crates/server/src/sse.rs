use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Extension,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use toolgate_core::Identity;

use crate::config::AppState;

/// Keep-alive notification pushed to stream clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub timestamp: DateTime<Utc>,
}

impl HeartbeatEvent {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }

    fn to_event(&self) -> Event {
        Event::default()
            .event("heartbeat")
            .json_data(self)
            .unwrap_or_else(|_| Event::default().event("heartbeat").data("{}"))
    }
}

/// Infinite heartbeat sequence, one event per `period` starting one period
/// from now. Ends when `shutdown` is cancelled or the stream is dropped.
/// Missed ticks are delayed rather than replayed.
pub fn heartbeat_stream(
    period: Duration,
    shutdown: CancellationToken,
) -> impl Stream<Item = HeartbeatEvent> + Send + 'static {
    stream! {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => yield HeartbeatEvent::now(),
            }
        }
    }
}

/// Tracks one open stream; logs and decrements the gauge when dropped
struct ConnectionGuard {
    id: uuid::Uuid,
    subject: String,
    open_streams: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn open(subject: &str, open_streams: Arc<AtomicUsize>) -> Self {
        let id = uuid::Uuid::new_v4();
        let open = open_streams.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(connection = %id, subject, open, "SSE client connected");

        Self {
            id,
            subject: subject.to_string(),
            open_streams,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let open = self.open_streams.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::info!(connection = %self.id, subject = %self.subject, open, "SSE client disconnected");
    }
}

/// `GET /mcp/sse`: heartbeat event stream
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let guard = ConnectionGuard::open(identity.subject(), Arc::clone(&state.open_streams));

    let events = heartbeat_stream(state.heartbeat_interval, state.shutdown.child_token())
        .map(move |heartbeat| {
            let _connection = &guard;
            Ok(heartbeat.to_event())
        });

    Sse::new(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_one_heartbeat_per_period() {
        let period = Duration::from_secs(30);
        let start = Instant::now();
        let stream = heartbeat_stream(period, CancellationToken::new());
        futures::pin_mut!(stream);

        for n in 1..=3u32 {
            assert!(stream.next().await.is_some());
            assert_eq!(Instant::now() - start, period * n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_stream() {
        let shutdown = CancellationToken::new();
        let stream = heartbeat_stream(Duration::from_secs(30), shutdown.clone());
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());
        shutdown.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_gets_no_backlog() {
        let period = Duration::from_secs(30);
        let start = Instant::now();
        let stream = heartbeat_stream(period, CancellationToken::new());
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());
        // Consumer stalls for several periods
        tokio::time::sleep(period * 4).await;

        let stalled_at = Instant::now();
        assert!(stream.next().await.is_some());
        assert_eq!(Instant::now(), stalled_at);

        // The next event is a full period later, not an immediate replay
        assert!(stream.next().await.is_some());
        assert_eq!(Instant::now() - start, period * 6);
    }

    #[test]
    fn test_guard_tracks_open_streams() {
        let gauge = Arc::new(AtomicUsize::new(0));

        let a = ConnectionGuard::open("alice", Arc::clone(&gauge));
        let b = ConnectionGuard::open("bob", Arc::clone(&gauge));
        assert_eq!(gauge.load(Ordering::SeqCst), 2);

        drop(a);
        assert_eq!(gauge.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(gauge.load(Ordering::SeqCst), 0);
    }
}
