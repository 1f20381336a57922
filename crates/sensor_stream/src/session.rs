use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use time::{OffsetDateTime, UtcOffset};

/// Time source for the ingestion path: a monotonic reading for summary
/// windows and a wall-clock reading for row timestamps.
pub trait Clock {
    /// Monotonic time elapsed since the clock was created.
    fn monotonic(&self) -> Duration;
    fn wall(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            origin: Instant::now(),
            offset,
        }
    }

    /// Resolves the local UTC offset, falling back to UTC when it cannot be
    /// determined. Call this before the process spawns additional threads;
    /// on Unix the lookup refuses to run once the process is multi-threaded.
    pub fn local() -> Self {
        Self::new(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::local()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Hand-driven clock for tests and synthetic timing. Clones share the same
/// reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    elapsed_nanos: Arc<AtomicU64>,
    wall_origin: OffsetDateTime,
}

impl ManualClock {
    pub fn new(wall_origin: OffsetDateTime) -> Self {
        Self {
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
            wall_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn set(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    fn wall(&self) -> OffsetDateTime {
        self.wall_origin + self.monotonic()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionPhase {
    AwaitingHeader,
    Streaming,
}

/// Records counted in one summary window.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WindowSummary {
    pub records: u64,
    pub interval: Duration,
}

/// Mutable state of one logging session. Owned by the ingestion path only.
#[derive(Debug, Clone)]
pub struct SessionState {
    header_emitted: bool,
    record_count: u64,
    total_records: u64,
    last_summary: Duration,
    summary_interval: Duration,
}

impl SessionState {
    pub fn new(summary_interval: Duration, started_at: Duration) -> Self {
        Self {
            header_emitted: false,
            record_count: 0,
            total_records: 0,
            last_summary: started_at,
            summary_interval,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.header_emitted {
            SessionPhase::Streaming
        } else {
            SessionPhase::AwaitingHeader
        }
    }

    pub fn header_emitted(&self) -> bool {
        self.header_emitted
    }

    /// Moves to [`SessionPhase::Streaming`]. Returns `false` when the header
    /// had already been emitted.
    pub fn mark_header_emitted(&mut self) -> bool {
        !std::mem::replace(&mut self.header_emitted, true)
    }

    pub fn record_written(&mut self) {
        self.record_count += 1;
        self.total_records += 1;
    }

    /// Records counted since the last summary.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn summary_interval(&self) -> Duration {
        self.summary_interval
    }

    /// Closes the current window once `summary_interval` has elapsed since
    /// the previous one, resetting the window counter and start time.
    pub fn poll_summary(&mut self, now: Duration) -> Option<WindowSummary> {
        if now.saturating_sub(self.last_summary) < self.summary_interval {
            return None;
        }
        let summary = WindowSummary {
            records: self.record_count,
            interval: self.summary_interval,
        };
        self.record_count = 0;
        self.last_summary = now;
        Some(summary)
    }
}
