use chrono::{DateTime, Duration, Utc};
use std::fmt;

pub mod fetch;

/// Which counter a ban was attributed to upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanKind {
    Watchdog,
    Staff,
}

impl BanKind {
    fn emoji(self) -> &'static str {
        match self {
            BanKind::Watchdog => "\u{1F436}",
            BanKind::Staff => "\u{1F46E}",
        }
    }

    fn label(self) -> &'static str {
        match self {
            BanKind::Watchdog => "Watchdog",
            BanKind::Staff => "Staff",
        }
    }
}

/// One positive delta, ready to broadcast. `total_tracked` is the running
/// total for the same category after this delta was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: BanKind,
    pub delta: u64,
    pub total_tracked: u64,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.delta != 1 { "s" } else { "" };
        write!(
            f,
            "{} {} banned {} player{}! (Total tracked: {})",
            self.kind.emoji(),
            self.kind.label(),
            self.delta,
            plural,
            group_digits(self.total_tracked)
        )
    }
}

/// Point-in-time read of the tracker, for the stats command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub uptime: Duration,
    pub watchdog_tracked: u64,
    pub staff_tracked: u64,
    pub total_tracked: u64,
    pub last_fetch: Option<DateTime<Utc>>,
    pub current_total_bans: Option<u64>,
}

/// Counter-diffing state machine. Holds the last observed pair of upstream
/// counters and accumulates every strictly positive delta since startup.
pub struct BanTracker {
    prev_watchdog: Option<u64>,
    prev_staff: Option<u64>,
    watchdog_tracked: u64,
    staff_tracked: u64,
    start_time: DateTime<Utc>,
    last_fetch: Option<DateTime<Utc>>,
    consecutive_errors: u32,
}

impl BanTracker {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            prev_watchdog: None,
            prev_staff: None,
            watchdog_tracked: 0,
            staff_tracked: 0,
            start_time,
            last_fetch: None,
            consecutive_errors: 0,
        }
    }

    /// Feeds one successful fetch into the tracker.
    ///
    /// The first call only establishes the baseline and emits nothing.
    /// After that, each strictly positive delta bumps the matching running
    /// total and yields one notification. Zero and negative deltas (the
    /// upstream counters occasionally reset) are ignored without touching
    /// the totals. Previous counts, the last-fetch time and the error
    /// counter are updated on every call.
    pub fn observe(&mut self, watchdog: u64, staff: u64, now: DateTime<Utc>) -> Vec<Notification> {
        let mut notifications = Vec::new();

        if let (Some(prev_watchdog), Some(prev_staff)) = (self.prev_watchdog, self.prev_staff) {
            let watchdog_delta = watchdog as i64 - prev_watchdog as i64;
            if watchdog_delta > 0 {
                self.watchdog_tracked += watchdog_delta as u64;
                notifications.push(Notification {
                    kind: BanKind::Watchdog,
                    delta: watchdog_delta as u64,
                    total_tracked: self.watchdog_tracked,
                });
            }

            let staff_delta = staff as i64 - prev_staff as i64;
            if staff_delta > 0 {
                self.staff_tracked += staff_delta as u64;
                notifications.push(Notification {
                    kind: BanKind::Staff,
                    delta: staff_delta as u64,
                    total_tracked: self.staff_tracked,
                });
            }
        }

        self.prev_watchdog = Some(watchdog);
        self.prev_staff = Some(staff);
        self.last_fetch = Some(now);
        self.consecutive_errors = 0;

        notifications
    }

    /// Records a failed fetch. Counts and totals are untouched; the tick
    /// cadence itself is the retry mechanism.
    pub fn record_failure(&mut self) {
        self.consecutive_errors += 1;
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn summary(&self, now: DateTime<Utc>) -> StatsSummary {
        let current_total_bans = match (self.prev_watchdog, self.prev_staff) {
            (Some(watchdog), Some(staff)) => Some(watchdog + staff),
            _ => None,
        };

        StatsSummary {
            uptime: now - self.start_time,
            watchdog_tracked: self.watchdog_tracked,
            staff_tracked: self.staff_tracked,
            total_tracked: self.watchdog_tracked + self.staff_tracked,
            last_fetch: self.last_fetch,
            current_total_bans,
        }
    }
}

/// Formats an integer with thousands separators ("1,234,567").
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
