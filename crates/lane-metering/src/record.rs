//! Per-actor usage records and calendar-month period math.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use lane_common::{ActorId, QuotaKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bounds of the UTC calendar month containing `now`: the first instant of
/// the month and the last whole second before the next month begins.
pub fn month_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = month_start(now.year(), now.month());
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let end = month_start(next_year, next_month) - Duration::seconds(1);
    (start, end)
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    // Day 1 of a 1..=12 month always resolves in UTC.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
}

/// One actor's consumption counters for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub actor_id: ActorId,
    pub counters: HashMap<QuotaKind, i64>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl UsageRecord {
    /// Zeroed record for the month containing `now`.
    pub fn fresh(actor_id: ActorId, now: DateTime<Utc>) -> Self {
        let (period_start, period_end) = month_period(now);
        Self {
            actor_id,
            counters: HashMap::new(),
            period_start,
            period_end,
            last_updated: now,
        }
    }

    /// Counter value for `kind`; kinds never incremented read as zero.
    pub fn count(&self, kind: QuotaKind) -> i64 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    /// A record is stale once `now` reaches the first instant of the next
    /// month. `period_end` names the month's final whole second, so every
    /// sub-second instant inside that second is still current. Stale
    /// counters must never feed a decision.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.period_end + Duration::seconds(1)
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        !self.is_stale(now)
    }

    /// Applies an increment in place. Store implementations call this while
    /// holding exclusive access to the entry.
    pub fn add(&mut self, kind: QuotaKind, amount: i64, now: DateTime<Utc>) {
        *self.counters.entry(kind).or_insert(0) += amount;
        self.last_updated = now;
    }
}
