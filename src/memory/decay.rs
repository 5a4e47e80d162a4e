//! Decay stage: a pure per-record decision
//! function, parameterized by `now` so it is testable without a live clock.

use super::record::{MemoryRecord, MemoryStatus};
use chrono::{DateTime, Utc};

const INVALIDATE_AFTER_DAYS: i64 = 90;
const INVALIDATE_IMPORTANCE_CEILING: f64 = 0.3;
const INVALIDATE_ACCESS_CEILING: u64 = 2;

const DECAY_AFTER_DAYS: i64 = 30;
const DECAY_FACTOR: f64 = 0.9;
const DECAY_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayDecision {
    NoChange,
    Invalidate,
    DecayImportance(f64),
}

/// For every active memory: if `now - last_accessed > 90d` and
/// `importance < 0.3` and `access_count < 2`, invalidate it. Else if
/// `now - last_accessed > 30d` and `access_count == 0`, multiply importance
/// by 0.9, floored at 0.1.
pub fn decide(record: &MemoryRecord, now: DateTime<Utc>) -> DecayDecision {
    if record.status != MemoryStatus::Active {
        return DecayDecision::NoChange;
    }
    let age_days = (now - record.last_accessed).num_days();

    if age_days > INVALIDATE_AFTER_DAYS && record.importance < INVALIDATE_IMPORTANCE_CEILING && record.access_count < INVALIDATE_ACCESS_CEILING {
        return DecayDecision::Invalidate;
    }
    if age_days > DECAY_AFTER_DAYS && record.access_count == 0 {
        let decayed = (record.importance * DECAY_FACTOR).max(DECAY_FLOOR);
        if decayed != record.importance {
            return DecayDecision::DecayImportance(decayed);
        }
    }
    DecayDecision::NoChange
}
