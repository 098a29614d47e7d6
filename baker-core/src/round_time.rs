//! Round/time arithmetic: pure functions mapping between
//! (predecessor timestamp, predecessor round, target round) and wall-clock
//! timestamps, using a per-chain round-duration schedule.

use crate::error::Error;
use crate::types::{Round, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First-round duration plus a per-round increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDurations {
    pub first_round_duration_ms: i64,
    pub delay_increment_per_round_ms: i64,
}

impl RoundDurations {
    fn round_duration_ms(&self, round: Round) -> Result<i64, Error> {
        if round < 0 {
            return Err(Error::OutOfRange);
        }
        let increment = self
            .delay_increment_per_round_ms
            .checked_mul(round as i64)
            .ok_or(Error::OutOfRange)?;
        self.first_round_duration_ms
            .checked_add(increment)
            .ok_or(Error::OutOfRange)
    }
}

/// Duration elapsed, from the start of the level, until the start of `round`.
pub fn level_offset_of_round(durations: &RoundDurations, round: Round) -> Result<Duration, Error> {
    if round < 0 {
        return Err(Error::OutOfRange);
    }
    let mut total: i64 = 0;
    for r in 0..round {
        total = total
            .checked_add(durations.round_duration_ms(r)?)
            .ok_or(Error::OutOfRange)?;
    }
    Ok(Duration::milliseconds(total))
}

/// The wall-clock timestamp at which `target_round` begins, given the
/// predecessor's own timestamp and the round at which it was produced.
pub fn timestamp_of_round(
    durations: &RoundDurations,
    predecessor_timestamp: Timestamp,
    predecessor_round: Round,
    target_round: Round,
) -> Result<Timestamp, Error> {
    if predecessor_round < 0 || target_round < 0 {
        return Err(Error::OutOfRange);
    }
    let predecessor_round_duration =
        Duration::milliseconds(durations.round_duration_ms(predecessor_round)?);
    let level_start = predecessor_timestamp
        .checked_add_signed(predecessor_round_duration)
        .ok_or(Error::OutOfRange)?;
    let offset = level_offset_of_round(durations, target_round)?;
    level_start.checked_add_signed(offset).ok_or(Error::OutOfRange)
}

/// The round active at `now`, given the predecessor's timestamp and round.
pub fn round_of_timestamp(
    durations: &RoundDurations,
    predecessor_timestamp: Timestamp,
    predecessor_round: Round,
    now: Timestamp,
) -> Result<Round, Error> {
    if predecessor_round < 0 {
        return Err(Error::OutOfRange);
    }
    let predecessor_round_duration =
        Duration::milliseconds(durations.round_duration_ms(predecessor_round)?);
    let level_start = predecessor_timestamp
        .checked_add_signed(predecessor_round_duration)
        .ok_or(Error::OutOfRange)?;
    if now < level_start {
        return Err(Error::OutOfRange);
    }
    let mut round: Round = 0;
    let mut elapsed_ms: i64 = 0;
    loop {
        let next_duration = durations.round_duration_ms(round)?;
        let next_elapsed = elapsed_ms
            .checked_add(next_duration)
            .ok_or(Error::OutOfRange)?;
        let round_end = level_start
            .checked_add_signed(Duration::milliseconds(next_elapsed))
            .ok_or(Error::OutOfRange)?;
        if now < round_end {
            return Ok(round);
        }
        elapsed_ms = next_elapsed;
        round = round.checked_add(1).ok_or(Error::OutOfRange)?;
    }
}

/// Maps a round to its committee slot, wrapping around `committee_size`.
pub fn round_to_slot(round: Round, committee_size: u32) -> Result<u32, Error> {
    if round < 0 || committee_size == 0 {
        return Err(Error::OutOfRange);
    }
    Ok((round as u32) % committee_size)
}

/// Small bounded cache keyed by an arbitrary hashable input, evicting the
/// least-recently-inserted entry once full. Backs the timestamp-of-round
/// and round-timestamp-interval caches held on global state.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    order: std::collections::VecDeque<K>,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: std::collections::VecDeque::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if !self.entries.contains_key(&key) {
            if self.order.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default capacity for the round-arithmetic caches.
pub const ROUND_CACHE_CAPACITY: usize = 64;
