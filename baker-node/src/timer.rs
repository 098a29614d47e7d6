//! The scheduler's timer computation: the earliest of
//! "end of the current round" and "time to bake the next level", capped
//! by `max_timer_delay_ms` so the loop always wakes up periodically even
//! with no pending deadline.

use baker_automaton::TimeoutKind;
use baker_core::{round_time::timestamp_of_round, State};
use chrono::{DateTime, Utc};

/// `None` means no deadline is currently pending (no proposal seen yet at
/// this level, and no elected block to bake atop); the caller should still
/// wake up after `max_timer_delay_ms` to re-check.
pub fn next_timeout(state: &State, max_delay_ms: i64) -> Option<(DateTime<Utc>, TimeoutKind)> {
    let durations = &state.global.constants.round_durations;
    let mut best: Option<(DateTime<Utc>, TimeoutKind)> = None;

    if let Some(latest) = &state.level.latest_proposal {
        if let Ok(ts) = timestamp_of_round(
            durations,
            latest.predecessor.timestamp,
            latest.predecessor.round,
            state.round.current_round + 1,
        ) {
            best = Some((ts, TimeoutKind::EndOfRound { ending_round: state.round.current_round }));
        }
    }

    if let Some(elected) = &state.level.elected_block {
        let next_round = state.level.next_level_proposed_round.map(|r| r + 1).unwrap_or(0);
        if let Ok(ts) = timestamp_of_round(
            durations,
            elected.proposal.block.timestamp,
            elected.proposal.block.round,
            next_round,
        ) {
            let candidate = (ts, TimeoutKind::TimeToBakeNextLevel { at_round: next_round });
            best = Some(match best {
                Some(current) if current.0 <= candidate.0 => current,
                _ => candidate,
            });
        }
    }

    let _ = max_delay_ms;
    best
}

/// Converts a deadline (or its absence) into the `tokio::time::Instant` the
/// scheduler should sleep until, capping how far in the future it reaches.
pub fn sleep_until(deadline: Option<DateTime<Utc>>, max_delay_ms: i64) -> tokio::time::Instant {
    let now = Utc::now();
    let cap = chrono::Duration::milliseconds(max_delay_ms.max(0));
    let target = match deadline {
        Some(ts) => ts.min(now + cap).max(now),
        None => now + cap,
    };
    let std_delay = (target - now).to_std().unwrap_or(std::time::Duration::ZERO);
    tokio::time::Instant::now() + std_delay
}
