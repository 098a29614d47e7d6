use baker_core::round_time::{
    level_offset_of_round, round_of_timestamp, round_to_slot, timestamp_of_round, RoundDurations,
};
use chrono::{TimeZone, Utc};

fn durations() -> RoundDurations {
    RoundDurations {
        first_round_duration_ms: 15_000,
        delay_increment_per_round_ms: 5_000,
    }
}

#[test]
fn level_offset_is_zero_at_round_zero() {
    let offset = level_offset_of_round(&durations(), 0).unwrap();
    assert_eq!(offset.num_milliseconds(), 0);
}

#[test]
fn level_offset_accumulates_round_durations() {
    // round 0 takes 15s, round 1 takes 20s => offset at round 2 is 35s.
    let offset = level_offset_of_round(&durations(), 2).unwrap();
    assert_eq!(offset.num_seconds(), 35);
}

#[test]
fn timestamp_of_round_round_trips_through_round_of_timestamp() {
    let pred_ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let d = durations();
    for target_round in 0..5 {
        let ts = timestamp_of_round(&d, pred_ts, 0, target_round).unwrap();
        let recovered = round_of_timestamp(&d, pred_ts, 0, ts).unwrap();
        assert_eq!(recovered, target_round);
    }
}

#[test]
fn round_of_timestamp_rejects_time_before_level_start() {
    let pred_ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let d = durations();
    let before = pred_ts - chrono::Duration::seconds(1);
    assert!(round_of_timestamp(&d, pred_ts, 0, before).is_err());
}

#[test]
fn negative_round_is_out_of_range() {
    let d = durations();
    assert!(level_offset_of_round(&d, -1).is_err());
    assert!(round_to_slot(-1, 8).is_err());
}

#[test]
fn round_to_slot_wraps_with_committee_size() {
    assert_eq!(round_to_slot(0, 4).unwrap(), 0);
    assert_eq!(round_to_slot(4, 4).unwrap(), 0);
    assert_eq!(round_to_slot(5, 4).unwrap(), 1);
}
