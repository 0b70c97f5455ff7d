//! Position of validators in the round-robin withdrawal sweep, and time bucketing over it.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_WITHDRAWALS_PER_PAYLOAD, SECONDS_PER_HOUR, SECONDS_PER_SLOT},
    errors::SweepError,
};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Snapshot of the beacon chain's sweep cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepState {
    /// Next validator index the chain will sweep.
    pub sweep_index: u64,
    pub total_validators: u64,
}

impl SweepState {
    pub fn new(sweep_index: u64, total_validators: u64) -> Result<Self, SweepError> {
        let state = Self {
            sweep_index,
            total_validators,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        if self.total_validators == 0 || self.sweep_index >= self.total_validators {
            return Err(SweepError::InvalidSweepState {
                sweep_index: self.sweep_index,
                total_validators: self.total_validators,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPosition {
    pub position_in_queue: u64,
    pub slots_until_sweep: u64,
    pub seconds_until_sweep: u64,
}

/// Estimates how far `beacon_index` is from the sweep cursor, wrapping around the end of
/// the validator set.
pub fn compute_sweep_position(
    beacon_index: u64,
    state: &SweepState,
) -> Result<SweepPosition, SweepError> {
    state.validate()?;
    if beacon_index >= state.total_validators {
        return Err(SweepError::IndexOutOfRange {
            beacon_index,
            total_validators: state.total_validators,
        });
    }

    let position_in_queue = if beacon_index >= state.sweep_index {
        beacon_index - state.sweep_index
    } else {
        (state.total_validators - state.sweep_index) + beacon_index
    };
    let slots_until_sweep = position_in_queue.div_ceil(MAX_WITHDRAWALS_PER_PAYLOAD);

    Ok(SweepPosition {
        position_in_queue,
        slots_until_sweep,
        seconds_until_sweep: slots_until_sweep * SECONDS_PER_SLOT,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepBucket<T> {
    pub bucket_index: usize,
    pub target_sweep_time_seconds: u64,
    pub members: Vec<T>,
}

/// Entries spread over fixed-width windows of the sweep timeline. Only non-empty buckets
/// are kept; `num_buckets` still counts the empty ones so indices stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSchedule<T> {
    pub interval_hours: u64,
    pub first_sweep_seconds: u64,
    pub last_sweep_seconds: u64,
    pub num_buckets: usize,
    pub buckets: Vec<SweepBucket<T>>,
}

/// Nearest bucket for `seconds`, with exact ties going to the lower index.
pub fn bucket_index_for(
    seconds: u64,
    first_sweep_seconds: u64,
    interval_seconds: u64,
    num_buckets: usize,
) -> usize {
    if interval_seconds == 0 || num_buckets == 0 {
        return 0;
    }
    let offset = seconds.saturating_sub(first_sweep_seconds);
    let quotient = offset / interval_seconds;
    let remainder = offset % interval_seconds;
    let nearest = if 2 * remainder > interval_seconds {
        quotient + 1
    } else {
        quotient
    };
    usize::try_from(nearest)
        .unwrap_or(usize::MAX)
        .min(num_buckets - 1)
}

/// Partitions `entries` into `interval_hours` wide buckets anchored at the earliest sweep time.
///
/// Entries are ordered by their sweep time first; equal times keep their input order.
pub fn spread_across_queue<T>(
    mut entries: Vec<T>,
    interval_hours: u64,
    seconds_until_sweep: impl Fn(&T) -> u64,
) -> Result<SweepSchedule<T>, SweepError> {
    if interval_hours == 0 {
        return Err(SweepError::InvalidInterval);
    }
    let interval_seconds = interval_hours * SECONDS_PER_HOUR;

    entries.sort_by_key(|entry| seconds_until_sweep(entry));
    let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
        return Ok(SweepSchedule {
            interval_hours,
            first_sweep_seconds: 0,
            last_sweep_seconds: 0,
            num_buckets: 0,
            buckets: vec![],
        });
    };
    let first_sweep_seconds = seconds_until_sweep(first);
    let last_sweep_seconds = seconds_until_sweep(last);

    let span = (last_sweep_seconds - first_sweep_seconds).div_ceil(interval_seconds);
    let num_buckets = usize::try_from(span).map_err(|_| SweepError::InvalidInterval)? + 1;

    let mut buckets: Vec<SweepBucket<T>> = Vec::new();
    for entry in entries {
        let bucket_index = bucket_index_for(
            seconds_until_sweep(&entry),
            first_sweep_seconds,
            interval_seconds,
            num_buckets,
        );
        // Entries are sorted, so bucket indices never decrease.
        match buckets.last_mut() {
            Some(bucket) if bucket.bucket_index == bucket_index => bucket.members.push(entry),
            _ => buckets.push(SweepBucket {
                bucket_index,
                target_sweep_time_seconds: first_sweep_seconds
                    + bucket_index as u64 * interval_seconds,
                members: vec![entry],
            }),
        }
    }

    Ok(SweepSchedule {
        interval_hours,
        first_sweep_seconds,
        last_sweep_seconds,
        num_buckets,
        buckets,
    })
}

impl<T> SweepSchedule<T> {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Every member paired with the bucket it landed in.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, &T)> {
        self.buckets.iter().flat_map(|bucket| {
            bucket
                .members
                .iter()
                .map(move |member| (bucket.bucket_index, member))
        })
    }

    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            total_validators: self.buckets.iter().map(|bucket| bucket.members.len()).sum(),
            interval_hours: self.interval_hours,
            total_buckets: self.buckets.len(),
            first_sweep_time: format_duration(self.first_sweep_seconds),
            last_sweep_time: format_duration(self.last_sweep_seconds),
            total_queue_duration: format_duration(
                self.last_sweep_seconds - self.first_sweep_seconds,
            ),
            buckets_overview: self
                .buckets
                .iter()
                .map(|bucket| BucketOverview {
                    bucket: bucket.bucket_index,
                    time: format_duration(bucket.target_sweep_time_seconds),
                    validators: bucket.members.len(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_validators: usize,
    pub interval_hours: u64,
    pub total_buckets: usize,
    pub first_sweep_time: String,
    pub last_sweep_time: String,
    pub total_queue_duration: String,
    pub buckets_overview: Vec<BucketOverview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketOverview {
    pub bucket: usize,
    pub time: String,
    pub validators: usize,
}

/// Renders a duration as `"1d 2h 3m"`, dropping leading zero units.
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY;
    let hours = (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_sweep_positions_wrap_around() {
        let state = SweepState::new(150, 1000).expect("valid sweep state");

        let mut positions = [100, 200, 50].map(|index| {
            let sweep = compute_sweep_position(index, &state).expect("index within the validator set");
            (index, sweep.position_in_queue)
        });
        assert_eq!(positions, [(100, 950), (200, 50), (50, 900)]);

        positions.sort_by_key(|(_, position)| *position);
        assert_eq!(positions.map(|(index, _)| index), [200, 50, 100]);
    }

    #[rstest]
    #[case(150, 0, 0, 0)]
    #[case(151, 1, 1, 12)]
    #[case(166, 16, 1, 12)]
    #[case(167, 17, 2, 24)]
    #[case(149, 999, 63, 756)]
    fn test_sweep_timing(
        #[case] beacon_index: u64,
        #[case] position: u64,
        #[case] slots: u64,
        #[case] seconds: u64,
    ) {
        let state = SweepState::new(150, 1000).expect("valid sweep state");
        let sweep = compute_sweep_position(beacon_index, &state).expect("in range");
        assert_eq!(
            sweep,
            SweepPosition {
                position_in_queue: position,
                slots_until_sweep: slots,
                seconds_until_sweep: seconds,
            }
        );
    }

    #[test]
    fn test_positions_stay_inside_queue() {
        let state = SweepState::new(37, 401).expect("valid sweep state");
        for beacon_index in 0..state.total_validators {
            let sweep = compute_sweep_position(beacon_index, &state).expect("in range");
            assert!(sweep.position_in_queue < state.total_validators);
            assert_eq!(sweep.seconds_until_sweep % SECONDS_PER_SLOT, 0);
        }
    }

    #[test]
    fn test_invalid_sweep_inputs() {
        assert_eq!(
            SweepState::new(5, 5),
            Err(SweepError::InvalidSweepState {
                sweep_index: 5,
                total_validators: 5,
            })
        );
        assert!(SweepState::new(0, 0).is_err());

        let state = SweepState::new(0, 10).expect("valid sweep state");
        assert_eq!(
            compute_sweep_position(10, &state),
            Err(SweepError::IndexOutOfRange {
                beacon_index: 10,
                total_validators: 10,
            })
        );
    }

    #[rstest]
    #[case(0, 0)]
    #[case(10_799, 0)]
    #[case(10_800, 0)]
    #[case(10_801, 1)]
    #[case(21_600, 1)]
    #[case(32_400, 1)]
    #[case(32_401, 2)]
    #[case(1_000_000, 3)]
    fn test_bucket_index_ties_go_low(#[case] offset: u64, #[case] expected: usize) {
        assert_eq!(bucket_index_for(1_000 + offset, 1_000, 21_600, 4), expected);
    }

    #[test]
    fn test_spread_across_queue_drops_empty_buckets() {
        let hour = SECONDS_PER_HOUR;
        let seconds = vec![0, hour, 5 * hour, 20 * hour, 24 * hour];
        let schedule = spread_across_queue(seconds, 6, |seconds| *seconds).expect("valid interval");

        // Span of 24h at 6h intervals gives buckets 0..=4; bucket 2 stays empty.
        assert_eq!(schedule.num_buckets, 5);
        let layout = schedule
            .buckets
            .iter()
            .map(|bucket| (bucket.bucket_index, bucket.target_sweep_time_seconds, bucket.members.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            layout,
            vec![
                (0, 0, vec![0, hour]),
                (1, 6 * hour, vec![5 * hour]),
                (3, 18 * hour, vec![20 * hour]),
                (4, 24 * hour, vec![24 * hour]),
            ]
        );

        for (bucket_index, member) in schedule.assignments() {
            let distance = |index: usize| member.abs_diff(index as u64 * 6 * hour);
            assert!((0..schedule.num_buckets).all(|other| distance(bucket_index) <= distance(other)));
        }
    }

    #[test]
    fn test_spread_across_queue_edge_cases() {
        assert_eq!(
            spread_across_queue(vec![1u64], 0, |seconds| *seconds),
            Err(SweepError::InvalidInterval)
        );

        let empty = spread_across_queue(Vec::<u64>::new(), 6, |seconds| *seconds).expect("empty input");
        assert!(empty.is_empty());
        assert_eq!(empty.num_buckets, 0);

        let single = spread_across_queue(vec![7_200u64, 7_200], 6, |seconds| *seconds).expect("single time");
        assert_eq!(single.num_buckets, 1);
        assert_eq!(single.buckets[0].members.len(), 2);
    }

    #[test]
    fn test_schedule_summary() {
        let hour = SECONDS_PER_HOUR;
        let schedule = spread_across_queue(vec![90_060u64, 90_060 + 13 * hour], 12, |seconds| *seconds)
            .expect("valid interval");
        let summary = schedule.summary();
        assert_eq!(summary.total_validators, 2);
        assert_eq!(summary.total_buckets, 2);
        assert_eq!(summary.first_sweep_time, "1d 1h 1m");
        assert_eq!(summary.total_queue_duration, "13h 0m");
        assert_eq!(summary.buckets_overview[1].time, "1d 13h 1m");
    }

    #[rstest]
    #[case(0, "0m")]
    #[case(59, "0m")]
    #[case(7_380, "2h 3m")]
    #[case(93_780, "1d 2h 3m")]
    fn test_format_duration(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_duration(seconds), expected);
    }
}
