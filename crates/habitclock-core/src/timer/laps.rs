use serde::{Deserialize, Serialize};

/// One stopwatch checkpoint as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lap {
    /// 1-based, in recording order.
    pub number: usize,
    /// Stopwatch reading when the lap was taken.
    pub cumulative_ms: i64,
    /// Time since the previous lap (or since start for the first one).
    pub split_ms: i64,
}

/// Cumulative lap readings, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapList {
    cumulative: Vec<i64>,
}

impl LapList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, cumulative_ms: i64) {
        self.cumulative.insert(0, cumulative_ms);
    }

    pub fn clear(&mut self) {
        self.cumulative.clear();
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    pub fn cumulative(&self) -> &[i64] {
        &self.cumulative
    }

    /// Laps with their split durations, most recent first.
    pub fn laps(&self) -> Vec<Lap> {
        let total = self.cumulative.len();
        lap_durations(&self.cumulative)
            .into_iter()
            .zip(&self.cumulative)
            .enumerate()
            .map(|(i, (split_ms, &cumulative_ms))| Lap {
                number: total - i,
                cumulative_ms,
                split_ms,
            })
            .collect()
    }
}

/// Split durations for cumulative readings ordered most recent first.
///
/// Each split is the reading minus the next-older reading; the oldest lap's
/// split is its full reading.
pub fn lap_durations(cumulative: &[i64]) -> Vec<i64> {
    cumulative
        .iter()
        .enumerate()
        .map(|(i, &ms)| ms - cumulative.get(i + 1).copied().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_from_cumulative_readings() {
        assert_eq!(
            lap_durations(&[30_000, 20_000, 10_000]),
            vec![10_000, 10_000, 10_000]
        );
        assert_eq!(lap_durations(&[45_000, 12_000]), vec![33_000, 12_000]);
        assert!(lap_durations(&[]).is_empty());
    }

    #[test]
    fn record_keeps_most_recent_first() {
        let mut laps = LapList::new();
        laps.record(1_500);
        laps.record(4_000);
        let view = laps.laps();
        assert_eq!(view[0], Lap { number: 2, cumulative_ms: 4_000, split_ms: 2_500 });
        assert_eq!(view[1], Lap { number: 1, cumulative_ms: 1_500, split_ms: 1_500 });
    }

    proptest::proptest! {
        #[test]
        fn splits_sum_to_latest_reading(mut readings in proptest::collection::vec(0i64..10_000_000, 1..20)) {
            readings.sort_unstable_by(|a, b| b.cmp(a));
            let splits = lap_durations(&readings);
            proptest::prop_assert_eq!(splits.iter().sum::<i64>(), readings[0]);
            proptest::prop_assert!(splits.iter().all(|&s| s >= 0));
        }
    }
}
