//! Day management for a strategy run
//!
//! A run operates in whole days counted from exposure (day 0). Diagnostic
//! tests split the run into segments; each test day appears twice in the
//! trajectory (once before and once after the test is applied).

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Closed day interval `[start, end]` between two consecutive test days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    /// Whether a test is applied to the state at `end`
    pub ends_with_test: bool,
}

impl Segment {
    /// Number of days covered after `start`
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Last simulated day plus the sorted days on which tests are taken
///
/// # Example
/// ```
/// use npi_strategy_core_rs::TestSchedule;
///
/// let schedule = TestSchedule::new(10, vec![3, 7]).unwrap();
/// assert_eq!(schedule.row_count(), 13); // 11 days + 2 post-test rows
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSchedule {
    end_day: usize,
    test_days: Vec<usize>,
}

impl TestSchedule {
    /// Create a schedule, rejecting unsorted, duplicate or out-of-range days
    pub fn new(end_day: usize, test_days: Vec<usize>) -> Result<Self, ModelError> {
        if test_days.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ModelError::invalid(format!(
                "test days must be strictly increasing, got {:?}",
                test_days
            )));
        }
        if let Some(&last) = test_days.last() {
            if last > end_day {
                return Err(ModelError::invalid(format!(
                    "test day {} lies beyond the last day {}",
                    last, end_day
                )));
            }
        }
        Ok(Self { end_day, test_days })
    }

    /// Schedule without any tests
    pub fn untested(end_day: usize) -> Self {
        Self {
            end_day,
            test_days: Vec::new(),
        }
    }

    pub fn end_day(&self) -> usize {
        self.end_day
    }

    pub fn test_days(&self) -> &[usize] {
        &self.test_days
    }

    /// Rows of a tested trajectory: one per day plus one per test
    pub fn row_count(&self) -> usize {
        self.end_day + self.test_days.len() + 1
    }

    /// Partition `[0, end_day]` at the test days
    ///
    /// The final segment always runs untested up to `end_day`, even when it
    /// is empty (a test on the last day still gets its post-test row).
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::with_capacity(self.test_days.len() + 1);
        let mut start = 0;
        for &day in &self.test_days {
            segments.push(Segment {
                start,
                end: day,
                ends_with_test: true,
            });
            start = day;
        }
        segments.push(Segment {
            start,
            end: self.end_day,
            ends_with_test: false,
        });
        segments
    }

    /// Day (since exposure) of every row of a tested trajectory
    pub fn row_days(&self) -> Vec<usize> {
        let mut days = Vec::with_capacity(self.row_count());
        for segment in self.segments() {
            days.extend(segment.start..=segment.end);
        }
        days
    }
}

/// Strategy timeline: a test schedule shifted by the delay between
/// exposure and the start of the strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    time_offset: usize,
    schedule: TestSchedule,
}

impl Timeline {
    /// `duration` counts days after the offset; tests are days from exposure
    pub fn new(time_offset: usize, duration: usize, test_days: Vec<usize>) -> Result<Self, ModelError> {
        let schedule = TestSchedule::new(time_offset + duration, test_days)?;
        Ok(Self {
            time_offset,
            schedule,
        })
    }

    pub fn time_offset(&self) -> usize {
        self.time_offset
    }

    pub fn end_day(&self) -> usize {
        self.schedule.end_day()
    }

    pub fn schedule(&self) -> &TestSchedule {
        &self.schedule
    }

    /// Calendar day relative to the strategy start
    pub fn calendar_day(&self, day: usize) -> i64 {
        day as i64 - self.time_offset as i64
    }

    /// Calendar days aligned with the rows of a tested trajectory
    pub fn evaluation_points_with_tests(&self) -> Vec<i64> {
        self.schedule
            .row_days()
            .into_iter()
            .map(|day| self.calendar_day(day))
            .collect()
    }

    /// Calendar days aligned with the rows of an untested trajectory
    pub fn evaluation_points_without_tests(&self) -> Vec<i64> {
        (0..=self.end_day()).map(|day| self.calendar_day(day)).collect()
    }
}

// ============================================================================
// Deserialization
// ============================================================================

// Deserialized values go through the validating constructors.

#[derive(Deserialize)]
struct ScheduleRecord {
    end_day: usize,
    test_days: Vec<usize>,
}

#[derive(Deserialize)]
struct TimelineRecord {
    time_offset: usize,
    schedule: ScheduleRecord,
}

impl<'de> Deserialize<'de> for TestSchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ScheduleRecord::deserialize(deserializer)?;
        TestSchedule::new(record.end_day, record.test_days).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Timeline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = TimelineRecord::deserialize(deserializer)?;
        let schedule = TestSchedule::new(record.schedule.end_day, record.schedule.test_days)
            .map_err(de::Error::custom)?;
        if schedule.end_day() < record.time_offset {
            return Err(de::Error::custom(ModelError::invalid(format!(
                "timeline ends on day {} before its offset {}",
                schedule.end_day(),
                record.time_offset
            ))));
        }
        Ok(Self {
            time_offset: record.time_offset,
            schedule,
        })
    }
}
