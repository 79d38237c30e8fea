//! Core Data Models
//!
//! This module defines the data structures shared by the accounting pipeline,
//! from a single finished job up to the per-owner and per-user totals handed
//! to the report projector.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`JobRecord`] - One finished job (or array task) from the accounting log
//! 2. **Accumulation**: [`UsageTotals`] - Job count plus raw and adjusted core seconds
//! 3. **Summaries**: [`OwnerSummary`] - Per equipment owner roll-up including distinct users
//!
//! ## Features
//!
//! - **Monoid totals**: [`UsageTotals`] adds pointwise, `UsageTotals::default()` is the identity
//! - **Serde Integration**: Result types serialize with stable snake_case field names
//! - **Diagnostics**: [`JobRecord::job_id`] gives the `job.task` name used in warnings

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Equipment owner assigned when a record cannot be classified.
pub const UNKNOWN_OWNER: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub queue: String,
    /// Short hostname, DNS domain already removed.
    pub hostname: String,
    /// Submitting user (the Grid Engine "owner" field).
    pub user: String,
    pub job_name: String,
    pub job_number: u64,
    pub task_number: u64,
    pub project: String,
    pub start_time: i64,
    pub end_time: i64,
    pub wallclock_seconds: f64,
    pub slot_count: u32,
    /// Resource request string, e.g. `-U grp -l h_rt=48:00:00,h_vmem=4G`.
    pub category: String,
    pub equipment_owner: String,
}

impl JobRecord {
    /// `job.task`, with non-array jobs (task 0) shown as task 1.
    pub fn job_id(&self) -> String {
        let task = if self.task_number == 0 { 1 } else { self.task_number };
        format!("{}.{}", self.job_number, task)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub job_count: u64,
    pub raw_core_seconds: f64,
    pub adjusted_core_seconds: f64,
}

impl UsageTotals {
    pub fn single_job(raw_core_seconds: f64, adjusted_core_seconds: f64) -> Self {
        Self {
            job_count: 1,
            raw_core_seconds,
            adjusted_core_seconds,
        }
    }

    pub fn raw_core_hours(&self) -> f64 {
        self.raw_core_seconds / 3600.0
    }

    pub fn adjusted_core_hours(&self) -> f64 {
        self.adjusted_core_seconds / 3600.0
    }
}

impl Add for UsageTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            job_count: self.job_count + other.job_count,
            raw_core_seconds: self.raw_core_seconds + other.raw_core_seconds,
            adjusted_core_seconds: self.adjusted_core_seconds + other.adjusted_core_seconds,
        }
    }
}

impl AddAssign for UsageTotals {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::iter::Sum for UsageTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub distinct_users: u64,
    pub job_count: u64,
    pub raw_core_seconds: f64,
    pub adjusted_core_seconds: f64,
}

impl OwnerSummary {
    pub fn totals(&self) -> UsageTotals {
        UsageTotals {
            job_count: self.job_count,
            raw_core_seconds: self.raw_core_seconds,
            adjusted_core_seconds: self.adjusted_core_seconds,
        }
    }

    pub(crate) fn absorb(&mut self, totals: UsageTotals, new_user: bool) {
        if new_user {
            self.distinct_users += 1;
        }
        self.job_count += totals.job_count;
        self.raw_core_seconds += totals.raw_core_seconds;
        self.adjusted_core_seconds += totals.adjusted_core_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_task_zero() {
        let mut record = sample_record();
        assert_eq!(record.job_id(), "4242.1");
        record.task_number = 7;
        assert_eq!(record.job_id(), "4242.7");
    }

    #[test]
    fn test_totals_identity_and_sum() {
        let a = UsageTotals::single_job(10.0, 20.0);
        assert_eq!(a + UsageTotals::default(), a);

        let total: UsageTotals = vec![a, a, UsageTotals::single_job(1.0, 1.0)].into_iter().sum();
        assert_eq!(total.job_count, 3);
        assert_eq!(total.raw_core_seconds, 21.0);
        assert_eq!(total.adjusted_core_seconds, 41.0);
    }

    #[test]
    fn test_owner_summary_absorb() {
        let mut summary = OwnerSummary::default();
        summary.absorb(UsageTotals::single_job(3600.0, 7200.0), true);
        summary.absorb(UsageTotals::single_job(3600.0, 3600.0), false);
        assert_eq!(summary.distinct_users, 1);
        assert_eq!(summary.totals().job_count, 2);
        assert_eq!(summary.totals().adjusted_core_hours(), 3.0);
    }

    fn sample_record() -> JobRecord {
        JobRecord {
            queue: "48core.q".to_string(),
            hostname: "dc1s0b1a".to_string(),
            user: "abc".to_string(),
            job_name: "run.sh".to_string(),
            job_number: 4242,
            task_number: 0,
            project: "ENV_minphys".to_string(),
            start_time: 0,
            end_time: 3600,
            wallclock_seconds: 3600.0,
            slot_count: 1,
            category: String::new(),
            equipment_owner: UNKNOWN_OWNER.to_string(),
        }
    }
}
