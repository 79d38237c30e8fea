//! Raw and memory-adjusted core time for a single job.
//!
//! A job that asks for more memory per slot than a node has per core keeps
//! other cores idle. Adjusted time bills those cores too:
//! `adjusted = wallclock * slots * ceil(h_vmem / memory_per_core)`.

use crate::category;
use crate::models::JobRecord;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoreHours {
    pub raw_core_seconds: f64,
    pub adjusted_core_seconds: f64,
    /// Core equivalents billed per slot; `None` when no adjustment was possible.
    pub multiplier: Option<u64>,
}

/// A job counted at unadjusted time because its memory request or the
/// node's memory per core could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityWarning {
    pub job_id: String,
    pub job_name: String,
    pub category: String,
    pub memory_request_known: bool,
    pub memory_per_core_known: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoreHourCalculator;

impl CoreHourCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(
        &self,
        record: &JobRecord,
        memory_per_core: Option<u64>,
    ) -> (CoreHours, Option<DataQualityWarning>) {
        let raw = record.wallclock_seconds * f64::from(record.slot_count);
        let memory_request = category::memory_request(&record.category);

        match (memory_request, memory_per_core) {
            (Some(request), Some(per_core)) if per_core > 0 => {
                let multiplier = request.div_ceil(per_core).max(1);
                let hours = CoreHours {
                    raw_core_seconds: raw,
                    adjusted_core_seconds: raw * multiplier as f64,
                    multiplier: Some(multiplier),
                };
                (hours, None)
            }
            _ => {
                let warning = DataQualityWarning {
                    job_id: record.job_id(),
                    job_name: record.job_name.clone(),
                    category: record.category.clone(),
                    memory_request_known: memory_request.is_some(),
                    memory_per_core_known: memory_per_core.is_some_and(|m| m > 0),
                };
                warn!(
                    job_id = %warning.job_id,
                    job_name = %warning.job_name,
                    category = %warning.category,
                    memory_request_known = warning.memory_request_known,
                    memory_per_core_known = warning.memory_per_core_known,
                    "Could not extract memory request or node memory per core, using unadjusted time"
                );
                let hours = CoreHours {
                    raw_core_seconds: raw,
                    adjusted_core_seconds: raw,
                    multiplier: None,
                };
                (hours, Some(warning))
            }
        }
    }
}
