//! Equipment owner classification and record filtering.
//!
//! The owner is taken from the job's project (`arc_ENV` → `ENV`), then
//! overridden by the queue the job ran in for clusters where the project
//! alone does not distinguish owners, then passed through a rename table for
//! owners that merged or changed names.

use crate::date_range::DateRange;
use crate::models::{JobRecord, UNKNOWN_OWNER};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static PROJECT_OWNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+_)?(\S+)").expect("static regex is valid"));

#[derive(Debug, Clone, Default)]
pub struct OwnerClassifier {
    queue_owner: HashMap<String, String>,
    owner_owner: HashMap<String, String>,
}

impl OwnerClassifier {
    pub fn new(queue_owner: HashMap<String, String>, owner_owner: HashMap<String, String>) -> Self {
        Self { queue_owner, owner_owner }
    }

    pub fn owner_for(&self, project: &str, queue: &str) -> String {
        let Some(caps) = PROJECT_OWNER.captures(project) else {
            return UNKNOWN_OWNER.to_string();
        };

        let owner = self
            .queue_owner
            .get(queue)
            .map(String::as_str)
            .unwrap_or_else(|| caps.get(2).map_or(UNKNOWN_OWNER, |m| m.as_str()));

        self.owner_owner
            .get(owner)
            .cloned()
            .unwrap_or_else(|| owner.to_string())
    }

    pub fn classify(&self, record: &mut JobRecord) {
        record.equipment_owner = self.owner_for(&record.project, &record.queue);
    }
}

/// Selects the records a report covers. Empty allow-lists allow everything.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub range: DateRange,
    pub queues: HashSet<String>,
    pub skip_queues: HashSet<String>,
    pub owners: HashSet<String>,
    pub skip_owners: HashSet<String>,
}

impl RecordFilter {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            queues: HashSet::new(),
            skip_queues: HashSet::new(),
            owners: HashSet::new(),
            skip_owners: HashSet::new(),
        }
    }

    /// Must be called after classification, since owner lists test
    /// `equipment_owner`.
    pub fn accepts(&self, record: &JobRecord) -> bool {
        if !self.range.contains_job(record.start_time, record.end_time) {
            return false;
        }

        if self.skip_queues.contains(&record.queue) {
            return false;
        }
        if !self.queues.is_empty() && !self.queues.contains(&record.queue) {
            return false;
        }

        if self.skip_owners.contains(&record.equipment_owner) {
            return false;
        }
        if !self.owners.is_empty() && !self.owners.contains(&record.equipment_owner) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> OwnerClassifier {
        OwnerClassifier::new(
            HashMap::from([("chem1.q".to_string(), "chem".to_string())]),
            HashMap::from([("ISS".to_string(), "ARC".to_string())]),
        )
    }

    fn record(queue: &str, owner: &str, start: i64, end: i64) -> JobRecord {
        JobRecord {
            queue: queue.to_string(),
            hostname: "node1".to_string(),
            user: "u".to_string(),
            job_name: "j".to_string(),
            job_number: 1,
            task_number: 0,
            project: owner.to_string(),
            start_time: start,
            end_time: end,
            wallclock_seconds: (end - start) as f64,
            slot_count: 1,
            category: String::new(),
            equipment_owner: owner.to_string(),
        }
    }

    #[test]
    fn test_owner_from_project() {
        let c = classifier();
        assert_eq!(c.owner_for("arc_ENV", "48core.q"), "ENV");
        assert_eq!(c.owner_for("MAPS", "48core.q"), "MAPS");
        assert_eq!(c.owner_for("", "48core.q"), UNKNOWN_OWNER);
    }

    #[test]
    fn test_queue_then_rename_mapping() {
        let c = classifier();
        assert_eq!(c.owner_for("arc_MAPS", "chem1.q"), "chem");
        assert_eq!(c.owner_for("ISS", "48core.q"), "ARC");
    }

    #[test]
    fn test_classify_sets_owner() {
        let mut r = record("chem1.q", "whatever", 0, 1);
        r.project = "arc_MAPS".to_string();
        classifier().classify(&mut r);
        assert_eq!(r.equipment_owner, "chem");
    }

    #[test]
    fn test_filter_by_range_queue_and_owner() {
        let mut filter = RecordFilter::new(DateRange { start: 100, end: 200 });
        assert!(filter.accepts(&record("a.q", "ENV", 50, 150)));
        assert!(!filter.accepts(&record("a.q", "ENV", 200, 250)));

        filter.skip_queues.insert("test.q".to_string());
        assert!(!filter.accepts(&record("test.q", "ENV", 150, 160)));

        filter.queues.insert("a.q".to_string());
        assert!(!filter.accepts(&record("b.q", "ENV", 150, 160)));

        filter.owners.insert("ENV".to_string());
        assert!(filter.accepts(&record("a.q", "ENV", 150, 160)));
        assert!(!filter.accepts(&record("a.q", "FBS", 150, 160)));

        filter.skip_owners.insert("ENV".to_string());
        assert!(!filter.accepts(&record("a.q", "ENV", 150, 160)));
    }
}
