//! Usage Aggregation
//!
//! Folds classified job records into two levels of totals: per equipment
//! owner and user, and per user across every owner. Each owner also carries a
//! running [`OwnerSummary`].
//!
//! ## Monoid structure
//!
//! [`UsageAggregate`] is built purely by adding [`UsageTotals`], so partial
//! aggregates over disjoint record sets can be combined with
//! [`UsageAggregate::merge`] in any order. [`UsageAggregator::fold_parallel`]
//! (feature `parallel`) relies on exactly this to split work with rayon.
//!
//! ## Invariants
//!
//! - Sum of owner summary job counts == sum of user job counts == records folded
//! - A user's global totals == sum of that user's totals under each owner
//!
//! Unadjusted jobs are counted in full, but only the first
//! [`MAX_WARNING_EXAMPLES`] of them are kept as [`DataQualityWarning`]s.

use crate::core_hours::{CoreHourCalculator, DataQualityWarning};
use crate::models::{JobRecord, OwnerSummary, UsageTotals};
use crate::node_memory::{DescriptorLookup, NodeMemoryResolver, NodeTypeLookup};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OwnerAggregate {
    pub users: BTreeMap<String, UsageTotals>,
    pub summary: OwnerSummary,
}

impl OwnerAggregate {
    pub fn add(&mut self, user: &str, totals: UsageTotals) {
        let new_user = match self.users.get_mut(user) {
            Some(existing) => {
                *existing += totals;
                false
            }
            None => {
                self.users.insert(user.to_string(), totals);
                true
            }
        };
        self.summary.absorb(totals, new_user);
    }

    pub fn merge(&mut self, other: OwnerAggregate) {
        for (user, totals) in other.users {
            self.add(&user, totals);
        }
    }
}

/// Warnings kept per aggregate; later ones only add to the count.
pub const MAX_WARNING_EXAMPLES: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageAggregate {
    pub owners: BTreeMap<String, OwnerAggregate>,
    pub users: BTreeMap<String, UsageTotals>,
    /// Jobs counted at raw time because memory information was missing.
    pub unadjusted_jobs: u64,
    /// The first of those jobs, in input order.
    pub warnings: Vec<DataQualityWarning>,
}

impl UsageAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, owner: &str, user: &str, totals: UsageTotals) {
        self.owners.entry(owner.to_string()).or_default().add(user, totals);
        *self.users.entry(user.to_string()).or_default() += totals;
    }

    pub fn note_warning(&mut self, warning: DataQualityWarning) {
        self.unadjusted_jobs += 1;
        if self.warnings.len() < MAX_WARNING_EXAMPLES {
            self.warnings.push(warning);
        }
    }

    /// Combine with an aggregate built from a disjoint set of records.
    pub fn merge(mut self, other: UsageAggregate) -> Self {
        for (owner, aggregate) in other.owners {
            match self.owners.entry(owner) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(aggregate),
                Entry::Vacant(slot) => {
                    slot.insert(aggregate);
                }
            }
        }
        for (user, totals) in other.users {
            *self.users.entry(user).or_default() += totals;
        }
        self.unadjusted_jobs += other.unadjusted_jobs;
        let room = MAX_WARNING_EXAMPLES.saturating_sub(self.warnings.len());
        self.warnings.extend(other.warnings.into_iter().take(room));
        self
    }

    pub fn owner_summaries(&self) -> BTreeMap<&str, OwnerSummary> {
        self.owners
            .iter()
            .map(|(owner, aggregate)| (owner.as_str(), aggregate.summary))
            .collect()
    }

    /// Totals over every owner.
    pub fn grand_total(&self) -> UsageTotals {
        self.owners.values().map(|o| o.summary.totals()).sum()
    }

    /// Owners a user ran jobs under, in name order.
    pub fn owners_of(&self, user: &str) -> Vec<&str> {
        self.owners
            .iter()
            .filter(|(_, aggregate)| aggregate.users.contains_key(user))
            .map(|(owner, _)| owner.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Resolves memory per core and core hours for each record and folds the
/// results into a [`UsageAggregate`].
pub struct UsageAggregator<L = DescriptorLookup> {
    resolver: NodeMemoryResolver<L>,
    calculator: CoreHourCalculator,
}

impl<L: NodeTypeLookup> UsageAggregator<L> {
    pub fn new(resolver: NodeMemoryResolver<L>) -> Self {
        Self {
            resolver,
            calculator: CoreHourCalculator::new(),
        }
    }

    pub fn accumulate(&self, aggregate: &mut UsageAggregate, record: &JobRecord) {
        let memory_per_core = self.resolver.resolve(record);
        let (hours, warning) = self.calculator.compute(record, memory_per_core);

        aggregate.record(
            &record.equipment_owner,
            &record.user,
            UsageTotals::single_job(hours.raw_core_seconds, hours.adjusted_core_seconds),
        );
        if let Some(warning) = warning {
            aggregate.note_warning(warning);
        }
    }

    pub fn fold<'a, I>(&self, records: I) -> UsageAggregate
    where
        I: IntoIterator<Item = &'a JobRecord>,
    {
        records.into_iter().fold(UsageAggregate::new(), |mut aggregate, record| {
            self.accumulate(&mut aggregate, record);
            aggregate
        })
    }

    /// Same result as [`fold`](Self::fold), computed over rayon partitions.
    #[cfg(feature = "parallel")]
    pub fn fold_parallel(&self, records: &[JobRecord]) -> UsageAggregate
    where
        L: Sync,
    {
        use rayon::prelude::*;

        records
            .par_iter()
            .fold(UsageAggregate::new, |mut aggregate, record| {
                self.accumulate(&mut aggregate, record);
                aggregate
            })
            .reduce(UsageAggregate::new, UsageAggregate::merge)
    }
}
