//! Report projection.
//!
//! Turns a [`UsageAggregate`] into ranked rows with core hours, utilization
//! and usage shares. Utilization is core time over the capacity of the
//! reporting window (`duration * cores`), so it is only meaningful when a
//! core count is supplied; with zero cores it is reported as 0.

use crate::aggregator::UsageAggregate;
use crate::date_range::DateRange;
use crate::models::UsageTotals;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Header,
    Totals,
    Owners,
    Users,
    UsersByOwner,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Header,
        ReportKind::Totals,
        ReportKind::Owners,
        ReportKind::Users,
        ReportKind::UsersByOwner,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Header => "header",
            ReportKind::Totals => "totals",
            ReportKind::Owners => "owners",
            ReportKind::Users => "users",
            ReportKind::UsersByOwner => "usersbyowner",
        }
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                format!(
                    "unknown report '{s}', expected one of: {}",
                    ReportKind::ALL.map(|k| k.name()).join(", ")
                )
            })
    }
}

/// Hours and percentages derived from one [`UsageTotals`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageFigures {
    pub jobs: u64,
    pub core_hours: f64,
    pub utilization_pct: f64,
    pub adjusted_core_hours: f64,
    pub adjusted_utilization_pct: f64,
    pub usage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub start: i64,
    pub end: i64,
    pub duration_hours: i64,
    pub cores: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub owners: usize,
    pub unique_users: usize,
    #[serde(flatten)]
    pub figures: UsageFigures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerRow {
    pub owner: String,
    pub parent: String,
    pub users: u64,
    #[serde(flatten)]
    pub figures: UsageFigures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub user: String,
    /// Owners the user ran under; empty in per-owner tables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    #[serde(flatten)]
    pub figures: UsageFigures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTable {
    pub active_users: usize,
    pub rows: Vec<UserRow>,
    /// Over all users, not only the rows shown.
    pub totals: UsageFigures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerUsers {
    pub owner: String,
    #[serde(flatten)]
    pub table: UserTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnersTable {
    pub rows: Vec<OwnerRow>,
    /// `unique_users` rather than a column sum, since users span owners.
    pub totals: TotalsRow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<TotalsRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<OwnersTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<UserTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_by_owner: Option<Vec<OwnerUsers>>,
    pub warnings: u64,
}

pub struct ReportProjector<'a> {
    range: DateRange,
    cores: u64,
    limit_users: usize,
    owner_parents: &'a HashMap<String, String>,
}

impl<'a> ReportProjector<'a> {
    pub fn new(
        range: DateRange,
        cores: u64,
        limit_users: Option<usize>,
        owner_parents: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            range,
            cores,
            limit_users: limit_users.unwrap_or(usize::MAX),
            owner_parents,
        }
    }

    /// Reciprocal of the window's core-second capacity, or 0 without cores.
    fn inverse_capacity(&self) -> f64 {
        let capacity = self.range.duration_seconds() as f64 * self.cores as f64;
        if capacity > 0.0 {
            1.0 / capacity
        } else {
            0.0
        }
    }

    pub fn figures(&self, totals: &UsageTotals, adjusted_total: f64) -> UsageFigures {
        let inv = self.inverse_capacity();
        UsageFigures {
            jobs: totals.job_count,
            core_hours: totals.raw_core_hours(),
            utilization_pct: totals.raw_core_seconds * inv * 100.0,
            adjusted_core_hours: totals.adjusted_core_hours(),
            adjusted_utilization_pct: totals.adjusted_core_seconds * inv * 100.0,
            usage_pct: percent_of(totals.adjusted_core_seconds, adjusted_total),
        }
    }

    pub fn header(&self) -> Header {
        Header {
            start: self.range.start,
            end: self.range.end,
            duration_hours: self.range.duration_seconds() / 3600,
            cores: self.cores,
        }
    }

    pub fn totals(&self, aggregate: &UsageAggregate) -> TotalsRow {
        let total = aggregate.grand_total();
        TotalsRow {
            owners: aggregate.owners.len(),
            unique_users: aggregate.users.len(),
            figures: self.figures(&total, total.adjusted_core_seconds),
        }
    }

    /// Owners by adjusted core time, largest first.
    pub fn owners(&self, aggregate: &UsageAggregate) -> OwnersTable {
        let adjusted_total = aggregate.grand_total().adjusted_core_seconds;
        let mut ranked: Vec<_> = aggregate.owners.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.summary
                .adjusted_core_seconds
                .total_cmp(&a.1.summary.adjusted_core_seconds)
                .then_with(|| a.0.cmp(b.0))
        });

        let rows = ranked
            .into_iter()
            .map(|(owner, data)| OwnerRow {
                owner: owner.clone(),
                parent: self.parent_of(owner),
                users: data.summary.distinct_users,
                figures: self.figures(&data.summary.totals(), adjusted_total),
            })
            .collect();

        OwnersTable {
            rows,
            totals: self.totals(aggregate),
        }
    }

    /// Top users across all owners.
    pub fn users(&self, aggregate: &UsageAggregate) -> UserTable {
        let table = self.user_table(&aggregate.users);
        let rows = table
            .rows
            .into_iter()
            .map(|mut row| {
                row.owners = aggregate.owners_of(&row.user).into_iter().map(str::to_string).collect();
                row
            })
            .collect();
        UserTable { rows, ..table }
    }

    /// Top users within each owner, owners in name order. Usage shares are
    /// relative to the owner's own adjusted total.
    pub fn users_by_owner(&self, aggregate: &UsageAggregate) -> Vec<OwnerUsers> {
        aggregate
            .owners
            .iter()
            .map(|(owner, data)| OwnerUsers {
                owner: owner.clone(),
                table: self.user_table(&data.users),
            })
            .collect()
    }

    pub fn project(&self, aggregate: &UsageAggregate, kinds: &[ReportKind]) -> UsageReport {
        let wants = |kind: ReportKind| kinds.contains(&kind);
        UsageReport {
            header: wants(ReportKind::Header).then(|| self.header()),
            totals: wants(ReportKind::Totals).then(|| self.totals(aggregate)),
            owners: wants(ReportKind::Owners).then(|| self.owners(aggregate)),
            users: wants(ReportKind::Users).then(|| self.users(aggregate)),
            users_by_owner: wants(ReportKind::UsersByOwner).then(|| self.users_by_owner(aggregate)),
            warnings: aggregate.unadjusted_jobs,
        }
    }

    fn user_table<'m, I>(&self, users: I) -> UserTable
    where
        I: IntoIterator<Item = (&'m String, &'m UsageTotals)>,
    {
        let mut ranked: Vec<_> = users.into_iter().collect();
        let total: UsageTotals = ranked.iter().map(|(_, totals)| **totals).sum();
        ranked.sort_by(|a, b| {
            b.1.adjusted_core_seconds
                .total_cmp(&a.1.adjusted_core_seconds)
                .then_with(|| a.0.cmp(b.0))
        });

        let active_users = ranked.len();
        let rows = ranked
            .into_iter()
            .take(self.limit_users)
            .map(|(user, totals)| UserRow {
                user: user.clone(),
                owners: Vec::new(),
                figures: self.figures(totals, total.adjusted_core_seconds),
            })
            .collect();

        UserTable {
            active_users,
            rows,
            totals: self.figures(&total, total.adjusted_core_seconds),
        }
    }

    fn parent_of(&self, owner: &str) -> String {
        self.owner_parents
            .get(owner)
            .cloned()
            .unwrap_or_else(|| crate::models::UNKNOWN_OWNER.to_string())
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
