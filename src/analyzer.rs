//! Accounting Analysis Engine
//!
//! This module ties the pipeline together for one report run. It is the
//! entry point used by the binary and by integration tests.
//!
//! ## Processing Pipeline
//!
//! 1. **Resolve**: The `--date` expression becomes a [`DateRange`]; a bad
//!    expression aborts the run before any file is opened
//! 2. **Read**: Each accounting file is streamed line by line
//! 3. **Classify**: Every record gets its equipment owner
//! 4. **Filter**: Date range, queue and owner selection
//! 5. **Aggregate**: Core hours are computed and folded per owner and user
//! 6. **Project**: Aggregates become ranked rows with percentages
//! 7. **Display**: Text tables or JSON
//!
//! ## Usage Example
//!
//! ```no_run
//! use sge_accounting::analyzer::{AccountingAnalyzer, ReportOptions};
//! use sge_accounting::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let analyzer = AccountingAnalyzer::new(&config)?;
//! let options = ReportOptions {
//!     date: Some("2018".to_string()),
//!     accounting_files: vec!["/opt/sge/default/common/accounting".into()],
//!     ..ReportOptions::default()
//! };
//! analyzer.run(&options)?;
//! # Ok(())
//! # }
//! ```

use crate::aggregator::{UsageAggregate, UsageAggregator};
use crate::classify::{OwnerClassifier, RecordFilter};
use crate::config::Config;
use crate::date_range::DateRange;
use crate::display::DisplayManager;
use crate::node_memory::NodeMemoryResolver;
use crate::parser::{default_accounting_file, AccountingReader, ParseStats};
use crate::report::{ReportKind, ReportProjector, UsageReport};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, info_span, warn};

/// Options for a single report run. Empty lists mean "no restriction" or
/// "use the configured default".
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub date: Option<String>,
    pub accounting_files: Vec<PathBuf>,
    pub queues: Vec<String>,
    pub skip_queues: Vec<String>,
    pub owners: Vec<String>,
    pub skip_owners: Vec<String>,
    pub core_owners: bool,
    pub limit_users: Option<usize>,
    pub cores: Option<u64>,
    pub reports: Vec<ReportKind>,
    pub json_output: bool,
}

/// Result of a run before display.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub range: DateRange,
    pub aggregate: UsageAggregate,
    pub stats: ParseStats,
    pub report: UsageReport,
}

pub struct AccountingAnalyzer {
    max_date: String,
    default_reports: Vec<ReportKind>,
    default_cores: u64,
    default_limit_users: Option<usize>,
    default_files: Vec<PathBuf>,
    core_owners: Vec<String>,
    owner_parents: HashMap<String, String>,
    classifier: OwnerClassifier,
    aggregator: UsageAggregator,
    display_manager: DisplayManager,
}

impl AccountingAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        let rules = config
            .memory
            .compile_rules()
            .context("Invalid hostname memory rules")?;

        Ok(Self {
            max_date: config.report.max_date.clone(),
            default_reports: config.report_kinds()?,
            default_cores: config.report.cores,
            default_limit_users: config.report.limit_users,
            default_files: config.paths.accounting_files.clone(),
            core_owners: config.owners.core_owners.clone(),
            owner_parents: config.owners.owner_parent.clone(),
            classifier: OwnerClassifier::new(
                config.owners.queue_owner.clone(),
                config.owners.owner_owner.clone(),
            ),
            aggregator: UsageAggregator::new(NodeMemoryResolver::with_rules(rules)),
            display_manager: DisplayManager::new(),
        })
    }

    pub fn resolve_range(&self, date: Option<&str>) -> Result<DateRange> {
        DateRange::resolve(date, &self.max_date).context("Invalid --date")
    }

    fn build_filter(&self, range: DateRange, options: &ReportOptions) -> RecordFilter {
        let owners = if options.core_owners {
            self.core_owners.clone()
        } else {
            options.owners.clone()
        };

        RecordFilter {
            range,
            queues: options.queues.iter().cloned().collect(),
            skip_queues: options.skip_queues.iter().cloned().collect(),
            owners: owners.into_iter().collect(),
            skip_owners: options.skip_owners.iter().cloned().collect(),
        }
    }

    fn accounting_files(&self, options: &ReportOptions) -> Result<Vec<PathBuf>> {
        if !options.accounting_files.is_empty() {
            return Ok(options.accounting_files.clone());
        }
        if !self.default_files.is_empty() {
            return Ok(self.default_files.clone());
        }
        default_accounting_file().map(|p| vec![p]).context(
            "No accounting file given and SGE_ROOT/SGE_CELL are not set (use --accountingfile)",
        )
    }

    /// Read, classify, filter and fold all configured accounting files.
    pub fn aggregate(&self, range: DateRange, options: &ReportOptions) -> Result<(UsageAggregate, ParseStats)> {
        let filter = self.build_filter(range, options);
        let mut aggregate = UsageAggregate::new();
        let mut stats = ParseStats::default();

        for path in self.accounting_files(options)? {
            let _span = info_span!("accounting_file", path = %path.display()).entered();
            let mut reader = AccountingReader::open(&path)?;

            for mut record in reader.by_ref() {
                self.classifier.classify(&mut record);
                if filter.accepts(&record) {
                    self.aggregator.accumulate(&mut aggregate, &record);
                }
            }

            if let Some(e) = reader.take_error() {
                return Err(e).with_context(|| format!("Failed reading {}", path.display()));
            }

            let file_stats = reader.stats();
            info!(
                lines = file_stats.lines,
                records = file_stats.records,
                skipped = file_stats.skipped,
                "Finished accounting file"
            );
            stats.lines += file_stats.lines;
            stats.records += file_stats.records;
            stats.skipped += file_stats.skipped;
        }

        if aggregate.unadjusted_jobs > 0 {
            warn!(
                jobs = aggregate.unadjusted_jobs,
                "Jobs counted without memory adjustment"
            );
        }

        Ok((aggregate, stats))
    }

    pub fn analyze(&self, options: &ReportOptions) -> Result<AnalysisOutcome> {
        let range = self.resolve_range(options.date.as_deref())?;
        info!(start = range.start, end = range.end, "Resolved report window");

        let (aggregate, stats) = self.aggregate(range, options)?;

        let kinds = if options.reports.is_empty() {
            self.default_reports.as_slice()
        } else {
            options.reports.as_slice()
        };
        let projector = ReportProjector::new(
            range,
            options.cores.unwrap_or(self.default_cores),
            options.limit_users.or(self.default_limit_users),
            &self.owner_parents,
        );
        let report = projector.project(&aggregate, kinds);

        Ok(AnalysisOutcome {
            range,
            aggregate,
            stats,
            report,
        })
    }

    pub fn run(&self, options: &ReportOptions) -> Result<()> {
        let outcome = self.analyze(options)?;

        if options.json_output {
            self.display_manager.display_json(&outcome.report, &outcome.aggregate.warnings)?;
        } else {
            self.display_manager.display_report(&outcome.report);
        }

        Ok(())
    }
}
