//! SGE Accounting Library
//!
//! Reads Grid Engine accounting files and reports core-hour usage per
//! equipment owner and per user over a date window, with a memory-adjusted
//! figure that charges jobs for the cores their memory request blocked.
//!
//! ## Architecture Overview
//!
//! - [`date_range`] - `--date` expressions to half-open epoch windows
//! - [`parser`] - Streaming accounting-file reader producing [`JobRecord`]s
//! - [`quantity`] - Grid Engine size and duration literals
//! - [`category`] - Resource requests and node-type descriptors from a job's category
//! - [`node_memory`] - Memory-per-core resolution by node type or hostname rule
//! - [`core_hours`] - Raw and adjusted core seconds for one job
//! - [`classify`] - Equipment owner classification and record filtering
//! - [`aggregator`] - Per-owner and per-user usage totals
//! - [`report`] - Ranked, percentage-bearing report rows
//! - [`display`] - Text tables and JSON output
//! - [`analyzer`] - Pipeline for one report run
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! ## Main Entry Point
//!
//! ```no_run
//! use sge_accounting::{AccountingAnalyzer, ReportOptions};
//! use sge_accounting::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let analyzer = AccountingAnalyzer::new(&Config::load(None)?)?;
//! let outcome = analyzer.analyze(&ReportOptions {
//!     date: Some("201803".to_string()),
//!     accounting_files: vec!["accounting".into()],
//!     ..ReportOptions::default()
//! })?;
//! println!("{} owners", outcome.aggregate.owners.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod category;
pub mod classify;
pub mod config;
pub mod core_hours;
pub mod date_range;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod node_memory;
pub mod parser;
pub mod quantity;
pub mod report;

pub use aggregator::{UsageAggregate, UsageAggregator};
pub use analyzer::{AccountingAnalyzer, AnalysisOutcome, ReportOptions};
pub use core_hours::{CoreHourCalculator, CoreHours, DataQualityWarning};
pub use date_range::{DatePrecision, DateRange, PartialDate};
pub use error::{AccountingError, Result};
pub use models::*;
pub use node_memory::{HostnameMemoryRule, NodeMemoryProfile, NodeMemoryResolver, NodeTypeLookup};
pub use report::{ReportKind, UsageReport};
