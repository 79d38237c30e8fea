//! Performance benchmarks for accounting parsing and the usage fold
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sge_accounting::aggregator::UsageAggregator;
use sge_accounting::classify::OwnerClassifier;
use sge_accounting::config::Config;
use sge_accounting::node_memory::NodeMemoryResolver;
use sge_accounting::parser::{parse_line, AccountingReader};
use sge_accounting::JobRecord;
use std::io::Cursor;

const USERS: [&str; 5] = ["abc", "def", "ghi", "jkl", "mno"];
const PROJECTS: [&str; 4] = ["arc_ENV", "MAPS", "ISS", "ENG"];
const HOSTS: [&str; 4] = ["dc1s0b1a", "h1s3b2", "c2s0b1n3", "gpu01"];

/// Generate accounting text with the given number of job lines
fn generate_accounting(num_lines: usize, include_errors: bool) -> String {
    let mut lines = Vec::with_capacity(num_lines + 1);
    lines.push("# Version: 8.1.9".to_string());

    for i in 0..num_lines {
        if include_errors && i % 10 == 5 {
            lines.push("truncated:line".to_string());
            continue;
        }
        let end = 1_514_764_800 + (i as i64) * 60;
        let wallclock = 60 + (i % 7200);
        lines.push(format!(
            "48core.q:{host}.arc3.leeds.ac.uk:users:{user}:job{i}:{i}:sge:0:{sub}:{start}:{end}:0:0:{wallclock}:{wallclock}.0:1.0:1024:0:0:0:0:100:0:0:0:0:0:0:0:10:5:{project}:defaultdepartment:smp:{slots}:0:1.0:1.0:0.1:-U arc -l h_rt=02:00:00,h_vmem={mem}G:0.0:NONE:1073741824:0:0",
            host = HOSTS[i % HOSTS.len()],
            user = USERS[i % USERS.len()],
            project = PROJECTS[i % PROJECTS.len()],
            sub = end - wallclock as i64 - 30,
            start = end - wallclock as i64,
            slots = 1 + i % 24,
            mem = 1 + i % 12,
        ));
    }

    lines.join("\n")
}

fn parsed_records(content: &str) -> Vec<JobRecord> {
    let classifier = Config::default().owners;
    let classifier = OwnerClassifier::new(classifier.queue_owner, classifier.owner_owner);
    content
        .lines()
        .filter_map(parse_line)
        .map(|mut record| {
            classifier.classify(&mut record);
            record
        })
        .collect()
}

fn aggregator() -> UsageAggregator {
    let rules = Config::default().memory.compile_rules().unwrap();
    UsageAggregator::new(NodeMemoryResolver::with_rules(rules))
}

fn benchmark_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("accounting_reader");

    for size in [100, 1000, 10000].iter() {
        let content = generate_accounting(*size, true);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| AccountingReader::new("bench", Cursor::new(black_box(content.as_bytes()))).count());
        });
    }

    group.finish();
}

fn benchmark_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("usage_fold");
    let aggregator = aggregator();

    for size in [1000, 10000, 100000].iter() {
        let records = parsed_records(&generate_accounting(*size, false));

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| aggregator.fold(black_box(&records)));
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", size), size, |b, _| {
            b.iter(|| aggregator.fold_parallel(black_box(&records)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_reader, benchmark_fold);
criterion_main!(benches);
