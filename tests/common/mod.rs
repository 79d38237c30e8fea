#![allow(dead_code)]

use anyhow::Result;
use sge_accounting::config::{Config, HostnameRuleConfig};
use std::fs;
use std::path::{Path, PathBuf};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// 2018-01-01T00:00:00Z
pub const JAN_2018: i64 = 1_514_764_800;
/// 2019-01-01T00:00:00Z
pub const JAN_2019: i64 = 1_546_300_800;

/// One finished job, written out as a 45-field accounting line.
#[derive(Debug, Clone)]
pub struct JobLine {
    pub queue: String,
    pub hostname: String,
    pub user: String,
    pub job_name: String,
    pub job_number: u64,
    pub task_number: u64,
    pub project: String,
    pub start_time: i64,
    pub end_time: i64,
    pub wallclock: u64,
    pub slots: u32,
    pub category: String,
}

impl JobLine {
    pub fn new(user: &str, project: &str) -> Self {
        Self {
            queue: "48core.q".to_string(),
            hostname: "node001.cluster.example".to_string(),
            user: user.to_string(),
            job_name: "run.sh".to_string(),
            job_number: 1000,
            task_number: 0,
            project: project.to_string(),
            start_time: JAN_2018 + 86_400,
            end_time: JAN_2018 + 86_400 + 3600,
            wallclock: 3600,
            slots: 1,
            category: "-U arc -l h_rt=01:00:00,h_vmem=4G".to_string(),
        }
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.queue = queue.to_string();
        self
    }

    pub fn host(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn job(mut self, job_number: u64, task_number: u64) -> Self {
        self.job_number = job_number;
        self.task_number = task_number;
        self
    }

    /// Run `wallclock` seconds on `slots` slots, ending at `end_time`.
    pub fn ran(mut self, end_time: i64, wallclock: u64, slots: u32) -> Self {
        self.end_time = end_time;
        self.start_time = end_time - wallclock as i64;
        self.wallclock = wallclock;
        self.slots = slots;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn render(&self) -> String {
        let submission = self.start_time - 60;
        format!(
            "{queue}:{host}:users:{user}:{name}:{job}:sge:0:{submission}:{start}:{end}:0:0:{wall}:{wall}.0:1.0:1024:0:0:0:0:100:0:0:0:0:0:0:0:10:5:{project}:defaultdepartment:smp:{slots}:{task}:{wall}.0:12.5:0.25:{category}:0.0:NONE:{GIB}:0:0",
            queue = self.queue,
            host = self.hostname,
            user = self.user,
            name = self.job_name,
            job = self.job_number,
            start = self.start_time,
            end = self.end_time,
            wall = self.wallclock,
            project = self.project,
            slots = self.slots,
            task = self.task_number,
            category = self.category,
        )
    }
}

pub fn write_accounting(dir: &Path, filename: &str, jobs: &[JobLine]) -> Result<PathBuf> {
    let mut content = String::from("# Version: 8.1.9\n# Grid Engine accounting\n");
    for job in jobs {
        content.push_str(&job.render());
        content.push('\n');
    }
    let path = dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// Defaults with a single hostname rule: `node*` hosts have 16 cores and
/// 64G, so 4G per core.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.memory.hostname_rules = vec![HostnameRuleConfig {
        pattern: "^node".to_string(),
        node_memory: "64G".to_string(),
        cores: 16,
        label: Some("test".to_string()),
    }];
    config
}
