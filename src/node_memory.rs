//! Memory per core of the node a job ran on.
//!
//! Resolution is two-stage. The primary path asks a [`NodeTypeLookup`] about
//! the `node_type` the job requested. When that yields nothing, the hostname
//! is matched against an ordered table of [`HostnameMemoryRule`]s describing
//! hardware generations that never carried node type metadata. The first rule
//! that matches wins; rules are never ranked against each other.

use crate::category::{self, NodeTypeDescriptor};
use crate::error::{AccountingError, Result};
use crate::models::JobRecord;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeMemoryProfile {
    pub cores_per_node: u64,
    pub memory_bytes_per_node: u64,
}

impl NodeMemoryProfile {
    /// `None` unless both values are non-zero.
    pub fn new(cores_per_node: u64, memory_bytes_per_node: u64) -> Option<Self> {
        (cores_per_node > 0 && memory_bytes_per_node > 0).then_some(Self {
            cores_per_node,
            memory_bytes_per_node,
        })
    }

    /// Floor of node memory over cores. `None` if the node has less than a
    /// byte per core, which is not a usable ratio.
    pub fn memory_per_core(&self) -> Option<u64> {
        Some(self.memory_bytes_per_node / self.cores_per_node).filter(|mpc| *mpc > 0)
    }
}

/// Maps a `node_type` descriptor to the hardware it denotes.
pub trait NodeTypeLookup {
    fn profile(&self, node_type: &str) -> Option<NodeMemoryProfile>;
}

impl<F> NodeTypeLookup for F
where
    F: Fn(&str) -> Option<NodeMemoryProfile>,
{
    fn profile(&self, node_type: &str) -> Option<NodeMemoryProfile> {
        self(node_type)
    }
}

/// Reads the profile straight out of Grid Engine descriptors like `24core-128G`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorLookup;

impl NodeTypeLookup for DescriptorLookup {
    fn profile(&self, node_type: &str) -> Option<NodeMemoryProfile> {
        let descriptor = NodeTypeDescriptor::parse(node_type)?;
        NodeMemoryProfile::new(descriptor.num_pe?, descriptor.memory?)
    }
}

#[derive(Debug, Clone)]
pub struct HostnameMemoryRule {
    pattern: Regex,
    memory_per_core: u64,
}

impl HostnameMemoryRule {
    pub fn new(pattern: &str, memory_per_core: u64) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| AccountingError::InvalidHostnamePattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        if memory_per_core == 0 {
            return Err(AccountingError::Configuration(format!(
                "hostname rule '{pattern}' has zero memory per core"
            )));
        }
        Ok(Self { pattern, memory_per_core })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn memory_per_core(&self) -> u64 {
        self.memory_per_core
    }

    pub fn matches(&self, hostname: &str) -> bool {
        self.pattern.is_match(hostname)
    }
}

pub struct NodeMemoryResolver<L = DescriptorLookup> {
    lookup: L,
    hostname_rules: Vec<HostnameMemoryRule>,
}

impl NodeMemoryResolver<DescriptorLookup> {
    pub fn with_rules(hostname_rules: Vec<HostnameMemoryRule>) -> Self {
        Self::new(DescriptorLookup, hostname_rules)
    }
}

impl<L: NodeTypeLookup> NodeMemoryResolver<L> {
    /// `hostname_rules` are tried in the order given.
    pub fn new(lookup: L, hostname_rules: Vec<HostnameMemoryRule>) -> Self {
        Self { lookup, hostname_rules }
    }

    pub fn hostname_rules(&self) -> &[HostnameMemoryRule] {
        &self.hostname_rules
    }

    pub fn resolve(&self, record: &JobRecord) -> Option<u64> {
        self.from_node_type(record)
            .or_else(|| self.from_hostname(&record.hostname))
    }

    fn from_node_type(&self, record: &JobRecord) -> Option<u64> {
        let node_type = category::node_type(&record.category)?;
        self.lookup.profile(node_type)?.memory_per_core()
    }

    fn from_hostname(&self, hostname: &str) -> Option<u64> {
        let rule = self.hostname_rules.iter().find(|rule| rule.matches(hostname))?;
        tracing::trace!(hostname, pattern = rule.pattern(), "Memory per core from hostname rule");
        Some(rule.memory_per_core)
    }
}
