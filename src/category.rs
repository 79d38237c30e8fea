//! Resource requests recorded in a job's category string.
//!
//! Grid Engine stores the submit-time requests as a flat string such as
//! `-U arc -l h_rt=48:00:00,h_vmem=4G,node_type=24core-128G -pe smp 8`.
//! Only `-l` lists are resource requests; other flags are ignored.

use crate::quantity::parse_quantity;
use once_cell::sync::Lazy;
use regex::Regex;

static NODE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<num_pe>\d+)(?P<pe_type>core|thread)-(?P<memory>[^-]+)(-(?P<coproc>[^-]+))?")
        .expect("static regex is valid")
});

/// Value of resource `name` from the first `-l` list that requests it.
pub fn category_resource<'a>(category: &'a str, name: &str) -> Option<&'a str> {
    let mut tokens = category.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "-l" {
            continue;
        }
        let Some(requests) = tokens.next() else {
            break;
        };
        let found = requests.split(',').find_map(|request| {
            let (key, value) = request.split_once('=')?;
            (key == name).then_some(value)
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Requested `h_vmem` in bytes, if present and parseable.
pub fn memory_request(category: &str) -> Option<u64> {
    category_resource(category, "h_vmem").and_then(|v| parse_quantity(v).ok())
}

/// Requested `node_type` descriptor, if any.
pub fn node_type(category: &str) -> Option<&str> {
    category_resource(category, "node_type").filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeType {
    Core,
    Thread,
}

/// Parsed node type descriptor, e.g. `24core-128G` or `40core-192G-2p100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeDescriptor {
    pub num_pe: Option<u64>,
    pub pe_type: PeType,
    pub memory: Option<u64>,
    pub coproc: Option<String>,
}

impl NodeTypeDescriptor {
    /// `None` when the descriptor does not follow the `<n>core-<mem>` shape.
    /// Unparseable counts or memory sizes are left as `None` fields.
    pub fn parse(descriptor: &str) -> Option<Self> {
        let caps = NODE_TYPE.captures(descriptor)?;
        let pe_type = match &caps["pe_type"] {
            "thread" => PeType::Thread,
            _ => PeType::Core,
        };

        Some(Self {
            num_pe: parse_quantity(&caps["num_pe"]).ok(),
            pe_type,
            memory: parse_quantity(&caps["memory"]).ok(),
            coproc: caps.name("coproc").map(|m| m.as_str().to_string()),
        })
    }
}
