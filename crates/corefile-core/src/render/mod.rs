//! Corefile renderer
//!
//! Turns the active record set and the forwarding settings into Corefile
//! text. Rendering is pure: no I/O, no clock reads. The generation
//! timestamp is passed in so that identical inputs produce identical bytes.
//!
//! ## Output shape
//!
//! ```text
//! # Generated by corefile-manager
//! # generated_at: 2025-01-09T12:00:00+00:00
//! # zones: 1, records: 1
//!
//! example.com:53 {
//!     hosts {
//!         10.0.0.1 www.example.com # A
//!         fallthrough
//!     }
//!     log
//!     errors
//! }
//!
//! .:53 {
//!     forward . 1.1.1.1 1.0.0.1
//!     cache 30
//!     log
//!     errors
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write;

use crate::traits::{DnsRecord, Upstream};

/// Prefix of the header line carrying the generation timestamp
pub const GENERATED_AT_PREFIX: &str = "# generated_at: ";

const INDENT: &str = "    ";

/// Counts reported alongside the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderStats {
    /// Number of zone blocks
    pub total_zones: usize,
    /// Number of host entries
    pub total_records: usize,
    /// Number of active records (equal to `total_records`)
    pub active_records: usize,
}

/// Records of one zone, in caller order
#[derive(Debug, Clone)]
pub struct ZoneGroup<'a> {
    /// Zone name
    pub name: &'a str,
    /// Records belonging to the zone
    pub records: Vec<&'a DnsRecord>,
}

/// Everything the template needs for one render
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Zones in first-seen order
    pub zones: Vec<ZoneGroup<'a>>,
    /// Forwarders for the root block
    pub upstream: Option<&'a Upstream>,
    /// Total records across all zones
    pub record_count: usize,
}

impl<'a> RenderContext<'a> {
    /// Group records by zone, preserving first-seen zone order and the
    /// caller's record order within each zone
    pub fn new(records: &'a [DnsRecord], upstream: Option<&'a Upstream>) -> Self {
        let mut zones: Vec<ZoneGroup<'a>> = Vec::new();
        for record in records {
            match zones.iter_mut().find(|z| z.name == record.zone) {
                Some(group) => group.records.push(record),
                None => zones.push(ZoneGroup {
                    name: &record.zone,
                    records: vec![record],
                }),
            }
        }

        Self {
            zones,
            upstream,
            record_count: records.len(),
        }
    }

    /// Counts for this context
    pub fn stats(&self) -> RenderStats {
        RenderStats {
            total_zones: self.zones.len(),
            total_records: self.record_count,
            active_records: self.record_count,
        }
    }
}

/// Rendered Corefile plus its counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    /// Corefile text
    pub content: String,
    /// Structural counts
    pub stats: RenderStats,
}

/// Render the active records and forwarders into Corefile text
///
/// Never fails: an empty record set renders just the root block.
pub fn render(
    records: &[DnsRecord],
    upstream: Option<&Upstream>,
    generated_at: DateTime<Utc>,
) -> Rendered {
    let ctx = RenderContext::new(records, upstream);
    let stats = ctx.stats();

    // Writing into a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(out, "# Generated by corefile-manager");
    let _ = writeln!(
        out,
        "{}{}",
        GENERATED_AT_PREFIX,
        generated_at.to_rfc3339_opts(SecondsFormat::Micros, false)
    );
    let _ = writeln!(
        out,
        "# zones: {}, records: {}",
        stats.total_zones, stats.total_records
    );

    for zone in &ctx.zones {
        out.push('\n');
        let _ = writeln!(out, "{}:53 {{", zone.name);
        let _ = writeln!(out, "{INDENT}hosts {{");
        for record in &zone.records {
            let _ = writeln!(
                out,
                "{INDENT}{INDENT}{} {} # {}",
                record.address,
                record.fqdn(),
                record.kind
            );
        }
        let _ = writeln!(out, "{INDENT}{INDENT}fallthrough");
        let _ = writeln!(out, "{INDENT}}}");
        let _ = writeln!(out, "{INDENT}log");
        let _ = writeln!(out, "{INDENT}errors");
        let _ = writeln!(out, "}}");
    }

    out.push('\n');
    let _ = writeln!(out, ".:53 {{");
    if let Some(upstream) = ctx.upstream {
        let _ = writeln!(out, "{INDENT}forward . {}", upstream.addresses().join(" "));
    }
    let _ = writeln!(out, "{INDENT}cache 30");
    let _ = writeln!(out, "{INDENT}log");
    let _ = writeln!(out, "{INDENT}errors");
    let _ = writeln!(out, "}}");

    Rendered {
        content: out,
        stats,
    }
}

/// Whether `content` has at least one block and every `{` is closed
pub fn is_well_formed(content: &str) -> bool {
    let mut depth: usize = 0;
    let mut blocks = 0;
    for line in content.lines() {
        let code = line.split('#').next().unwrap_or("");
        for ch in code.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                    blocks += 1;
                }
                _ => {}
            }
        }
    }
    depth == 0 && blocks > 0
}

/// Corefile text with the generation timestamp line removed
pub fn without_timestamp(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with(GENERATED_AT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}
