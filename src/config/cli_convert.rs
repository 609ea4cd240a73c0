//! CLI string to config value conversion utilities

use crate::cluster::{NodeSelector, SlotRange, SLOT_COUNT};
use crate::config::cli;
use crate::execution::CancelPolicy;
use anyhow::{Context, Result};

/// Parse a duration string (e.g., "500ms", "2s", "1m") to milliseconds
///
/// A bare number is taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix("sec").or_else(|| s.strip_suffix('s')) {
        (n, 1000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Parse a slot range ("0-8191") or a single slot ("42")
pub fn parse_slot_range(s: &str) -> Result<SlotRange> {
    let s = s.trim();
    let parse_slot = |part: &str| -> Result<u16> {
        let slot: u16 = part
            .trim()
            .parse()
            .with_context(|| format!("Invalid slot number: {}", part))?;
        if slot >= SLOT_COUNT {
            anyhow::bail!("slot {} out of range (must be < {})", slot, SLOT_COUNT);
        }
        Ok(slot)
    };

    let range = match s.split_once('-') {
        Some((start, end)) => SlotRange::new(parse_slot(start)?, parse_slot(end)?),
        None => SlotRange::single(parse_slot(s)?),
    };

    if range.start > range.end {
        anyhow::bail!("slot range start must not exceed end: {}", s);
    }
    Ok(range)
}

/// Parse a node selector
///
/// Accepted forms: `all`, `masters`, `replicas`, `slot:<n>`, `key:<key>`,
/// `nodes:<id>,<id>,...`.
pub fn parse_selector(s: &str) -> Result<NodeSelector> {
    let s = s.trim();
    let (kind, value) = match s.split_once(':') {
        Some((kind, value)) => (kind.to_lowercase(), Some(value)),
        None => (s.to_lowercase(), None),
    };

    let selector = match (kind.as_str(), value) {
        ("all", None) => NodeSelector::All,
        ("masters", None) => NodeSelector::Masters,
        ("replicas", None) => NodeSelector::Replicas,
        ("slot", Some(slot)) => {
            let range = parse_slot_range(slot)?;
            if range.len() != 1 {
                anyhow::bail!("slot selector takes a single slot: {}", s);
            }
            NodeSelector::SlotOwner(range.start)
        }
        ("key", Some(key)) if !key.is_empty() => NodeSelector::for_key(key),
        ("nodes", Some(list)) => {
            let ids: Vec<&str> = list
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .collect();
            if ids.is_empty() {
                anyhow::bail!("node list is empty: {}", s);
            }
            NodeSelector::explicit(ids)
        }
        _ => anyhow::bail!(
            "Invalid selector '{}' (expected all, masters, replicas, slot:<n>, key:<key> or nodes:<a,b>)",
            s
        ),
    };
    Ok(selector)
}

/// Convert CLI CancelPolicy to the execution CancelPolicy
pub fn convert_cancel_policy(policy: cli::CancelPolicyArg) -> CancelPolicy {
    match policy {
        cli::CancelPolicyArg::Abort => CancelPolicy::Abort,
        cli::CancelPolicyArg::Detach => CancelPolicy::Detach,
    }
}
