//! Configuration validation

use super::cli_convert::parse_slot_range;
use super::*;
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_dispatch(&config.dispatch)?;
    validate_nodes(&config.nodes)?;
    Ok(())
}

/// Validate dispatch configuration
pub fn validate_dispatch(dispatch: &DispatchConfig) -> Result<()> {
    if dispatch.timeout_ms == 0 {
        anyhow::bail!("dispatch.timeout_ms must be greater than zero");
    }
    Ok(())
}

/// Validate the simulated cluster
pub fn validate_nodes(nodes: &[SimulatedNode]) -> Result<()> {
    if nodes.is_empty() {
        anyhow::bail!("at least one [[nodes]] entry is required");
    }

    let mut seen = HashSet::new();
    for (i, node) in nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            anyhow::bail!("nodes[{}]: id must not be empty", i);
        }
        if node.endpoint.trim().is_empty() {
            anyhow::bail!("nodes[{}] ('{}'): endpoint must not be empty", i, node.id);
        }
        if !seen.insert(node.id.as_str()) {
            anyhow::bail!("duplicate node id '{}'", node.id);
        }
        for slot in &node.slots {
            parse_slot_range(slot).with_context(|| format!("nodes[{}] ('{}'): invalid slots", i, node.id))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> SimulatedNode {
        SimulatedNode {
            id: id.to_string(),
            endpoint: format!("{}:6379", id),
            role: NodeRole::Master,
            slots: vec!["0-16383".to_string()],
            latency_ms: 0,
            jitter_ms: 0,
            reply: SimulatedReply::default(),
        }
    }

    fn config(nodes: Vec<SimulatedNode>) -> Config {
        Config {
            nodes,
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&config(vec![node("a"), node("b")])).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut cfg = config(vec![node("a")]);
        cfg.dispatch.timeout_ms = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = validate_config(&config(vec![node("a"), node("a")])).unwrap_err();
        assert!(err.to_string().contains("duplicate node id 'a'"));
    }

    #[test]
    fn test_empty_id_and_cluster_rejected() {
        assert!(validate_config(&config(vec![node(" ")])).is_err());
        assert!(validate_config(&config(Vec::new())).is_err());
    }

    #[test]
    fn test_bad_slots_rejected() {
        let mut bad = node("a");
        bad.slots = vec!["100-16384".to_string()];
        assert!(validate_config(&config(vec![bad])).is_err());

        let mut inverted = node("b");
        inverted.slots = vec!["9-3".to_string()];
        assert!(validate_config(&config(vec![inverted])).is_err());
    }
}
