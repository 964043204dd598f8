//! Structural validation of a workflow before it runs.

use std::collections::HashSet;

use hookgate_types::workflow::WorkflowDefinition;

/// Every problem found in a workflow, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("workflow validation failed: {}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

/// Check that a workflow can be executed.
///
/// Rules:
/// - the workflow is active
/// - the canvas has at least one node and at least one start node
/// - node IDs are unique
/// - every edge references existing nodes
pub fn validate_workflow(def: &WorkflowDefinition) -> Result<(), ValidationError> {
    let mut problems = Vec::new();

    if !def.is_active {
        problems.push("workflow is not active".to_string());
    }

    let nodes = &def.canvas.nodes;
    if nodes.is_empty() {
        problems.push("workflow has no nodes".to_string());
    } else if !nodes.iter().any(|n| n.is_start()) {
        problems.push("no start nodes found in workflow".to_string());
    }

    let mut seen = HashSet::new();
    for node in nodes {
        if node.id.is_empty() {
            problems.push("node with empty ID".to_string());
        } else if !seen.insert(node.id.as_str()) {
            problems.push(format!("duplicate node ID: '{}'", node.id));
        }
    }

    for edge in &def.canvas.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen.contains(endpoint.as_str()) {
                problems.push(format!(
                    "edge {} -> {} references unknown node '{}'",
                    edge.source, edge.target, endpoint
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { problems })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{edge, node, workflow};
    use serde_json::json;

    #[test]
    fn test_valid_workflow() {
        let def = workflow(
            vec![node("a", "trigger", json!({})), node("b", "action", json!({}))],
            vec![edge("a", "b")],
        );
        assert!(validate_workflow(&def).is_ok());
    }

    #[test]
    fn test_is_start_flag_counts_as_start() {
        let def = workflow(vec![node("a", "action", json!({ "isStart": true }))], vec![]);
        assert!(validate_workflow(&def).is_ok());
    }

    #[test]
    fn test_empty_canvas() {
        let def = workflow(vec![], vec![]);
        let err = validate_workflow(&def).unwrap_err();
        assert_eq!(err.problems, vec!["workflow has no nodes".to_string()]);
    }

    #[test]
    fn test_reports_all_problems() {
        let mut def = workflow(
            vec![
                node("a", "action", json!({})),
                node("a", "delay", json!({})),
            ],
            vec![edge("a", "ghost")],
        );
        def.is_active = false;

        let err = validate_workflow(&def).unwrap_err();
        assert_eq!(err.problems.len(), 4, "{:?}", err.problems);
        let msg = err.to_string();
        assert!(msg.contains("not active"));
        assert!(msg.contains("no start nodes"));
        assert!(msg.contains("duplicate node ID: 'a'"));
        assert!(msg.contains("unknown node 'ghost'"));
    }
}
