// ============================================================================
// JSON Parsing Functions
// ============================================================================
//
// Query documents arrive from the authoring layer as JSON. These functions
// provide string-based parsing with shape validation up front, accepting
// either a `{"queries": [...]}` wrapper or a bare array.

use crate::api::{Config, Query};
use anyhow::{Context, Result};

#[derive(serde::Deserialize)]
struct QueriesWrapper {
    queries: Vec<Query>,
}

fn validate_queries_document(json: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid queries JSON")?;
    let is_array = value.is_array();
    let has_queries = value
        .as_object()
        .and_then(|obj| obj.get("queries"))
        .is_some();
    if !is_array && !has_queries {
        anyhow::bail!("Missing required 'queries' field");
    }
    Ok(())
}

/// Parse a query document from a JSON string.
///
/// Accepts either a wrapper `{"queries": [ ... ]}` or a direct array
/// `[ ... ]`. Structural validation (duration ordering, link targets) is
/// performed by the engine when a run starts; this function only checks the
/// document shape.
///
/// # Arguments
///
/// * `json` - Query document JSON
///
/// # Returns
///
/// The parsed query list.
pub fn parse_queries_json_str(json: &str) -> Result<Vec<Query>> {
    validate_queries_document(json)?;

    // Try wrapper form first, then the direct array form.
    match serde_json::from_str::<QueriesWrapper>(json) {
        Ok(wrapper) => Ok(wrapper.queries),
        Err(_) => serde_json::from_str::<Vec<Query>>(json)
            .context("Failed to deserialize queries JSON using Serde"),
    }
}

/// Parse the timeline config from a JSON string.
pub fn parse_config_json_str(json: &str) -> Result<Config> {
    serde_json::from_str::<Config>(json).context("Failed to deserialize config JSON using Serde")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{QueryId, QueryKind};

    #[test]
    fn test_parse_minimal_queries() {
        let json = r#"{
            "queries": [
                {
                    "id": 1,
                    "name": "standup",
                    "kind": "atomic",
                    "position": { "duration": { "min": 900000.0, "target": 1800000.0 } }
                }
            ]
        }"#;

        let result = parse_queries_json_str(json);
        assert!(result.is_ok(), "Should parse minimal document: {:?}", result.err());

        let queries = result.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].id, QueryId::new(1));
        assert_eq!(queries[0].kind, QueryKind::Atomic);
        assert_eq!(queries[0].position.duration.target, 1800000.0);
    }

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[
            {
                "id": 2,
                "kind": "splittable",
                "position": { "duration": { "min": 1.0, "target": 4.0 } }
            }
        ]"#;

        let queries = parse_queries_json_str(json).expect("Should parse bare array");
        assert_eq!(queries.len(), 1);
        assert!(queries[0].is_splittable());
        assert_eq!(queries[0].name, "", "name defaults to empty");
    }

    #[test]
    fn test_parse_with_links_and_restrictions() {
        let json = r#"{
            "queries": [
                {
                    "id": 3,
                    "name": "debrief",
                    "kind": "atomic",
                    "position": {
                        "start": { "target": 100.0 },
                        "duration": { "min": 10.0, "target": 10.0 }
                    },
                    "links": [
                        {
                            "query_id": 1,
                            "potential_id": 0,
                            "distance": { "min": 0.0, "max": 50.0 },
                            "origin": "end"
                        }
                    ],
                    "time_restrictions": {
                        "hour": { "condition": "in_range", "ranges": [[9.0, 17.0]] }
                    }
                }
            ]
        }"#;

        let queries = parse_queries_json_str(json).expect("Should parse rich document");
        let query = &queries[0];
        assert_eq!(query.links.as_ref().map(|l| l.len()), Some(1));
        assert!(query.time_restrictions.as_ref().unwrap().hour.is_some());
    }

    #[test]
    fn test_missing_queries_key() {
        let result = parse_queries_json_str(r#"{"SomeOtherKey": []}"#);
        assert!(result.is_err(), "Should fail without queries key");
    }

    #[test]
    fn test_invalid_json() {
        let result = parse_queries_json_str("not valid json {");
        assert!(result.is_err(), "Should fail with invalid JSON");
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config_json_str(r#"{"start_date": 0.0, "end_date": 100.0}"#)
            .expect("Should parse config");
        assert_eq!(config.start_date, 0.0);
        assert_eq!(config.end_date, 100.0);
    }
}
