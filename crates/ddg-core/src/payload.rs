//! Raw path payloads as delivered by the trace backend.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One service/operation hop of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadHop {
    pub service: String,
    pub operation: String,
}

impl PayloadHop {
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
        }
    }
}

/// A root-to-leaf path, ordered from the most upstream hop to the most downstream one.
pub type PayloadPath = Vec<PayloadHop>;

/// Parses `[[{"service": "...", "operation": "..."}, ...], ...]`.
pub fn parse_payload(text: &str) -> Result<Vec<PayloadPath>> {
    serde_json::from_str(text).map_err(|e| Error::InvalidPayload {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_hops() {
        let paths = parse_payload(
            r#"[[{"service":"a","operation":"x"},{"service":"b","operation":"y"}],[]]"#,
        )
        .unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0][1], PayloadHop::new("b", "y"));
        assert!(paths[1].is_empty());
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_payload(r#"[[{"service":"a"}]]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload { .. }));
    }
}
