use serde::{Deserialize, Serialize};
use sirenia::RankDir;

/// Graph attributes and engine settings, in engine units (inches).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    #[serde(with = "rankdir_serde")]
    pub rankdir: RankDir,
    pub ranksep: f64,
    pub nodesep: f64,
    /// Forwarded as the DOT `splines` attribute.
    pub splines: String,
    /// Upper bound, in bytes, on the DOT text handed to an in-process engine.
    pub total_memory: Option<usize>,
    /// Route edges in the hierarchical pass instead of a separate force-directed pass.
    pub use_dot_edges: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            rankdir: RankDir::TB,
            ranksep: 5.0,
            nodesep: 1.5,
            splines: "true".to_string(),
            total_memory: None,
            use_dot_edges: false,
        }
    }
}

impl LayoutOptions {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

mod rankdir_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use sirenia::RankDir;

    pub fn serialize<S: Serializer>(value: &RankDir, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<RankDir, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid rankdir: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let opts = LayoutOptions::from_json(r#"{"rankdir": "LR", "totalMemory": 4096}"#).unwrap();
        assert_eq!(opts.rankdir, RankDir::LR);
        assert_eq!(opts.total_memory, Some(4096));
        assert_eq!(opts.ranksep, 5.0);
        assert!(!opts.use_dot_edges);
    }

    #[test]
    fn unknown_rankdir_is_an_error() {
        assert!(LayoutOptions::from_json(r#"{"rankdir": "XY"}"#).is_err());
    }
}
