//! Sanity checks on what an engine handed back.

use crate::conv_coord::EngineVertex;
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

/// Engine units (inches).
pub const TOLERANCE: f64 = 1e-3;

/// Every expected vertex is present exactly once with its requested size, and nothing else is.
pub fn check_vertices<'a>(
    expected: impl IntoIterator<Item = (&'a str, f64, f64)>,
    actual: &[EngineVertex],
) -> Result<()> {
    let mut by_key: FxHashMap<&str, &EngineVertex> = FxHashMap::default();
    for v in actual {
        if by_key.insert(&v.key, v).is_some() {
            return Err(Error::InvalidLayout {
                message: format!("vertex {} appears more than once", v.key),
            });
        }
    }
    let mut seen = 0usize;
    for (key, width, height) in expected {
        let Some(v) = by_key.get(key) else {
            return Err(Error::InvalidLayout {
                message: format!("vertex {key} is missing"),
            });
        };
        if (v.width - width).abs() > TOLERANCE || (v.height - height).abs() > TOLERANCE {
            return Err(Error::InvalidLayout {
                message: format!(
                    "vertex {key} is {}x{}, expected {width}x{height}",
                    v.width, v.height
                ),
            });
        }
        seen += 1;
    }
    if seen != by_key.len() {
        return Err(Error::InvalidLayout {
            message: format!("{} unexpected vertices", by_key.len() - seen),
        });
    }
    Ok(())
}

/// One warning per pinned vertex the engine moved anyway.
pub fn position_drift(pinned: &[EngineVertex], actual: &[EngineVertex]) -> Vec<String> {
    let by_key: FxHashMap<&str, &EngineVertex> = actual.iter().map(|v| (&*v.key, v)).collect();
    let mut warnings = Vec::new();
    for p in pinned {
        let Some(v) = by_key.get(&*p.key) else {
            continue;
        };
        let (dx, dy) = (v.x - p.x, v.y - p.y);
        if dx.abs() > TOLERANCE || dy.abs() > TOLERANCE {
            let msg = format!("vertex {} drifted by ({dx:.4}, {dy:.4}) inches", p.key);
            tracing::warn!("{msg}");
            warnings.push(msg);
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(key: &str, x: f64, y: f64) -> EngineVertex {
        EngineVertex {
            key: key.into(),
            width: 1.0,
            height: 0.5,
            x,
            y,
        }
    }

    #[test]
    fn size_mismatch_is_invalid() {
        let actual = vec![v("a", 0.0, 0.0)];
        assert!(check_vertices([("a", 1.0, 0.5)], &actual).is_ok());
        assert!(check_vertices([("a", 1.0, 0.0005)], &actual).is_err());
        assert!(check_vertices([("a", 1.0004, 0.5)], &actual).is_ok());
    }

    #[test]
    fn missing_and_extra_vertices_are_invalid() {
        let actual = vec![v("a", 0.0, 0.0), v("b", 1.0, 1.0)];
        assert!(check_vertices([("a", 1.0, 0.5)], &actual).is_err());
        assert!(check_vertices([("a", 1.0, 0.5), ("c", 1.0, 0.5)], &actual).is_err());
        let dup = vec![v("a", 0.0, 0.0), v("a", 1.0, 1.0)];
        assert!(check_vertices([("a", 1.0, 0.5)], &dup).is_err());
    }

    #[test]
    fn drift_is_a_warning() {
        let pinned = vec![v("a", 1.0, 1.0), v("b", 2.0, 2.0)];
        let actual = vec![v("a", 1.0, 1.0), v("b", 2.5, 2.0)];
        let warnings = position_drift(&pinned, &actual);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("vertex b"));
    }
}
