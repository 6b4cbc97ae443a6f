//! Construction parameters.

use serde::{Deserialize, Serialize};

use crate::error::{BvhError, Result};

/// BVH construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhConfig {
    /// SAH cost of traversing one node.
    pub sah_traversal_cost: f32,
    /// SAH cost of intersecting one primitive.
    pub sah_intersection_cost: f32,
    /// Ranges with at most this many primitives become leaves.
    pub min_leaf_primitives: u32,
    /// Bins per axis for binned SAH; smaller ranges use exact SAH.
    pub num_bins: u32,
    /// Past this depth every split is a median split.
    pub max_binning_depth: u32,
    /// Pack leaf triangles four-wide for the SIMD leaf test.
    pub pack_leaves: bool,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            sah_traversal_cost: 1.0,
            sah_intersection_cost: 1.2,
            min_leaf_primitives: 15,
            num_bins: 32,
            max_binning_depth: 16,
            pack_leaves: true,
        }
    }
}

impl BvhConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.sah_traversal_cost.is_finite() || self.sah_traversal_cost < 0.0 {
            return Err(BvhError::InvalidConfig(
                "sah_traversal_cost must be finite and non-negative".into(),
            ));
        }
        if !self.sah_intersection_cost.is_finite() || self.sah_intersection_cost < 0.0 {
            return Err(BvhError::InvalidConfig(
                "sah_intersection_cost must be finite and non-negative".into(),
            ));
        }
        if self.min_leaf_primitives == 0 {
            return Err(BvhError::InvalidConfig(
                "min_leaf_primitives must be at least 1".into(),
            ));
        }
        if self.num_bins < 2 {
            return Err(BvhError::InvalidConfig("num_bins must be at least 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BvhConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            BvhConfig {
                min_leaf_primitives: 0,
                ..Default::default()
            },
            BvhConfig {
                num_bins: 1,
                ..Default::default()
            },
            BvhConfig {
                sah_traversal_cost: f32::NAN,
                ..Default::default()
            },
            BvhConfig {
                sah_intersection_cost: -1.0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(BvhError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BvhConfig =
            serde_json::from_str(r#"{ "num_bins": 16, "pack_leaves": false }"#).unwrap();
        assert_eq!(config.num_bins, 16);
        assert!(!config.pack_leaves);
        assert_eq!(config.min_leaf_primitives, 15);
        assert!(config.validate().is_ok());
    }
}
