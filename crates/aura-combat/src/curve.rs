//! Level-scaled values.

use serde::{Deserialize, Serialize};

/// Piecewise-linear curve keyed by level.
///
/// Keys are kept sorted by level. Lookups outside the key range clamp to the
/// first or last value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelCurve {
    keys: Vec<(f32, f32)>,
}

impl LevelCurve {
    /// Builds a curve from `(level, value)` pairs in any order.
    #[must_use]
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.retain(|(level, value)| level.is_finite() && value.is_finite());
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Builds a curve with one key per level, starting at level 1.
    #[must_use]
    pub fn from_levels(values: &[f32]) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let keys = values
            .iter()
            .enumerate()
            .map(|(i, v)| ((i + 1) as f32, *v))
            .collect();
        Self::new(keys)
    }

    /// Evaluates the curve. An empty curve evaluates to zero.
    #[must_use]
    pub fn eval(&self, level: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if level <= first.0 {
            return first.1;
        }
        if level >= last.0 {
            return last.1;
        }

        for pair in self.keys.windows(2) {
            let (l0, v0) = pair[0];
            let (l1, v1) = pair[1];
            if level <= l1 {
                let span = l1 - l0;
                if span <= 0.0 {
                    return v1;
                }
                let t = (level - l0) / span;
                return v0 + (v1 - v0) * t;
            }
        }
        last.1
    }

    /// Returns true if the curve has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A coefficient optionally scaled by a level curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalableFloat {
    /// Base coefficient
    pub value: f32,
    /// Optional level curve multiplied into the coefficient
    #[serde(default)]
    pub curve: Option<LevelCurve>,
}

impl Default for ScalableFloat {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl ScalableFloat {
    /// A value that ignores level.
    #[must_use]
    pub const fn constant(value: f32) -> Self {
        Self { value, curve: None }
    }

    /// A value of `coefficient * curve(level)`.
    #[must_use]
    pub const fn curved(coefficient: f32, curve: LevelCurve) -> Self {
        Self {
            value: coefficient,
            curve: Some(curve),
        }
    }

    /// Value at the given level.
    #[must_use]
    pub fn value_at_level(&self, level: f32) -> f32 {
        match &self.curve {
            Some(curve) => self.value * curve.eval(level),
            None => self.value,
        }
    }
}

impl From<f32> for ScalableFloat {
    fn from(value: f32) -> Self {
        Self::constant(value)
    }
}
