use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// CEFR proficiency levels, lowest to highest.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    /// The next level up, saturating at C2.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::A1 => Self::A2,
            Self::A2 => Self::B1,
            Self::B1 => Self::B2,
            Self::B2 => Self::C1,
            Self::C1 | Self::C2 => Self::C2,
        }
    }
}

/// Lower theta bound per level. A theta maps to the highest level whose
/// bound it reaches; anything below the A1 bound is still A1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProficiencyRange {
    bounds: BTreeMap<CefrLevel, f64>,
}

impl Default for ProficiencyRange {
    fn default() -> Self {
        Self {
            bounds: BTreeMap::from([
                (CefrLevel::A1, -2.0),
                (CefrLevel::A2, -1.0),
                (CefrLevel::B1, 0.0),
                (CefrLevel::B2, 1.0),
                (CefrLevel::C1, 2.0),
                (CefrLevel::C2, 3.0),
            ]),
        }
    }
}

impl ProficiencyRange {
    pub fn new(bounds: BTreeMap<CefrLevel, f64>) -> Self {
        let mut range = Self::default();
        range.bounds.extend(bounds);
        range
    }

    #[must_use]
    pub fn lower_bound(&self, level: CefrLevel) -> f64 {
        self.bounds.get(&level).copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Map an ability estimate to its band.
    #[must_use]
    pub fn band(&self, theta: f64) -> CefrLevel {
        CefrLevel::iter()
            .rev()
            .find(|&level| theta >= self.lower_bound(level))
            .unwrap_or(CefrLevel::A1)
    }

    /// Midpoint of a band, used to size skill gaps. The open-ended C2 band
    /// is treated as one theta unit wide.
    #[must_use]
    pub fn midpoint(&self, level: CefrLevel) -> f64 {
        let lower = self.lower_bound(level);
        let upper = if level == CefrLevel::C2 {
            lower + 1.0
        } else {
            self.lower_bound(level.next())
        };
        (lower + upper) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_the_scale() {
        let range = ProficiencyRange::default();
        assert_eq!(range.band(-3.7), CefrLevel::A1);
        assert_eq!(range.band(-2.0), CefrLevel::A1);
        assert_eq!(range.band(-1.0), CefrLevel::A2);
        assert_eq!(range.band(-0.001), CefrLevel::A2);
        assert_eq!(range.band(0.0), CefrLevel::B1);
        assert_eq!(range.band(1.4), CefrLevel::B2);
        assert_eq!(range.band(2.9), CefrLevel::C1);
        assert_eq!(range.band(3.0), CefrLevel::C2);
        assert_eq!(range.band(4.0), CefrLevel::C2);
    }

    #[test]
    fn next_saturates_at_c2() {
        assert_eq!(CefrLevel::B1.next(), CefrLevel::B2);
        assert_eq!(CefrLevel::C2.next(), CefrLevel::C2);
    }

    #[test]
    fn midpoints_sit_inside_their_band() {
        let range = ProficiencyRange::default();
        assert!((range.midpoint(CefrLevel::B1) - 0.5).abs() < 1e-9);
        assert!((range.midpoint(CefrLevel::C2) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn custom_bounds_override_defaults() {
        let range = ProficiencyRange::new(BTreeMap::from([(CefrLevel::B1, 0.25)]));
        assert_eq!(range.band(0.1), CefrLevel::A2);
        assert_eq!(range.band(0.3), CefrLevel::B1);
    }
}
