/// Non-destructive adjustment parameters for a photo
///
/// This struct stores all adjustments made to an image.
/// It is serialized to JSON for the catalog and for presets,
/// so the source pixels are never touched.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// One control point of the tone curve, both axes in 0.0..=1.0
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub x: f32,
    pub y: f32,
}

impl CurvePoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The five points of the identity tone curve
pub const IDENTITY_CURVE: [CurvePoint; 5] = [
    CurvePoint::new(0.0, 0.0),
    CurvePoint::new(0.25, 0.25),
    CurvePoint::new(0.5, 0.5),
    CurvePoint::new(0.75, 0.75),
    CurvePoint::new(1.0, 1.0),
];

/// All adjustment parameters for a photo
///
/// These values are turned into an ordered filter chain by
/// `render::filters::build_chain`. Producers are expected to keep
/// values inside the documented ranges; nothing here re-validates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdjustmentSet {
    // ========== Tone ==========

    /// Exposure adjustment in stops (-5.0 to +5.0)
    pub exposure: f32,

    /// Contrast adjustment (-100.0 to +100.0)
    pub contrast: f32,

    /// Highlights adjustment (-100.0 to +100.0)
    /// - Negative values recover bright areas
    /// - Positive values boost them
    pub highlights: f32,

    /// Shadows adjustment (-100.0 to +100.0)
    pub shadows: f32,

    /// Whites adjustment (-100.0 to +100.0)
    pub whites: f32,

    /// Blacks adjustment (-100.0 to +100.0)
    pub blacks: f32,

    // ========== Presence ==========

    /// Clarity / micro-contrast (-100.0 to +100.0)
    pub clarity: f32,

    /// Vibrance adjustment (-100.0 to +100.0)
    pub vibrance: f32,

    /// Saturation adjustment (-100.0 to +100.0)
    /// - -100.0 = grayscale, 0.0 = original
    pub saturation: f32,

    // ========== White Balance ==========

    /// Temperature shift (-100 to +100)
    /// - Negative values = cooler
    /// - Positive values = warmer
    pub temperature: f32,

    /// Tint shift (-100 to +100)
    pub tint: f32,

    // ========== HSL ==========

    /// Hue rotation in degrees (-180 to +180)
    pub hue: f32,

    /// Luminance (-100.0 to +100.0)
    pub luminance: f32,

    /// Tone curve control points, identity by default
    pub tone_curve: Vec<CurvePoint>,
}

impl Default for AdjustmentSet {
    /// Create default adjustments (no edits)
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            clarity: 0.0,
            vibrance: 0.0,
            saturation: 0.0,
            temperature: 0.0,
            tint: 0.0,
            hue: 0.0,
            luminance: 0.0,
            tone_curve: IDENTITY_CURVE.to_vec(),
        }
    }
}

impl AdjustmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to JSON string for catalog storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from the catalog)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this represents an unedited image (all values at default)
    pub fn is_unedited(&self) -> bool {
        *self == Self::default()
    }

    /// Reset all adjustments to default (no edits)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Shallow field-level merge: only the fields present in `patch` change.
    pub fn merge(&mut self, patch: &AdjustmentPatch) {
        for field in Adjustment::ALL {
            if let Some(value) = field.read_patch(patch) {
                *field.slot(self) = value;
            }
        }
        if let Some(curve) = &patch.tone_curve {
            self.tone_curve = curve.clone();
        }
    }
}

/// A partial `AdjustmentSet`: `None` fields are left untouched on merge.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AdjustmentPatch {
    pub exposure: Option<f32>,
    pub contrast: Option<f32>,
    pub highlights: Option<f32>,
    pub shadows: Option<f32>,
    pub whites: Option<f32>,
    pub blacks: Option<f32>,
    pub clarity: Option<f32>,
    pub vibrance: Option<f32>,
    pub saturation: Option<f32>,
    pub temperature: Option<f32>,
    pub tint: Option<f32>,
    pub hue: Option<f32>,
    pub luminance: Option<f32>,
    pub tone_curve: Option<Vec<CurvePoint>>,
}

impl AdjustmentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Every field supplied; used for "reset" and "paste settings".
impl From<AdjustmentSet> for AdjustmentPatch {
    fn from(set: AdjustmentSet) -> Self {
        let mut patch = AdjustmentPatch {
            tone_curve: Some(set.tone_curve.clone()),
            ..Default::default()
        };
        for field in Adjustment::ALL {
            *field.patch_slot(&mut patch) = Some(field.get(&set));
        }
        patch
    }
}

/// Names one scalar field of `AdjustmentSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Exposure,
    Contrast,
    Highlights,
    Shadows,
    Whites,
    Blacks,
    Clarity,
    Vibrance,
    Saturation,
    Temperature,
    Tint,
    Hue,
    Luminance,
}

impl Adjustment {
    /// Panel order used by the sidebar
    pub const ALL: [Adjustment; 13] = [
        Adjustment::Exposure,
        Adjustment::Contrast,
        Adjustment::Highlights,
        Adjustment::Shadows,
        Adjustment::Whites,
        Adjustment::Blacks,
        Adjustment::Clarity,
        Adjustment::Vibrance,
        Adjustment::Saturation,
        Adjustment::Temperature,
        Adjustment::Tint,
        Adjustment::Hue,
        Adjustment::Luminance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Adjustment::Exposure => "Exposure",
            Adjustment::Contrast => "Contrast",
            Adjustment::Highlights => "Highlights",
            Adjustment::Shadows => "Shadows",
            Adjustment::Whites => "Whites",
            Adjustment::Blacks => "Blacks",
            Adjustment::Clarity => "Clarity",
            Adjustment::Vibrance => "Vibrance",
            Adjustment::Saturation => "Saturation",
            Adjustment::Temperature => "Temperature",
            Adjustment::Tint => "Tint",
            Adjustment::Hue => "Hue",
            Adjustment::Luminance => "Luminance",
        }
    }

    /// Documented slider range
    pub fn range(self) -> RangeInclusive<f32> {
        match self {
            Adjustment::Exposure => -5.0..=5.0,
            Adjustment::Hue => -180.0..=180.0,
            _ => -100.0..=100.0,
        }
    }

    /// Slider step
    pub fn step(self) -> f32 {
        match self {
            Adjustment::Exposure => 0.01,
            _ => 1.0,
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }

    pub fn get(self, set: &AdjustmentSet) -> f32 {
        match self {
            Adjustment::Exposure => set.exposure,
            Adjustment::Contrast => set.contrast,
            Adjustment::Highlights => set.highlights,
            Adjustment::Shadows => set.shadows,
            Adjustment::Whites => set.whites,
            Adjustment::Blacks => set.blacks,
            Adjustment::Clarity => set.clarity,
            Adjustment::Vibrance => set.vibrance,
            Adjustment::Saturation => set.saturation,
            Adjustment::Temperature => set.temperature,
            Adjustment::Tint => set.tint,
            Adjustment::Hue => set.hue,
            Adjustment::Luminance => set.luminance,
        }
    }

    /// A patch touching only this field, clamped to the documented range
    pub fn patch(self, value: f32) -> AdjustmentPatch {
        let mut patch = AdjustmentPatch::default();
        *self.patch_slot(&mut patch) = Some(self.clamp(value));
        patch
    }

    fn slot(self, set: &mut AdjustmentSet) -> &mut f32 {
        match self {
            Adjustment::Exposure => &mut set.exposure,
            Adjustment::Contrast => &mut set.contrast,
            Adjustment::Highlights => &mut set.highlights,
            Adjustment::Shadows => &mut set.shadows,
            Adjustment::Whites => &mut set.whites,
            Adjustment::Blacks => &mut set.blacks,
            Adjustment::Clarity => &mut set.clarity,
            Adjustment::Vibrance => &mut set.vibrance,
            Adjustment::Saturation => &mut set.saturation,
            Adjustment::Temperature => &mut set.temperature,
            Adjustment::Tint => &mut set.tint,
            Adjustment::Hue => &mut set.hue,
            Adjustment::Luminance => &mut set.luminance,
        }
    }

    fn patch_slot(self, patch: &mut AdjustmentPatch) -> &mut Option<f32> {
        match self {
            Adjustment::Exposure => &mut patch.exposure,
            Adjustment::Contrast => &mut patch.contrast,
            Adjustment::Highlights => &mut patch.highlights,
            Adjustment::Shadows => &mut patch.shadows,
            Adjustment::Whites => &mut patch.whites,
            Adjustment::Blacks => &mut patch.blacks,
            Adjustment::Clarity => &mut patch.clarity,
            Adjustment::Vibrance => &mut patch.vibrance,
            Adjustment::Saturation => &mut patch.saturation,
            Adjustment::Temperature => &mut patch.temperature,
            Adjustment::Tint => &mut patch.tint,
            Adjustment::Hue => &mut patch.hue,
            Adjustment::Luminance => &mut patch.luminance,
        }
    }

    fn read_patch(self, patch: &AdjustmentPatch) -> Option<f32> {
        match self {
            Adjustment::Exposure => patch.exposure,
            Adjustment::Contrast => patch.contrast,
            Adjustment::Highlights => patch.highlights,
            Adjustment::Shadows => patch.shadows,
            Adjustment::Whites => patch.whites,
            Adjustment::Blacks => patch.blacks,
            Adjustment::Clarity => patch.clarity,
            Adjustment::Vibrance => patch.vibrance,
            Adjustment::Saturation => patch.saturation,
            Adjustment::Temperature => patch.temperature,
            Adjustment::Tint => patch.tint,
            Adjustment::Hue => patch.hue,
            Adjustment::Luminance => patch.luminance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unedited() {
        let params = AdjustmentSet::default();
        assert!(params.is_unedited());
        assert_eq!(params.tone_curve, IDENTITY_CURVE.to_vec());
    }

    #[test]
    fn test_serialization() {
        let mut params = AdjustmentSet::default();
        params.exposure = 1.5;
        params.contrast = 20.0;
        params.saturation = -10.0;
        params.tone_curve[2] = CurvePoint::new(0.5, 0.6);

        let json = params.to_json().unwrap();
        let restored = AdjustmentSet::from_json(&json).unwrap();

        assert_eq!(params, restored);
        assert!(!restored.is_unedited());
    }

    #[test]
    fn test_missing_json_fields_fall_back_to_defaults() {
        let restored = AdjustmentSet::from_json(r#"{"exposure": 2.0}"#).unwrap();
        assert_eq!(restored.exposure, 2.0);
        assert_eq!(restored.contrast, 0.0);
        assert_eq!(restored.tone_curve.len(), 5);
    }

    #[test]
    fn test_reset() {
        let mut params = AdjustmentSet::default();
        params.exposure = 2.0;
        params.contrast = 50.0;

        assert!(!params.is_unedited());

        params.reset();

        assert!(params.is_unedited());
    }

    #[test]
    fn test_merge_only_touches_supplied_fields() {
        let mut params = AdjustmentSet::default();
        params.contrast = -30.0;
        params.hue = 45.0;

        params.merge(&AdjustmentPatch {
            exposure: Some(2.0),
            ..Default::default()
        });

        assert_eq!(params.exposure, 2.0);
        assert_eq!(params.contrast, -30.0);
        assert_eq!(params.hue, 45.0);
        assert_eq!(params.tone_curve, IDENTITY_CURVE.to_vec());
    }

    #[test]
    fn test_full_patch_overwrites_everything() {
        let mut params = AdjustmentSet::default();
        params.tint = 12.0;
        params.tone_curve.push(CurvePoint::new(0.9, 0.95));

        params.merge(&AdjustmentPatch::from(AdjustmentSet::default()));

        assert!(params.is_unedited());
    }

    #[test]
    fn test_field_patch_is_clamped() {
        let patch = Adjustment::Exposure.patch(9.0);
        assert_eq!(patch.exposure, Some(5.0));
        assert!(patch.contrast.is_none());

        let patch = Adjustment::Hue.patch(-200.0);
        assert_eq!(patch.hue, Some(-180.0));
    }

    #[test]
    fn test_field_accessors_cover_every_field() {
        let mut params = AdjustmentSet::default();
        for (i, field) in Adjustment::ALL.iter().enumerate() {
            params.merge(&field.patch(i as f32 + 1.0));
        }
        for (i, field) in Adjustment::ALL.iter().enumerate() {
            assert_eq!(field.get(&params), i as f32 + 1.0, "{}", field.label());
        }
    }
}
