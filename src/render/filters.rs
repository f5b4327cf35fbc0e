/// Adjustment set → ordered filter chain.
///
/// The order of `CHAIN` is the order operations are applied in. A field only
/// contributes when it is non-zero, so an unedited photo yields an empty chain.
/// Out-of-range values are run through the same formulas unchanged.

use crate::state::edit::{Adjustment, AdjustmentSet};

/// Primitive operation kinds understood by the raster backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturate,
    HueRotate,
    WarmCoolShift,
}

/// One step of a filter chain.
///
/// Brightness, contrast and saturate are factors about 1.0; hue rotation is in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    HueRotate(f32),
    /// `amount` is |temperature| / 100; `warm` is the sign of the temperature
    WarmCoolShift { amount: f32, warm: bool },
}

impl FilterOp {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterOp::Brightness(_) => FilterKind::Brightness,
            FilterOp::Contrast(_) => FilterKind::Contrast,
            FilterOp::Saturate(_) => FilterKind::Saturate,
            FilterOp::HueRotate(_) => FilterKind::HueRotate,
            FilterOp::WarmCoolShift { .. } => FilterKind::WarmCoolShift,
        }
    }

    pub fn magnitude(&self) -> f32 {
        match *self {
            FilterOp::Brightness(v)
            | FilterOp::Contrast(v)
            | FilterOp::Saturate(v)
            | FilterOp::HueRotate(v) => v,
            FilterOp::WarmCoolShift { amount, .. } => amount,
        }
    }
}

/// Per-field formula, applied only to non-zero values
type Formula = fn(f32) -> FilterOp;

/// Application order of the live preview chain
const CHAIN: [(Adjustment, Formula); 13] = [
    (Adjustment::Exposure, |v| FilterOp::Brightness(1.0 + v / 3.0)),
    (Adjustment::Contrast, |v| FilterOp::Contrast(1.0 + v / 80.0)),
    (Adjustment::Highlights, highlights),
    (Adjustment::Shadows, |v| FilterOp::Brightness(1.0 + v / 150.0 * 0.5)),
    (Adjustment::Whites, |v| FilterOp::Brightness(1.0 + v / 300.0)),
    (Adjustment::Blacks, |v| FilterOp::Brightness(1.0 + v / 400.0)),
    (Adjustment::Clarity, |v| FilterOp::Contrast(1.0 + v / 300.0)),
    (Adjustment::Vibrance, |v| FilterOp::Saturate(1.0 + v / 200.0)),
    (Adjustment::Saturation, |v| FilterOp::Saturate(1.0 + v / 100.0)),
    (Adjustment::Luminance, |v| FilterOp::Brightness(1.0 + v / 200.0)),
    (Adjustment::Temperature, |v| FilterOp::WarmCoolShift {
        amount: v.abs() / 100.0,
        warm: v > 0.0,
    }),
    (Adjustment::Tint, |v| FilterOp::HueRotate(v / 2.0)),
    (Adjustment::Hue, FilterOp::HueRotate),
];

fn highlights(v: f32) -> FilterOp {
    let strength = v.abs() / 200.0;
    if v > 0.0 {
        FilterOp::Brightness(1.0 + strength)
    } else {
        FilterOp::Brightness(1.0 - strength * 0.3)
    }
}

/// Build the live-preview chain for an adjustment set.
///
/// The tone curve does not contribute an operation.
pub fn build_chain(adjustments: &AdjustmentSet) -> Vec<FilterOp> {
    CHAIN
        .iter()
        .filter_map(|(field, formula)| {
            let value = field.get(adjustments);
            (value != 0.0).then(|| formula(value))
        })
        .collect()
}

/// The reduced chain used when exporting.
///
/// Only exposure, contrast, saturation + vibrance and hue take part, with
/// gentler scaling than the live preview. All four steps are always present.
pub fn export_chain(adjustments: &AdjustmentSet) -> Vec<FilterOp> {
    vec![
        FilterOp::Brightness(1.0 + adjustments.exposure / 100.0),
        FilterOp::Contrast(1.0 + adjustments.contrast / 100.0),
        FilterOp::Saturate(1.0 + (adjustments.saturation + adjustments.vibrance) / 200.0),
        FilterOp::HueRotate(adjustments.hue),
    ]
}
