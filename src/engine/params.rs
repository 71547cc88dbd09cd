use crate::foundation::error::{LarmError, LarmResult};

/// User-facing grain controls.
///
/// Values pass through to the engine unchanged except for two derived adjustments made by
/// [`EffectParameters::to_engine`]: `layers` is rounded to the nearest integer and `size` is
/// multiplied by the tier's grain scale. Range checks are the caller's job ([`Self::validate`]);
/// nothing here clamps.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectParameters {
    /// Grain size, 0.1..=200.
    pub size: f64,
    /// Grain intensity, 0..=200.
    pub intensity: f64,
    /// Crystal edge sharpness, 0..=20.
    #[serde(alias = "crystalSharpness")]
    pub sharpness: f64,
    /// Output saturation, 0..=2.
    pub saturation: f64,
    /// Exposure in stops, -2..=2.
    pub exposure: f64,
    /// Grain weight in shadows, 0..=2.
    pub shadow_grain: f64,
    /// Grain weight in midtones, 0..=2.
    pub midtone_grain: f64,
    /// Grain weight in highlights, 0..=2.
    pub highlight_grain: f64,
    /// Blend width between tonal ranges, 0.01..=1.
    pub tonal_smoothness: f64,
    /// Pseudo-3D depth, 0..=1.
    pub depth: f64,
    /// Chromatic aberration amount, 0..=500.
    pub chromatic: f64,
    /// Emboss relief, 0..=100.
    pub relief: f64,
    /// Grain layer count, 1..=5. Fractional values are rounded at the engine boundary.
    pub layers: f64,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            size: 2.5,
            intensity: 0.8,
            sharpness: 8.0,
            saturation: 1.0,
            exposure: 0.0,
            shadow_grain: 1.2,
            midtone_grain: 1.0,
            highlight_grain: 0.6,
            tonal_smoothness: 0.15,
            depth: 0.4,
            chromatic: 2.0,
            relief: 0.3,
            layers: 3.0,
        }
    }
}

/// Documented valid ranges, `(name, min, max)` inclusive.
pub const PARAMETER_RANGES: [(&str, f64, f64); 13] = [
    ("size", 0.1, 200.0),
    ("intensity", 0.0, 200.0),
    ("sharpness", 0.0, 20.0),
    ("saturation", 0.0, 2.0),
    ("exposure", -2.0, 2.0),
    ("shadowGrain", 0.0, 2.0),
    ("midtoneGrain", 0.0, 2.0),
    ("highlightGrain", 0.0, 2.0),
    ("tonalSmoothness", 0.01, 1.0),
    ("depth", 0.0, 1.0),
    ("chromatic", 0.0, 500.0),
    ("relief", 0.0, 100.0),
    ("layers", 1.0, 5.0),
];

impl EffectParameters {
    fn values(&self) -> [f64; 13] {
        [
            self.size,
            self.intensity,
            self.sharpness,
            self.saturation,
            self.exposure,
            self.shadow_grain,
            self.midtone_grain,
            self.highlight_grain,
            self.tonal_smoothness,
            self.depth,
            self.chromatic,
            self.relief,
            self.layers,
        ]
    }

    /// Check every field against [`PARAMETER_RANGES`].
    pub fn validate(&self) -> LarmResult<()> {
        for ((name, min, max), v) in PARAMETER_RANGES.iter().zip(self.values()) {
            if !v.is_finite() || v < *min || v > *max {
                return Err(LarmError::validation(format!(
                    "{name} must be within {min}..={max}, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Layer count as sent to the engine (nearest integer).
    pub fn engine_layers(&self) -> i32 {
        self.layers.round() as i32
    }

    /// Resolve the values handed across the engine boundary.
    ///
    /// `grain_scale` is the proxy scale factor for proxy renders and exactly `1.0` otherwise.
    pub fn to_engine(&self, grain_scale: f64) -> EngineParams {
        EngineParams {
            size: self.size * grain_scale,
            intensity: self.intensity,
            sharpness: self.sharpness,
            saturation: self.saturation,
            exposure: self.exposure,
            shadow_grain: self.shadow_grain,
            midtone_grain: self.midtone_grain,
            highlight_grain: self.highlight_grain,
            tonal_smoothness: self.tonal_smoothness,
            depth: self.depth,
            chromatic: self.chromatic,
            relief: self.relief,
            layers: self.engine_layers(),
        }
    }
}

/// Parameter values exactly as they cross the engine call boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParams {
    /// Grain size after the tier adjustment.
    pub size: f64,
    /// Grain intensity.
    pub intensity: f64,
    /// Crystal sharpness.
    pub sharpness: f64,
    /// Saturation.
    pub saturation: f64,
    /// Exposure.
    pub exposure: f64,
    /// Shadow grain weight.
    pub shadow_grain: f64,
    /// Midtone grain weight.
    pub midtone_grain: f64,
    /// Highlight grain weight.
    pub highlight_grain: f64,
    /// Tonal smoothness.
    pub tonal_smoothness: f64,
    /// Depth.
    pub depth: f64,
    /// Chromatic aberration.
    pub chromatic: f64,
    /// Relief.
    pub relief: f64,
    /// Integer layer count.
    pub layers: i32,
}

#[cfg(test)]
#[path = "../../tests/unit/engine/params.rs"]
mod tests;
