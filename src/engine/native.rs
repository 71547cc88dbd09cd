//! Binding of the grain engine's C ABI from a shared library.
//!
//! Expected export:
//!
//! ```c
//! void larm_apply_grain(const uint8_t *input, uint8_t *output,
//!                       int32_t width, int32_t height,
//!                       double size, double intensity, double sharpness,
//!                       double saturation, double exposure,
//!                       double shadow_grain, double midtone_grain, double highlight_grain,
//!                       double tonal_smoothness, double depth, double chromatic,
//!                       double relief, int32_t layers);
//! ```
#![allow(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::engine::bridge::GrainEngine;
use crate::engine::params::EngineParams;
use crate::foundation::error::{LarmError, LarmResult};
use crate::pixel::codec::rgb_byte_len;

type ApplyGrainFn = unsafe extern "C" fn(
    input: *const u8,
    output: *mut u8,
    width: i32,
    height: i32,
    size: f64,
    intensity: f64,
    sharpness: f64,
    saturation: f64,
    exposure: f64,
    shadow_grain: f64,
    midtone_grain: f64,
    highlight_grain: f64,
    tonal_smoothness: f64,
    depth: f64,
    chromatic: f64,
    relief: f64,
    layers: i32,
);

/// Symbol looked up when none is configured.
pub const DEFAULT_ENGINE_SYMBOL: &str = "larm_apply_grain";

/// Grain engine resolved from a shared library at runtime.
pub struct NativeEngine {
    apply: ApplyGrainFn,
    path: PathBuf,
    symbol: String,
    // Keeps `apply` valid; must outlive every call.
    _lib: libloading::Library,
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine")
            .field("path", &self.path)
            .field("symbol", &self.symbol)
            .finish()
    }
}

impl NativeEngine {
    /// Open `path` and resolve `symbol`.
    ///
    /// Any failure is [`LarmError::EngineUnavailable`]; servers must not start without an engine.
    pub fn load(path: &Path, symbol: &str) -> LarmResult<Self> {
        // SAFETY: loading runs the library's initializers; the engine library is trusted
        // configuration supplied by the operator.
        let lib = unsafe { libloading::Library::new(path) }.map_err(|e| {
            LarmError::engine_unavailable(format!("cannot load '{}': {e}", path.display()))
        })?;

        // SAFETY: the symbol is declared with the documented ABI above; a library exporting the
        // name with a different signature is a deployment error outside this crate's control.
        let apply = unsafe { lib.get::<ApplyGrainFn>(symbol.as_bytes()) }
            .map(|sym| *sym)
            .map_err(|e| {
                LarmError::engine_unavailable(format!(
                    "symbol '{symbol}' not found in '{}': {e}",
                    path.display()
                ))
            })?;

        tracing::info!(path = %path.display(), symbol, "grain engine loaded");
        Ok(Self {
            apply,
            path: path.to_path_buf(),
            symbol: symbol.to_string(),
            _lib: lib,
        })
    }

    /// Path the engine was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GrainEngine for NativeEngine {
    fn apply(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: u32,
        height: u32,
        params: &EngineParams,
    ) -> LarmResult<()> {
        let expected = rgb_byte_len(width, height);
        if input.len() != expected {
            return Err(LarmError::size_mismatch(expected, input.len()));
        }
        if output.len() != expected {
            return Err(LarmError::size_mismatch(expected, output.len()));
        }
        let w = i32::try_from(width)
            .map_err(|_| LarmError::validation("width exceeds the engine's int32 range"))?;
        let h = i32::try_from(height)
            .map_err(|_| LarmError::validation("height exceeds the engine's int32 range"))?;

        // SAFETY: both pointers cover exactly `width * height * 3` bytes (checked above), the
        // shared/exclusive borrows guarantee they do not alias, and both outlive the call.
        unsafe {
            (self.apply)(
                input.as_ptr(),
                output.as_mut_ptr(),
                w,
                h,
                params.size,
                params.intensity,
                params.sharpness,
                params.saturation,
                params.exposure,
                params.shadow_grain,
                params.midtone_grain,
                params.highlight_grain,
                params.tonal_smoothness,
                params.depth,
                params.chromatic,
                params.relief,
                params.layers,
            );
        }
        Ok(())
    }
}
