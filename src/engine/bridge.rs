use crate::engine::params::EngineParams;
use crate::foundation::error::{LarmError, LarmResult};
use crate::pixel::codec::{RgbBuffer, rgb_byte_len};

/// Call contract to the external grain engine.
///
/// `apply` must fill `output` with a complete transformed image of the same dimensions as
/// `input`. Both slices are exactly `width * height * 3` bytes and never alias. Implementations
/// hold no state between calls.
pub trait GrainEngine: Send + Sync {
    /// Transform `input` into `output`.
    fn apply(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: u32,
        height: u32,
        params: &EngineParams,
    ) -> LarmResult<()>;
}

impl<F> GrainEngine for F
where
    F: Fn(&[u8], &mut [u8], u32, u32, &EngineParams) -> LarmResult<()> + Send + Sync,
{
    fn apply(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: u32,
        height: u32,
        params: &EngineParams,
    ) -> LarmResult<()> {
        self(input, output, width, height, params)
    }
}

/// Invoke `engine` after checking the buffer contract.
///
/// Dimensions and lengths must agree, otherwise a fatal [`LarmError::SizeMismatch`] is returned
/// and the engine is not called. A panic inside the engine is reported as
/// [`LarmError::Processing`].
pub fn apply_engine(
    engine: &dyn GrainEngine,
    input: &RgbBuffer,
    output: &mut RgbBuffer,
    params: &EngineParams,
) -> LarmResult<()> {
    let (width, height) = (input.width(), input.height());
    let expected = rgb_byte_len(width, height);
    if input.len() != expected {
        return Err(LarmError::size_mismatch(expected, input.len()));
    }
    if !input.same_shape(output) || output.len() != expected {
        return Err(LarmError::size_mismatch(expected, output.len()));
    }
    if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
        return Err(LarmError::validation(format!(
            "image dimensions {width}x{height} exceed the engine's int32 range"
        )));
    }

    let out = output.as_bytes_mut();
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        engine.apply(input.as_bytes(), out, width, height, params)
    }))
    .map_err(|payload| {
        LarmError::processing(format!("engine panicked: {}", panic_message(&*payload)))
    })?
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
