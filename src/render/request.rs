use crate::engine::params::EffectParameters;
use crate::foundation::core::{FocusPoint, ViewMode};

/// One immutable "render this" event.
///
/// Requests are ordered by arrival; once a newer one exists an older one no longer matters.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    /// Effect controls.
    pub params: EffectParameters,
    /// Target tier.
    pub view: ViewMode,
    /// Focus for focus-driven crops. The interactive loupe is always centered and ignores it.
    pub focus: Option<FocusPoint>,
}

impl RenderRequest {
    /// Request a render of `view` with `params`.
    pub fn new(params: EffectParameters, view: ViewMode) -> Self {
        Self {
            params,
            view,
            focus: None,
        }
    }

    /// Attach a focus point (clamped into `[0, 1]²`).
    pub fn with_focus(mut self, focus: FocusPoint) -> Self {
        self.focus = Some(focus.clamped());
        self
    }
}
