//! Fatal setup errors.
//!
//! Everything that can fail while bringing the window and its GPU device
//! chain up is fatal: there is no degraded mode. Steady-state drawing uses
//! plain [`windows::core::Result`] and the paint handler drops the frame on
//! failure instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    /// A device, factory or compositor object could not be created.
    #[error("{stage} setup failed: {source}")]
    Device {
        stage: &'static str,
        source: windows::core::Error,
    },

    #[error("window creation failed: {0}")]
    WindowCreation(#[source] windows::core::Error),

    #[error("extending the frame into the client area failed: {0}")]
    FrameExtension(#[source] windows::core::Error),

    /// A decorative asset the chrome draws every frame is not on disk.
    #[error("missing image asset: {}", .0.display())]
    MissingAsset(PathBuf),
}

impl SetupError {
    /// Adapter for `map_err` on device-chain construction calls.
    pub(crate) fn device(stage: &'static str) -> impl FnOnce(windows::core::Error) -> Self {
        move |source| Self::Device { stage, source }
    }
}
