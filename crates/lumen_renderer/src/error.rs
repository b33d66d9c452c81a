use lumen_core::SceneError;
use thiserror::Error;

/// Errors that can occur while setting up or tearing down a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image must be at least 1x1, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },

    #[error("At least one render thread is required")]
    ZeroThreads,

    #[error("Pixel buffer is already partitioned between workers")]
    AlreadyPartitioned,

    #[error("Failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Render worker '{0}' panicked")]
    WorkerPanicked(String),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
