use thiserror::Error;

/// Failure conditions surfaced by the animation component.
///
/// None of these are fatal to the host page: at the wasm boundary every
/// variant degrades to a console diagnostic and a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpriteError {
    /// Seek target outside `0..numberOfFrames`.
    #[error("invalid frame index ({0})")]
    InvalidFrameIndex(f64),

    /// Malformed operation argument, e.g. a non-integer passed to `goTo`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The sheet image failed to decode; the driver is parked in a failed
    /// state instead of hanging in `Loading`.
    #[error("could not decode sprite sheet image '{0}'")]
    ImageDecodeFailure(String),

    /// Rejected construction options (zero frame size, bad jump frame,
    /// sheet width not a multiple of the frame width, ...).
    #[error("invalid sheet configuration: {0}")]
    InvalidConfig(String),

    /// Operation needs a decoded sheet but the image is still loading.
    #[error("sprite sheet is still loading")]
    NotReady,

    /// Registry dispatch against an element with no attached driver.
    #[error("no sprite instance attached to element")]
    NoInstance,

    /// Registry dispatch naming an operation that is not public.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Operation on a driver after `destroy()`.
    #[error("sprite instance already destroyed")]
    AlreadyDestroyed,
}

pub type SpriteResult<T> = Result<T, SpriteError>;
