use core::fmt;

/// Error while building or reading a [`PixelBuffer`](crate::PixelBuffer).
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelError {
    /// A pixel index past the end of the buffer.
    OutOfRange { index: usize, len: usize },
    /// The backing memory cannot hold the requested number of pixels.
    BufferTooSmall { pixels: usize, bytes: usize },
}

impl fmt::Debug for PixelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelError::OutOfRange { index, len } => {
                write!(f, "pixel {} out of range for buffer of {} pixels", index, len)
            }
            PixelError::BufferTooSmall { pixels, bytes } => {
                write!(f, "{} pixels do not fit in {} bytes", pixels, bytes)
            }
        }
    }
}

impl fmt::Display for PixelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl core::error::Error for PixelError {}

/// Error during WS2812 driver operation.
///
/// `E` is the error type of the platform's [`Hardware`](crate::Hardware).
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// `send_colors` was called with a buffer of zero pixels.
    EmptyBuffer,
    /// Another transmission was still streaming when the timeout ran out.
    Timeout,
    /// `send_colors` was called before `init`.
    NotInitialized,
    /// `init` was called twice.
    AlreadyInitialized,
    /// The configured timing does not fit the DMA element type.
    InvalidTiming,
    /// The platform refused a peripheral configuration.
    Hardware(E),
}

impl<E: fmt::Debug> fmt::Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyBuffer => write!(f, "empty pixel buffer"),
            Error::Timeout => write!(f, "timed out waiting for the previous transmission"),
            Error::NotInitialized => write!(f, "driver not initialized"),
            Error::AlreadyInitialized => write!(f, "driver already initialized"),
            Error::InvalidTiming => write!(f, "pwm timing does not fit the dma element type"),
            Error::Hardware(err) => write!(f, "hardware error: {:?}", err),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
