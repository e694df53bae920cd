//! Drive WS2812 LEDs (aka Neopixel) from a PWM timer fed by circular DMA.
//!
//! Every WS2812 bit is one PWM period whose duty cycle is either the short
//! (0) or the long (1) high time. The compare values come from a small
//! circular DMA buffer split in two halves: while the hardware plays one
//! half, the DMA interrupt refills the other with the next pixel. The CPU
//! never times a bit, and the buffer stays a few dozen elements long no
//! matter how long the strip is.
//!
//! The chip-specific part is the [`Hardware`] trait. A platform implements
//! it for its timer and DMA channel, binds the DMA interrupt to
//! [`Ws2812Dma::on_interrupt`], and can then use the driver directly or
//! through the `smart-leds` traits via [`Ws2812Writer`].
//!
//! ```ignore
//! static DMA_BUFFER: StaticCell<DmaBuffer<u8>> = StaticCell::new();
//! static LEDS: StaticCell<Ws2812Dma<'static, Tim1Dma>> = StaticCell::new();
//!
//! let leds = LEDS.init(Ws2812Dma::new(hw, DMA_BUFFER.init(DmaBuffer::new()), Config::default()));
//! leds.init()?;
//!
//! static COLORS: [RGB8; 3] = [color::RED, color::GREEN, color::BLUE];
//! leds.send_static(PixelBuffer::from_colors(&COLORS), Duration::from_millis(50))?
//!     .wait();
//!
//! let mut frame = [color::BLACK; 60];
//! frame[7] = color::WHITE;
//! leds.send_colors_with(PixelBuffer::from_colors(&frame), Duration::from_millis(50), |_| ())?;
//! ```

#![no_std]

#[macro_use]
mod fmt;

pub mod color;
pub mod encoder;
pub mod engine;
mod error;
pub mod hardware;
pub mod pixels;
pub mod timing;
mod writer;

pub use engine::{Config, Diagnostics, DmaBuffer, Half, Progress, Transmission, Ws2812Dma};
pub use error::{Error, PixelError};
pub use hardware::{DmaConfig, DmaEvent, ElementSize, Hardware, PinMode, PwmConfig};
pub use pixels::PixelBuffer;
pub use rgb::RGB8;
pub use timing::{DutyCode, DutyCodes, PwmTiming};
pub use writer::Ws2812Writer;
