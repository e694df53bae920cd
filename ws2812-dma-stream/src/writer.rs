//! `smart-leds` front end for [`Ws2812Dma`].

use embassy_time::Duration;
use rgb::RGB8;
use smart_leds_trait::{SmartLedsWrite, SmartLedsWriteAsync};

use crate::engine::Ws2812Dma;
use crate::error::Error;
use crate::hardware::Hardware;
use crate::pixels::PixelBuffer;
use crate::timing::DutyCode;

/// Writes iterators of colors to a strip of up to `N` pixels.
///
/// Colors are staged in `colors`, which is the pixel buffer the driver
/// streams from. It stays borrowed as long as the driver, so only the
/// writer can touch it, and only once the driver is idle. Items past `N`
/// are ignored.
pub struct Ws2812Writer<'e, 'd, H: Hardware, T: DutyCode, const P: usize, const N: usize> {
    driver: &'e Ws2812Dma<'d, H, T, P>,
    colors: &'d mut [RGB8; N],
    timeout: Duration,
}

impl<'e, 'd, H: Hardware, T: DutyCode, const P: usize, const N: usize>
    Ws2812Writer<'e, 'd, H, T, P, N>
{
    /// `timeout` bounds how long a write waits for an earlier transmission
    /// that is still streaming.
    pub fn new(
        driver: &'e Ws2812Dma<'d, H, T, P>,
        colors: &'d mut [RGB8; N],
        timeout: Duration,
    ) -> Self {
        Self {
            driver,
            colors,
            timeout,
        }
    }

    /// Copy the iterator into the staging array once the driver is done
    /// reading it, returning how many pixels it filled.
    #[inline(always)]
    fn stage<I, C>(&mut self, iterator: I) -> Result<usize, Error<H::Error>>
    where
        I: IntoIterator<Item = C>,
        C: Into<RGB8>,
    {
        // A leaked write future leaves its transmission streaming from
        // `colors`.
        self.driver.wait_idle(self.timeout)?;

        let mut count = 0;
        for (item, slot) in iterator.into_iter().zip(self.colors.iter_mut()) {
            *slot = item.into();
            count += 1;
        }
        Ok(count)
    }
}

impl<H: Hardware, T: DutyCode, const P: usize, const N: usize> SmartLedsWrite
    for Ws2812Writer<'_, '_, H, T, P, N>
{
    type Error = Error<H::Error>;
    type Color = RGB8;

    /// Write all the items of an iterator to the strip, blocking until the
    /// reset frames have been queued.
    fn write<I, C>(&mut self, iterator: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Self::Color>,
    {
        let count = self.stage(iterator)?;
        let pixels = PixelBuffer::from_colors(&self.colors[..count]);
        self.driver.send_colors_with(pixels, self.timeout, |_| ())
    }
}

impl<H: Hardware, T: DutyCode, const P: usize, const N: usize> SmartLedsWriteAsync
    for Ws2812Writer<'_, '_, H, T, P, N>
{
    type Error = Error<H::Error>;
    type Color = RGB8;

    /// Write all the items of an iterator to the strip.
    async fn write<I, C>(&mut self, iterator: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Self::Color>,
    {
        let count = self.stage(iterator)?;
        let pixels = PixelBuffer::from_colors(&self.colors[..count]);
        // SAFETY: `colors` is borrowed for the driver's whole lifetime and
        // `stage` only rewrites it once the driver is idle, so a leaked
        // future cannot expose it to changes while it streams.
        let transmission = unsafe { self.driver.send_colors(pixels, self.timeout)? };
        transmission.wait_async().await;
        Ok(())
    }
}
