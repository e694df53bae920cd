//! Circular, double-buffered DMA streaming.
//!
//! The timer plays one compare value per WS2812 bit out of a small circular
//! [`DmaBuffer`] made of two halves. While the DMA reads one half, the
//! interrupt handler refills the other with the next pixel, so a strip of
//! any length is sent from a buffer of a few dozen elements.
//!
//! After the last pixel two reset frames (all bits low) are queued, then the
//! timer and DMA are stopped.
//!
//! # Interrupt latency
//!
//! Each half must be refilled before the DMA comes back around to it,
//! roughly `P * 30` µs with the default timing. If an interrupt is missed
//! the hardware replays stale data and the strip shows wrong colors for
//! that frame. The driver notices when both events are pending at once and
//! counts it in [`Diagnostics::overruns`], but it cannot undo what was
//! already sent.

use core::cell::RefCell;
use core::future::poll_fn;
use core::marker::PhantomData;
use core::task::Poll;

use critical_section::Mutex;
use embassy_sync::waitqueue::AtomicWaker;
use embassy_time::{Duration, Instant};

use crate::encoder::{BITS_PER_PIXEL, PixelSlot, encode_pixel, encode_reset};
use crate::error::Error;
use crate::hardware::{DmaConfig, DmaEvent, ElementSize, Hardware, PinMode, PwmConfig};
use crate::pixels::PixelBuffer;
use crate::timing::{DutyCode, DutyCodes, PwmTiming};

/// Reset frames queued after the last pixel so the strip latches.
pub const RESET_FRAMES: usize = 2;

/// One of the two halves of a [`DmaBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    Begin,
    End,
}

impl Half {
    /// The half the hardware has just finished reading when `event` fires.
    pub const fn freed_by(event: DmaEvent) -> Self {
        match event {
            DmaEvent::HalfTransfer => Half::Begin,
            DmaEvent::TransferComplete => Half::End,
        }
    }
}

/// Circular DMA source: two halves of `P` pixel slots each.
///
/// Lives outside the driver (usually in a `static_cell::StaticCell`) so its
/// address stays put while the DMA reads it.
#[repr(C)]
pub struct DmaBuffer<T, const P: usize = 1> {
    halves: [[PixelSlot<T>; P]; 2],
}

impl<T: DutyCode, const P: usize> DmaBuffer<T, P> {
    /// Elements in the whole buffer.
    pub const LEN: usize = 2 * P * BITS_PER_PIXEL;

    pub const fn new() -> Self {
        Self {
            halves: [[[T::RESET; BITS_PER_PIXEL]; P]; 2],
        }
    }

    pub fn half(&self, half: Half) -> &[PixelSlot<T>; P] {
        &self.halves[half as usize]
    }

    fn half_mut(&mut self, half: Half) -> &mut [PixelSlot<T>; P] {
        &mut self.halves[half as usize]
    }

    /// Both halves in DMA order.
    pub fn as_slice(&self) -> &[T] {
        self.halves.as_flattened().as_flattened()
    }

    fn address(&self) -> usize {
        self.halves.as_ptr() as usize
    }
}

impl<T: DutyCode, const P: usize> Default for DmaBuffer<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub timing: PwmTiming,
    pub pin_mode: PinMode,
    pub compare_channel: u8,
    /// Priority of the DMA interrupt.
    pub interrupt_priority: u8,
    /// Width of the timer compare register.
    pub peripheral_element_size: ElementSize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: PwmTiming::default(),
            pin_mode: PinMode::AlternatePushPull,
            compare_channel: 1,
            interrupt_priority: 9,
            peripheral_element_size: ElementSize::HalfWord,
        }
    }
}

/// Position of the active transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Next slot to queue, counting pixels and then reset frames.
    pub current: usize,
    /// Pixels in the transmission.
    pub total: usize,
}

/// Counters kept across transmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub transmissions: u32,
    /// Halves filled, including the two filled when a transmission starts.
    pub refills: u32,
    /// Interrupts with nothing to do.
    pub spurious_interrupts: u32,
    /// Interrupts that found both halves consumed.
    pub overruns: u32,
}

struct Stream {
    current: usize,
    total: usize,
    pixels: PixelBuffer<'static>,
    generation: u32,
}

impl Stream {
    fn fill<T: Copy, const P: usize>(&mut self, half: &mut [PixelSlot<T>; P], codes: &DutyCodes<T>) {
        for slot in half.iter_mut() {
            match self.pixels.pixel(self.current) {
                Ok(color) => encode_pixel(slot, color, codes),
                Err(_) => encode_reset(slot, codes),
            }
            if self.current < self.total + RESET_FRAMES {
                self.current += 1;
            }
        }
    }

    fn is_done(&self) -> bool {
        self.current >= self.total + RESET_FRAMES
    }
}

enum State {
    Idle,
    Streaming(Stream),
}

struct Inner<'d, H, T, const P: usize> {
    hardware: H,
    buffer: &'d mut DmaBuffer<T, P>,
    /// Set by `init`.
    codes: Option<DutyCodes<T>>,
    state: State,
    generation: u32,
    diagnostics: Diagnostics,
}

/// WS2812 driver streaming through a PWM timer and a circular DMA channel.
///
/// `T` is the DMA memory element and `P` the number of pixels per buffer
/// half. Larger `P` means fewer interrupts and a bigger buffer.
///
/// Shared between the code that calls [`send_colors`](Self::send_colors)
/// and the DMA interrupt handler, which must call
/// [`on_interrupt`](Self::on_interrupt). Every state change happens inside
/// a critical section.
pub struct Ws2812Dma<'d, H: Hardware, T: DutyCode = u8, const P: usize = 1> {
    inner: Mutex<RefCell<Inner<'d, H, T, P>>>,
    config: Config,
    waker: AtomicWaker,
}

impl<'d, H: Hardware, T: DutyCode, const P: usize> Ws2812Dma<'d, H, T, P> {
    /// Wrap the platform hardware and the DMA buffer. Nothing is touched
    /// until [`init`](Self::init).
    pub fn new(hardware: H, buffer: &'d mut DmaBuffer<T, P>, config: Config) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                hardware,
                buffer,
                codes: None,
                state: State::Idle,
                generation: 0,
                diagnostics: Diagnostics::default(),
            })),
            config,
            waker: AtomicWaker::new(),
        }
    }

    /// Configure pin, timer, DMA and interrupts. Call once, before the
    /// interrupt vector is bound to [`on_interrupt`](Self::on_interrupt).
    pub fn init(&self) -> Result<(), Error<H::Error>> {
        let codes = DutyCodes::<T>::from_timing(&self.config.timing).ok_or(Error::InvalidTiming)?;
        let config = &self.config;

        critical_section::with(|cs| -> Result<(), Error<H::Error>> {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.codes.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            let Inner {
                hardware, buffer, ..
            } = &mut *inner;

            buffer.halves.as_flattened_mut().as_flattened_mut().fill(codes.reset);

            hardware
                .configure_pin(config.pin_mode)
                .map_err(Error::Hardware)?;
            hardware
                .configure_timer_pwm(&PwmConfig {
                    prescaler: config.timing.prescaler,
                    period_ticks: config.timing.period_ticks,
                    compare_channel: config.compare_channel,
                })
                .map_err(Error::Hardware)?;
            hardware
                .configure_dma_circular(&DmaConfig {
                    source_address: buffer.address(),
                    element_count: DmaBuffer::<T, P>::LEN,
                    memory_element_size: T::ELEMENT_SIZE,
                    peripheral_element_size: config.peripheral_element_size,
                })
                .map_err(Error::Hardware)?;
            for event in [DmaEvent::HalfTransfer, DmaEvent::TransferComplete] {
                hardware
                    .enable_interrupt(event, config.interrupt_priority)
                    .map_err(Error::Hardware)?;
            }

            inner.codes = Some(codes);
            Ok(())
        })?;

        debug!(
            "ws2812: ready, {} pixels per half, period {} ticks",
            P,
            config.timing.period_ticks
        );
        Ok(())
    }

    /// Start sending `pixels` to the strip.
    ///
    /// If another transmission is still streaming, spin until it finishes
    /// or `timeout` runs out. A zero timeout tries once and
    /// [`Duration::MAX`] waits forever. Timeouts leave the running
    /// transmission untouched.
    ///
    /// The returned guard holds on to `pixels`; dropping it blocks until
    /// the strip has been written. [`send_static`](Self::send_static) and
    /// [`send_colors_with`](Self::send_colors_with) are the safe ways in.
    ///
    /// # Safety
    ///
    /// The interrupt handler reads `pixels` until the transmission is
    /// finished, even if the returned [`Transmission`] is leaked with
    /// `core::mem::forget`. The caller must not let the guard leak, or must
    /// otherwise keep the pixel memory alive and unmodified until
    /// [`is_idle`](Self::is_idle) reports the driver idle again.
    ///
    /// Leaking the guard is not caught by the borrow checker:
    ///
    /// ```compile_fail
    /// # use embassy_time::Duration;
    /// # use ws2812_dma_stream::*;
    /// # struct Nop;
    /// # impl Hardware for Nop {
    /// #     type Error = ();
    /// #     fn configure_pin(&mut self, _: PinMode) -> Result<(), ()> { Ok(()) }
    /// #     fn configure_timer_pwm(&mut self, _: &PwmConfig) -> Result<(), ()> { Ok(()) }
    /// #     fn configure_dma_circular(&mut self, _: &DmaConfig) -> Result<(), ()> { Ok(()) }
    /// #     fn enable_interrupt(&mut self, _: DmaEvent, _: u8) -> Result<(), ()> { Ok(()) }
    /// #     fn is_pending(&mut self, _: DmaEvent) -> bool { false }
    /// #     fn clear_pending_interrupt(&mut self, _: DmaEvent) {}
    /// #     fn set_transfer_count(&mut self, _: usize) {}
    /// #     fn start_timer(&mut self) {}
    /// #     fn stop_timer(&mut self) {}
    /// #     fn start_dma(&mut self) {}
    /// #     fn stop_dma(&mut self) {}
    /// # }
    /// # let mut buffer = DmaBuffer::<u8>::new();
    /// # let leds = Ws2812Dma::new(Nop, &mut buffer, Config::default());
    /// let mut colors = [color::RED; 3];
    /// let transmission = leds.send_colors(PixelBuffer::from_colors(&colors), Duration::from_ticks(0));
    /// core::mem::forget(transmission);
    /// colors[2] = color::BLUE;
    /// ```
    pub unsafe fn send_colors<'b>(
        &'b self,
        pixels: PixelBuffer<'b>,
        timeout: Duration,
    ) -> Result<Transmission<'b, 'd, H, T, P>, Error<H::Error>> {
        if pixels.is_empty() {
            return Err(Error::EmptyBuffer);
        }

        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(generation) = self.try_start(pixels)? {
                return Ok(Transmission {
                    driver: self,
                    generation,
                    _pixels: PhantomData,
                });
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!("ws2812: still busy after {} us", timeout.as_micros());
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
    }

    /// [`send_colors`](Self::send_colors) for pixels that live forever.
    ///
    /// The guard may be dropped or leaked freely.
    pub fn send_static(
        &self,
        pixels: PixelBuffer<'static>,
        timeout: Duration,
    ) -> Result<Transmission<'_, 'd, H, T, P>, Error<H::Error>> {
        // SAFETY: `'static` pixels are never freed and, being behind a
        // shared reference, never modified.
        unsafe { self.send_colors(pixels, timeout) }
    }

    /// Send `pixels`, run `f` while they stream, then wait for the strip to
    /// be written before returning what `f` returned.
    ///
    /// Needs the DMA interrupt to keep firing, from `f` or elsewhere.
    pub fn send_colors_with<'b, R>(
        &'b self,
        pixels: PixelBuffer<'b>,
        timeout: Duration,
        f: impl FnOnce(&Transmission<'b, 'd, H, T, P>) -> R,
    ) -> Result<R, Error<H::Error>> {
        // SAFETY: the guard never leaves this function and is waited on
        // before `pixels` goes out of scope.
        let transmission = unsafe { self.send_colors(pixels, timeout)? };
        let result = f(&transmission);
        transmission.wait();
        Ok(result)
    }

    /// Spin until no transmission is streaming, or `timeout` runs out.
    pub fn wait_idle(&self, timeout: Duration) -> Result<(), Error<H::Error>> {
        let deadline = Instant::now().checked_add(timeout);
        while !self.is_idle() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Claim the idle driver and prime both halves, atomically.
    fn try_start(&self, pixels: PixelBuffer<'_>) -> Result<Option<u32>, Error<H::Error>> {
        critical_section::with(|cs| -> Result<Option<u32>, Error<H::Error>> {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let codes = inner.codes.ok_or(Error::NotInitialized)?;
            if matches!(inner.state, State::Streaming(_)) {
                return Ok(None);
            }

            // SAFETY: `send_colors` callers keep the pixels alive and
            // unmodified until the state below is back to idle, which drops
            // this copy.
            let pixels = unsafe { core::mem::transmute::<PixelBuffer<'_>, PixelBuffer<'static>>(pixels) };

            inner.generation = inner.generation.wrapping_add(1);
            let mut stream = Stream {
                current: 0,
                total: pixels.len(),
                pixels,
                generation: inner.generation,
            };

            let Inner {
                hardware,
                buffer,
                diagnostics,
                ..
            } = &mut *inner;
            for half in [Half::Begin, Half::End] {
                stream.fill(buffer.half_mut(half), &codes);
                diagnostics.refills += 1;
            }
            hardware.set_transfer_count(DmaBuffer::<T, P>::LEN);
            hardware.start_dma();
            hardware.start_timer();
            diagnostics.transmissions += 1;

            trace!("ws2812: streaming {} pixels", stream.total);
            let generation = stream.generation;
            inner.state = State::Streaming(stream);
            Ok(Some(generation))
        })
    }

    /// DMA interrupt handler: refill the half the hardware just consumed.
    ///
    /// Bind the DMA channel's interrupt vector to this. Never blocks.
    pub fn on_interrupt(&self) {
        let finished = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let Inner {
                hardware,
                buffer,
                codes,
                state,
                diagnostics,
                ..
            } = &mut *inner;

            let half_transfer = hardware.is_pending(DmaEvent::HalfTransfer);
            let complete = hardware.is_pending(DmaEvent::TransferComplete);
            if half_transfer {
                hardware.clear_pending_interrupt(DmaEvent::HalfTransfer);
            }
            if complete {
                hardware.clear_pending_interrupt(DmaEvent::TransferComplete);
            }

            let (State::Streaming(stream), Some(codes)) = (&mut *state, codes.as_ref()) else {
                // Late interrupt after the last transmission ended.
                hardware.stop_timer();
                hardware.stop_dma();
                diagnostics.spurious_interrupts += 1;
                warn!("ws2812: interrupt while idle");
                return false;
            };

            let half = match (half_transfer, complete) {
                (true, false) => Half::freed_by(DmaEvent::HalfTransfer),
                (false, true) => Half::freed_by(DmaEvent::TransferComplete),
                (true, true) => {
                    // The DMA already wrapped and is reading `Begin` again.
                    diagnostics.overruns += 1;
                    warn!("ws2812: refill overrun at slot {}", stream.current);
                    Half::End
                }
                (false, false) => {
                    diagnostics.spurious_interrupts += 1;
                    return false;
                }
            };

            stream.fill(buffer.half_mut(half), codes);
            diagnostics.refills += 1;

            if stream.is_done() {
                hardware.stop_timer();
                hardware.stop_dma();
                *state = State::Idle;
                trace!("ws2812: transmission done");
                return true;
            }
            false
        });

        if finished {
            self.waker.wake();
        }
    }

    pub fn is_idle(&self) -> bool {
        critical_section::with(|cs| matches!(self.inner.borrow_ref(cs).state, State::Idle))
    }

    /// Cursor of the active transmission, `None` when idle.
    pub fn progress(&self) -> Option<Progress> {
        critical_section::with(|cs| match &self.inner.borrow_ref(cs).state {
            State::Idle => None,
            State::Streaming(stream) => Some(Progress {
                current: stream.current,
                total: stream.total,
            }),
        })
    }

    pub fn diagnostics(&self) -> Diagnostics {
        critical_section::with(|cs| self.inner.borrow_ref(cs).diagnostics)
    }

    /// Copy of one half of the DMA buffer.
    pub fn dma_half(&self, half: Half) -> [PixelSlot<T>; P] {
        critical_section::with(|cs| *self.inner.borrow_ref(cs).buffer.half(half))
    }

    /// Run `f` on the platform hardware inside a critical section.
    ///
    /// `f` must not call back into the driver.
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs).hardware))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn is_finished(&self, generation: u32) -> bool {
        critical_section::with(|cs| match &self.inner.borrow_ref(cs).state {
            State::Streaming(stream) => stream.generation != generation,
            State::Idle => true,
        })
    }
}

/// A transmission started by [`Ws2812Dma::send_colors`] or one of its safe
/// wrappers.
///
/// Keeps the pixel buffer borrowed until the driver is done with it.
#[must_use = "dropping a transmission blocks until the strip has been written"]
pub struct Transmission<'b, 'd, H: Hardware, T: DutyCode, const P: usize> {
    driver: &'b Ws2812Dma<'d, H, T, P>,
    generation: u32,
    _pixels: PhantomData<&'b [u8]>,
}

impl<H: Hardware, T: DutyCode, const P: usize> Transmission<'_, '_, H, T, P> {
    /// All pixels and reset frames have been queued and the hardware stopped.
    pub fn is_finished(&self) -> bool {
        self.driver.is_finished(self.generation)
    }

    /// Spin until finished. Needs the DMA interrupt to keep firing.
    pub fn wait(self) {
        while !self.is_finished() {
            core::hint::spin_loop();
        }
    }

    /// Wait for the interrupt handler to report completion.
    pub async fn wait_async(self) {
        poll_fn(|cx| {
            self.driver.waker.register(cx.waker());
            if self.is_finished() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

impl<H: Hardware, T: DutyCode, const P: usize> Drop for Transmission<'_, '_, H, T, P> {
    fn drop(&mut self) {
        while !self.is_finished() {
            core::hint::spin_loop();
        }
    }
}
