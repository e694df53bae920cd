//! WS2812 bit timing and the PWM compare values that produce it.

use crate::hardware::ElementSize;

/// WS2812 0-bit high time in ns.
pub const T0H_NS: u32 = 400;
/// WS2812 1-bit high time in ns.
pub const T1H_NS: u32 = 800;
/// WS2812 total bit time in ns (800 kHz carrier).
pub const FRAME_NS: u32 = 1250;

/// Timer input clock assumed by [`PwmTiming::default`].
pub const DEFAULT_INPUT_CLOCK_HZ: u32 = 72_000_000;
/// Timer tick rate used by [`PwmTiming::default`].
pub const DEFAULT_TICK_HZ: u32 = 24_000_000;

/// Convert nanoseconds to timer ticks at `tick_hz`, rounding.
pub const fn to_ticks(ns: u32, tick_hz: u32) -> u32 {
    ((ns as u64 * tick_hz as u64 + 500_000_000) / 1_000_000_000) as u32
}

/// Timer settings for one WS2812 bit per PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmTiming {
    /// Input clock divider, as written to the prescaler register.
    pub prescaler: u16,
    /// Ticks per PWM period.
    pub period_ticks: u16,
    /// High time of a 0 bit in ticks.
    pub zero_high_ticks: u16,
    /// High time of a 1 bit in ticks.
    pub one_high_ticks: u16,
}

impl PwmTiming {
    /// Timing for a timer fed by `input_clock_hz` and prescaled down to
    /// `tick_hz`.
    pub const fn new(input_clock_hz: u32, tick_hz: u32) -> Self {
        Self {
            prescaler: (input_clock_hz / tick_hz - 1) as u16,
            period_ticks: to_ticks(FRAME_NS, tick_hz) as u16,
            zero_high_ticks: to_ticks(T0H_NS, tick_hz) as u16,
            one_high_ticks: to_ticks(T1H_NS, tick_hz) as u16,
        }
    }
}

impl Default for PwmTiming {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_CLOCK_HZ, DEFAULT_TICK_HZ)
    }
}

/// A DMA memory element holding one compare value.
pub trait DutyCode: Copy + Send {
    /// Width of one element for the DMA memory side.
    const ELEMENT_SIZE: ElementSize;
    /// Compare value that keeps the line low for a whole bit.
    const RESET: Self;

    /// `None` if `ticks` does not fit the element.
    fn from_ticks(ticks: u16) -> Option<Self>;
}

impl DutyCode for u8 {
    const ELEMENT_SIZE: ElementSize = ElementSize::Byte;
    const RESET: Self = 0;

    fn from_ticks(ticks: u16) -> Option<Self> {
        u8::try_from(ticks).ok()
    }
}

impl DutyCode for u16 {
    const ELEMENT_SIZE: ElementSize = ElementSize::HalfWord;
    const RESET: Self = 0;

    fn from_ticks(ticks: u16) -> Option<Self> {
        Some(ticks)
    }
}

/// The three compare values written into the DMA buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCodes<T> {
    /// Short pulse, logical 0.
    pub zero: T,
    /// Long pulse, logical 1.
    pub one: T,
    /// Line held low, used for reset frames.
    pub reset: T,
}

impl<T: DutyCode> DutyCodes<T> {
    /// `None` if the pulses are not `0 < zero < one < period` or do not fit `T`.
    pub fn from_timing(timing: &PwmTiming) -> Option<Self> {
        let PwmTiming {
            period_ticks,
            zero_high_ticks,
            one_high_ticks,
            ..
        } = *timing;
        if zero_high_ticks == 0 || zero_high_ticks >= one_high_ticks || one_high_ticks >= period_ticks
        {
            return None;
        }
        Some(Self {
            zero: T::from_ticks(zero_high_ticks)?,
            one: T::from_ticks(one_high_ticks)?,
            reset: T::RESET,
        })
    }
}
