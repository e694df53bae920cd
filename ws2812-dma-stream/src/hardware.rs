//! What the driver needs from the platform.
//!
//! A [`Hardware`] implementation owns the concrete output pin, PWM timer,
//! DMA channel and interrupt line. The driver tells it what to set up and
//! when to start and stop, but never touches registers itself.

/// Output pin mode for the timer compare channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    #[default]
    AlternatePushPull,
    AlternateOpenDrain,
}

/// Width of one DMA element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ElementSize {
    Byte,
    HalfWord,
    Word,
}

impl ElementSize {
    pub const fn bytes(self) -> usize {
        match self {
            ElementSize::Byte => 1,
            ElementSize::HalfWord => 2,
            ElementSize::Word => 4,
        }
    }
}

/// DMA interrupt conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaEvent {
    /// First half of the circular buffer consumed.
    HalfTransfer,
    /// Whole buffer consumed; DMA wrapped to the start.
    TransferComplete,
}

/// PWM timer setup. One period is one WS2812 bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmConfig {
    pub prescaler: u16,
    /// Ticks per period. Timers that count to an auto-reload value want
    /// `period_ticks - 1`.
    pub period_ticks: u16,
    pub compare_channel: u8,
}

/// Circular memory-to-peripheral DMA setup.
///
/// The destination is the compare register of the channel given in
/// [`PwmConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    /// Address of the first element of the circular buffer.
    pub source_address: usize,
    /// Elements in the whole buffer (both halves).
    pub element_count: usize,
    pub memory_element_size: ElementSize,
    pub peripheral_element_size: ElementSize,
}

/// Clocks, pin, timer, DMA and interrupt controller access for one strip.
///
/// The configuration calls run once from [`Ws2812Dma::init`]. The remaining
/// calls run from [`Ws2812Dma::send_colors`] and
/// [`Ws2812Dma::on_interrupt`], always inside a critical section, so they
/// must not block.
///
/// [`Ws2812Dma::init`]: crate::Ws2812Dma::init
/// [`Ws2812Dma::send_colors`]: crate::Ws2812Dma::send_colors
/// [`Ws2812Dma::on_interrupt`]: crate::Ws2812Dma::on_interrupt
pub trait Hardware {
    /// Reason a peripheral could not be claimed or configured.
    type Error;

    fn configure_pin(&mut self, mode: PinMode) -> Result<(), Self::Error>;

    fn configure_timer_pwm(&mut self, config: &PwmConfig) -> Result<(), Self::Error>;

    fn configure_dma_circular(&mut self, config: &DmaConfig) -> Result<(), Self::Error>;

    /// Unmask `event` at the DMA channel and enable its interrupt line at
    /// `priority`.
    fn enable_interrupt(&mut self, event: DmaEvent, priority: u8) -> Result<(), Self::Error>;

    fn is_pending(&mut self, event: DmaEvent) -> bool;

    fn clear_pending_interrupt(&mut self, event: DmaEvent);

    /// Load the number of elements for the next DMA run.
    fn set_transfer_count(&mut self, elements: usize);

    fn start_timer(&mut self);

    fn stop_timer(&mut self);

    fn start_dma(&mut self);

    fn stop_dma(&mut self);
}
