#![allow(dead_code)]

use ws2812_dma_stream::encoder::{BITS_PER_PIXEL, PixelSlot, encode_pixel};
use ws2812_dma_stream::{
    Config, DmaConfig, DmaEvent, DutyCode, DutyCodes, Half, Hardware, PinMode, PwmConfig,
    Ws2812Dma, RGB8,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeError {
    DmaChannelClaimed,
}

/// Records what the driver asks of the peripherals. Interrupt flags are
/// raised by the test.
#[derive(Debug, Default)]
pub struct FakeHardware {
    pub pin: Option<PinMode>,
    pub pwm: Option<PwmConfig>,
    pub dma: Option<DmaConfig>,
    pub interrupts: Vec<(DmaEvent, u8)>,
    pub half_transfer_pending: bool,
    pub complete_pending: bool,
    pub transfer_count: Option<usize>,
    pub timer_running: bool,
    pub dma_running: bool,
    pub starts: u32,
    pub dma_claimed: bool,
}

impl FakeHardware {
    pub fn raise(&mut self, event: DmaEvent) {
        match event {
            DmaEvent::HalfTransfer => self.half_transfer_pending = true,
            DmaEvent::TransferComplete => self.complete_pending = true,
        }
    }
}

impl Hardware for FakeHardware {
    type Error = FakeError;

    fn configure_pin(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        self.pin = Some(mode);
        Ok(())
    }

    fn configure_timer_pwm(&mut self, config: &PwmConfig) -> Result<(), Self::Error> {
        self.pwm = Some(*config);
        Ok(())
    }

    fn configure_dma_circular(&mut self, config: &DmaConfig) -> Result<(), Self::Error> {
        if self.dma_claimed {
            return Err(FakeError::DmaChannelClaimed);
        }
        self.dma = Some(*config);
        Ok(())
    }

    fn enable_interrupt(&mut self, event: DmaEvent, priority: u8) -> Result<(), Self::Error> {
        self.interrupts.push((event, priority));
        Ok(())
    }

    fn is_pending(&mut self, event: DmaEvent) -> bool {
        match event {
            DmaEvent::HalfTransfer => self.half_transfer_pending,
            DmaEvent::TransferComplete => self.complete_pending,
        }
    }

    fn clear_pending_interrupt(&mut self, event: DmaEvent) {
        match event {
            DmaEvent::HalfTransfer => self.half_transfer_pending = false,
            DmaEvent::TransferComplete => self.complete_pending = false,
        }
    }

    fn set_transfer_count(&mut self, elements: usize) {
        self.transfer_count = Some(elements);
    }

    fn start_timer(&mut self) {
        self.timer_running = true;
        self.starts += 1;
    }

    fn stop_timer(&mut self) {
        self.timer_running = false;
    }

    fn start_dma(&mut self) {
        self.dma_running = true;
    }

    fn stop_dma(&mut self) {
        self.dma_running = false;
    }
}

pub fn codes() -> DutyCodes<u8> {
    DutyCodes::from_timing(&Config::default().timing).unwrap()
}

pub fn encoded(color: RGB8) -> PixelSlot<u8> {
    let mut slot = [0; BITS_PER_PIXEL];
    encode_pixel(&mut slot, color, &codes());
    slot
}

pub const RESET: PixelSlot<u8> = [0; BITS_PER_PIXEL];

/// Raise `event` and run the interrupt handler, like the DMA would.
pub fn interrupt<T: DutyCode, const P: usize>(
    driver: &Ws2812Dma<'_, FakeHardware, T, P>,
    event: DmaEvent,
) {
    driver.with_hardware(|hw| hw.raise(event));
    driver.on_interrupt();
}

/// Play the circular buffer until the driver goes idle. Returns the pixel
/// slots the hardware read, in order.
pub fn play<T: DutyCode, const P: usize>(
    driver: &Ws2812Dma<'_, FakeHardware, T, P>,
) -> Vec<PixelSlot<T>> {
    let mut played = Vec::new();
    let mut events = [DmaEvent::HalfTransfer, DmaEvent::TransferComplete]
        .into_iter()
        .cycle();
    while !driver.is_idle() {
        let event = events.next().unwrap();
        played.extend(driver.dma_half(Half::freed_by(event)));
        interrupt(driver, event);
        assert!(played.len() < 10_000, "driver never went idle");
    }
    played
}

/// Number of interrupts it takes to finish the current transmission.
pub fn interrupts_until_idle<T: DutyCode, const P: usize>(
    driver: &Ws2812Dma<'_, FakeHardware, T, P>,
) -> usize {
    play(driver).len() / P
}
