//! PIT (8253/8254) channel 0 programming and the tick counter it drives
//! (§4.10, §6 "PIT").

use x86_64::instructions::port::Port;

use crate::config::{PIT_BASE_FREQUENCY, TIMER_HZ};

const CHANNEL_0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;
const MODE_3_RATE_GENERATOR: u8 = 0x36; // channel 0, lobyte/hibyte, mode 3, binary

/// Program channel 0 to fire at `TIMER_HZ`. IRQ0 delivery is handled by
/// the PIC, already remapped and unmasked by `interrupts::init`.
pub fn init() {
    let divisor = (PIT_BASE_FREQUENCY / TIMER_HZ) as u16;

    let mut command: Port<u8> = Port::new(COMMAND);
    let mut data: Port<u8> = Port::new(CHANNEL_0_DATA);
    unsafe {
        command.write(MODE_3_RATE_GENERATOR);
        data.write((divisor & 0xFF) as u8);
        data.write((divisor >> 8) as u8);
    }

    crate::log_info!("PIT programmed for {} Hz (divisor {}).", TIMER_HZ, divisor);
}
