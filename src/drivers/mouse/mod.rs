//! PS/2 auxiliary device driver (§4.10). Negotiates the Intellimouse
//! scroll-wheel extension, decodes 3- or 4-byte packets depending on what
//! the negotiation returned, and dispatches the result as an
//! `Event::Mouse` to the foreground process.

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::process::event::Event;

const PORT_DATA: u16 = 0x60;
const PORT_STATUS: u16 = 0x64;
const PORT_COMMAND: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_INPUT_FULL: u8 = 0x02;

struct MouseState {
    packet: [u8; 4],
    bytes_received: usize,
    packet_size: usize,
    x: i32,
    y: i32,
    buttons: u8,
}

impl MouseState {
    const fn new() -> Self {
        MouseState { packet: [0; 4], bytes_received: 0, packet_size: 3, x: SCREEN_WIDTH / 2, y: SCREEN_HEIGHT / 2, buttons: 0 }
    }

    fn process_byte(&mut self, byte: u8) -> Option<Event> {
        if self.bytes_received == 0 && (byte & 0x08) == 0 {
            return None; // desynced, first byte must have bit 3 set
        }
        self.packet[self.bytes_received] = byte;
        self.bytes_received += 1;
        if self.bytes_received < self.packet_size {
            return None;
        }
        self.bytes_received = 0;
        Some(self.decode())
    }

    fn decode(&mut self) -> Event {
        let flags = self.packet[0];
        let mut dx = self.packet[1] as i32;
        let mut dy = self.packet[2] as i32;
        if flags & 0x10 != 0 {
            dx -= 256;
        }
        if flags & 0x20 != 0 {
            dy -= 256;
        }
        dy = -dy; // PS/2 is bottom-up; screen coordinates are top-down

        let scroll = if self.packet_size == 4 {
            // Low nibble of the 4th byte is a signed 4-bit scroll delta.
            let raw = (self.packet[3] & 0x0F) as i8;
            if raw >= 8 { (raw - 16) as i32 } else { raw as i32 }
        } else {
            0
        };

        let new_buttons = flags & 0x07;
        let changed = new_buttons ^ self.buttons;
        self.buttons = new_buttons;

        self.x = (self.x + dx).clamp(0, SCREEN_WIDTH - 1);
        self.y = (self.y + dy).clamp(0, SCREEN_HEIGHT - 1);

        Event::Mouse {
            x: self.x,
            y: self.y,
            dx,
            dy,
            scroll,
            buttons: new_buttons,
            changed,
            target_pid: 0, // filled in by the dispatcher once the compositor hit-tests
        }
    }
}

lazy_static! {
    static ref MOUSE_STATE: Mutex<MouseState> = Mutex::new(MouseState::new());
}

fn wait_write_ready() {
    let mut status: Port<u8> = Port::new(PORT_STATUS);
    while unsafe { status.read() } & STATUS_INPUT_FULL != 0 {}
}

fn wait_read_ready() {
    let mut status: Port<u8> = Port::new(PORT_STATUS);
    while unsafe { status.read() } & STATUS_OUTPUT_FULL == 0 {}
}

fn write_command(cmd: u8) {
    wait_write_ready();
    let mut port: Port<u8> = Port::new(PORT_COMMAND);
    unsafe { port.write(cmd) };
}

fn write_aux_data(data: u8) {
    write_command(0xD4);
    wait_write_ready();
    let mut port: Port<u8> = Port::new(PORT_DATA);
    unsafe { port.write(data) };
}

fn read_data() -> u8 {
    wait_read_ready();
    let mut port: Port<u8> = Port::new(PORT_DATA);
    unsafe { port.read() }
}

fn set_sample_rate(rate: u8) {
    write_aux_data(0xF3);
    let _ack = read_data();
    write_aux_data(rate);
    let _ack = read_data();
}

/// Magic `200, 100, 80` sample-rate sequence; a mouse that supports the
/// scroll wheel reports device ID `0x03` (or `0x04` for a 5-button mouse
/// after a second such sequence) afterwards instead of the default `0x00`.
fn negotiate_scroll_wheel() -> bool {
    set_sample_rate(200);
    set_sample_rate(100);
    set_sample_rate(80);
    write_aux_data(0xF2); // get device ID
    let _ack = read_data();
    let id = read_data();
    id == 0x03 || id == 0x04
}

pub fn init() {
    write_command(0xA8); // enable auxiliary device
    write_command(0x20); // read controller configuration byte
    let mut config = read_data();
    config |= 0x02; // enable IRQ12
    config &= !0x20; // enable the aux clock line
    write_command(0x60);
    write_aux_data(config);

    let has_wheel = negotiate_scroll_wheel();
    {
        let mut state = MOUSE_STATE.lock();
        state.packet_size = if has_wheel { 4 } else { 3 };
    }

    write_aux_data(0xF4); // enable packet streaming
    let _ack = read_data();

    crate::log_info!("PS/2 mouse driver initialized ({}-byte packets).", if has_wheel { 4 } else { 3 });
}

/// Called from the IRQ12 handler with one raw byte from the aux port.
pub fn push_byte(byte: u8) {
    let event = MOUSE_STATE.lock().process_byte(byte);
    let Some(mut event) = event else { return };

    let Event::Mouse { x, y, .. } = event else { unreachable!() };
    let owner = crate::compositor::COMPOSITOR.lock().owner_at(x, y);
    if let Event::Mouse { target_pid, .. } = &mut event {
        *target_pid = owner.unwrap_or(0);
    }

    let mut scheduler = crate::process::SCHEDULER.lock();
    match owner {
        Some(pid) => {
            let _ = scheduler.deliver_to(pid, event);
        }
        None => scheduler.deliver_to_foreground(event),
    }
}
