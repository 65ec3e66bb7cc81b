pub mod scancodes;

use lazy_static::lazy_static;
use scancodes::KeyboardState;
use spin::Mutex;
use x86_64::instructions::port::Port;

use crate::process::event::Event;

lazy_static! {
    static ref KEYBOARD_STATE: Mutex<KeyboardState> = Mutex::new(KeyboardState::new());
}

pub fn init() {
    let mut port: Port<u8> = Port::new(0x60);
    let _residual = unsafe { port.read() };
    crate::log_info!("PS/2 keyboard driver initialized.");
}

/// Keys that editors/shells care about distinctly from printable text.
fn is_edit_key(scancode: u8) -> bool {
    matches!(scancode & 0x7F, 0x1C | 0x0E | 0x48 | 0x4B | 0x4D | 0x50)
}

/// Called from the IRQ1 handler with the raw scancode. Updates modifier
/// state, then delivers an `Event::Keyboard` to whichever process is
/// currently in the foreground (§4.10).
pub fn push_scancode(scancode: u8) {
    let released = scancode & 0x80 != 0;
    let mut state = KEYBOARD_STATE.lock();
    let keycode = state.process_scancode(scancode & 0x7F);
    let ascii = match keycode {
        scancodes::KeyCode::Char(c) => Some(c as u8),
        scancodes::KeyCode::Space => Some(b' '),
        scancodes::KeyCode::Enter => Some(b'\n'),
        scancodes::KeyCode::Backspace => Some(0x08),
        _ => None,
    };
    let event = Event::Keyboard {
        scancode,
        shift: state.shift(),
        ctrl: state.ctrl(),
        alt: state.alt(),
        released,
        is_edit_key: is_edit_key(scancode),
        ascii,
    };
    drop(state);
    crate::process::SCHEDULER.lock().deliver_to_foreground(event);
}
