pub mod ata;
pub mod keyboard;
pub mod mouse;

pub fn init() {
    keyboard::init();
    mouse::init();
    ata::init();
    crate::log_info!("Drivers subsystem initialized.");
}
