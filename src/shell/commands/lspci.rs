use crate::println;

pub fn run(_args: &str) {
    for dev in crate::pci::devices() {
        println!(
            "{:02x}:{:02x}.{} {:04x}:{:04x} class {:02x}:{:02x}",
            dev.bus, dev.device, dev.function, dev.vendor_id, dev.device_id, dev.class_code, dev.subclass
        );
    }
}
