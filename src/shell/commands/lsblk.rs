use crate::println;

pub fn run(_args: &str) {
    let dev = crate::drivers::ata::PRIMARY_ATA.lock();
    if dev.detected {
        println!("ata0-master  512B sectors");
    } else {
        println!("(no block devices detected)");
    }
}
