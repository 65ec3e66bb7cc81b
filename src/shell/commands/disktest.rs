use crate::println;

/// Round-trips a throwaway sector through the primary ATA device to
/// confirm PIO reads and writes both work.
pub fn run(_args: &str) {
    const TEST_LBA: u32 = 1;
    let dev = crate::drivers::ata::PRIMARY_ATA.lock();
    if !dev.detected {
        println!("disktest: no disk detected");
        return;
    }

    let mut original = [0u8; 512];
    if let Err(e) = dev.read_sector(TEST_LBA, &mut original) {
        println!("disktest: read failed: {}", e);
        return;
    }

    let mut pattern = [0u8; 512];
    for (i, byte) in pattern.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }
    if let Err(e) = dev.write_sector(TEST_LBA, &pattern) {
        println!("disktest: write failed: {}", e);
        return;
    }

    let mut readback = [0u8; 512];
    if let Err(e) = dev.read_sector(TEST_LBA, &mut readback) {
        println!("disktest: readback failed: {}", e);
        return;
    }

    if readback == pattern {
        println!("disktest: pass (sector {} round-trips)", TEST_LBA);
    } else {
        println!("disktest: FAIL - readback mismatch");
    }

    if dev.write_sector(TEST_LBA, &original).is_err() {
        println!("disktest: warning - failed to restore original sector contents");
    }
}
