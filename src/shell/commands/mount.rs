use crate::println;

/// `mount [device] <path>` — only the primary ATA disk is supported, so
/// a device name is accepted but ignored if given.
pub fn run(args: &str) {
    let trimmed = args.trim();
    let path = trimmed.rsplit(' ').next().unwrap_or(trimmed);
    if path.is_empty() {
        println!("mount: missing mount point");
        return;
    }
    match crate::fs::mount_fat32_at(path) {
        Ok(()) => println!("Mounted FAT32 at {}", path),
        Err(e) => println!("mount: {}: {}", path, e),
    }
}
