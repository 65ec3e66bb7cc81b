pub mod vfs;
pub mod inode;
pub mod dentry;
pub mod mount;
pub mod ramfs;
pub mod fat32;

use spin::Mutex;
use lazy_static::lazy_static;
use vfs::Vfs;

lazy_static! {
    pub static ref VFS: Mutex<Vfs> = Mutex::new(Vfs::new());
    static ref FAT32_FS: Mutex<Option<fat32::Fat32Fs>> = Mutex::new(None);
}

/// Mount RAM-FS at `/` and tmpfs at `/tmp`, then seed a handful of default
/// files so the shell has something to look at before a disk is mounted.
pub fn init() {
    {
        let mut vfs = VFS.lock();
        let ramfs: &'static ramfs::RamFs = &ramfs::RAMFS_INSTANCE;
        let _ = vfs.mount("/", ramfs);
        let tmpfs: &'static ramfs::RamFs = &ramfs::TMPFS_INSTANCE;
        let _ = vfs.mount("/tmp", tmpfs);
    }
    seed_default_files();
    crate::log_info!("VFS initialized: ramfs at /, tmpfs at /tmp.");
}

/// Mount FAT32 from the primary ATA disk at the default `/disk` mount
/// point. Called once at boot, after `drivers::ata::init()`. Failure
/// leaves `/disk` unavailable but is not fatal — the kernel still has
/// RAM-FS.
pub fn mount_fat32() -> bool {
    mount_fat32_at("/disk").is_ok()
}

/// Mount FAT32 from the primary ATA disk at an arbitrary path, used by
/// the shell's `mount` command. A FAT32 filesystem is already initialised
/// from a prior call reuses it rather than re-reading the superblock.
pub fn mount_fat32_at(path: &str) -> crate::error::KernelResult<()> {
    {
        let mut slot = FAT32_FS.lock();
        if slot.is_none() {
            *slot = Some(fat32::Fat32Fs::init().map_err(|e| {
                crate::log_warn!("FAT32 init failed: {}", e);
                e
            })?);
        }
    }
    let slot = FAT32_FS.lock();
    // Safety: `FAT32_FS` lives for the remainder of the kernel's
    // execution, so a raw pointer into the `Mutex`'s contents is sound to
    // reinterpret as `'static` once installed.
    let fat_ref: &'static fat32::Fat32Fs = unsafe { &*(slot.as_ref().unwrap() as *const fat32::Fat32Fs) };
    drop(slot);
    VFS.lock().mount(path, fat_ref).map(|()| {
        crate::log_info!("FAT32 mounted at {}.", path);
    })
}

/// Unmount whatever filesystem is mounted at `path` (`/disk` itself is
/// unaffected — only the VFS mount-table entry is removed; the FAT32
/// backend stays initialised for a later re-mount).
pub fn unmount(path: &str) -> crate::error::KernelResult<()> {
    VFS.lock().unmount(path)
}

fn seed_default_files() {
    let mut vfs = VFS.lock();
    let _ = vfs.mkdir("/boot");
    let _ = vfs.mkdir("/etc");
    let _ = vfs.mkdir("/home");
    let _ = vfs.mkdir("/apps");
    let _ = vfs.create("/README.md");
    let _ = vfs.write_file("/README.md", b"# ContinuumOS\nA small preemptive x86 kernel.\n");
    let _ = vfs.create("/etc/hostname");
    let _ = vfs.write_file("/etc/hostname", b"continuumos\n");
}
