use crate::config::MAX_OPEN_FILES;
use crate::println;

pub fn run(_args: &str) {
    let vfs = crate::fs::VFS.lock();
    println!("Mounts:");
    for mount in vfs.mounts() {
        println!("  {}", mount);
    }
    println!("Open handles: {}/{}", vfs.open_handle_count(), MAX_OPEN_FILES);
    println!("cwd: {}", vfs.getcwd());
}
