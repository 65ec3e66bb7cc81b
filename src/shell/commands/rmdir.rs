use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("rmdir: missing operand");
        return;
    }
    if let Err(e) = crate::fs::VFS.lock().rmdir(path) {
        println!("rmdir: {}: {}", path, e);
    }
}
