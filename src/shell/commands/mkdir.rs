use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("mkdir: missing operand");
        return;
    }
    if let Err(e) = crate::fs::VFS.lock().mkdir(path) {
        println!("mkdir: {}: {}", path, e);
    }
}
