use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("rm: missing operand");
        return;
    }
    if let Err(e) = crate::fs::VFS.lock().remove(path) {
        println!("rm: {}: {}", path, e);
    }
}
