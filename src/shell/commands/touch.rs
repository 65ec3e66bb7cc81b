use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("touch: missing file operand");
        return;
    }
    match crate::fs::VFS.lock().create(path) {
        Ok(_) => {}
        Err(e) => println!("touch: {}: {}", path, e),
    }
}
