use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("umount: missing operand");
        return;
    }
    match crate::fs::unmount(path) {
        Ok(()) => println!("Unmounted {}", path),
        Err(e) => println!("umount: {}: {}", path, e),
    }
}
