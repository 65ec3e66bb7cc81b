use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("cat: missing filename");
        return;
    }
    match crate::fs::VFS.lock().read_file(path) {
        Ok(bytes) => match core::str::from_utf8(&bytes) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("cat: {}: not valid text", path),
        },
        Err(e) => println!("cat: {}: {}", path, e),
    }
}
