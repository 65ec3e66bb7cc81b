use crate::println;

pub fn run(args: &str) {
    let path = if args.trim().is_empty() { "." } else { args.trim() };
    match crate::fs::VFS.lock().readdir(path) {
        Ok(entries) => {
            for entry in entries {
                let marker = if entry.file_type == crate::fs::inode::FileType::Directory { "/" } else { "" };
                println!("  {}{}", entry.name, marker);
            }
        }
        Err(e) => println!("ls: {}: {}", path, e),
    }
}
