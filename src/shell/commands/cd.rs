use crate::println;

pub fn run(args: &str) {
    let target = args.trim();
    let target = if target.is_empty() { "/" } else { target };
    if let Err(e) = crate::fs::VFS.lock().chdir(target) {
        println!("cd: {}: {}", target, e);
    }
}
