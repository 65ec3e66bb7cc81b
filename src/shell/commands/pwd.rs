use crate::println;

pub fn run(_args: &str) {
    println!("{}", crate::fs::VFS.lock().getcwd());
}
