use crate::allocator::{free_bytes, used_bytes};
use crate::println;

pub fn run(_args: &str) {
    println!("{} KiB used, {} KiB free", used_bytes() / 1024, free_bytes() / 1024);
}
