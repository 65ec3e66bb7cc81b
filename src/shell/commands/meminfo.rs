use crate::allocator::{free_bytes, used_bytes, HEAP_SIZE};
use crate::println;

pub fn run(_args: &str) {
    let used = used_bytes();
    let free = free_bytes();
    println!("Heap size:  {} KiB", HEAP_SIZE / 1024);
    println!("Used:       {} KiB ({}%)", used / 1024, used * 100 / HEAP_SIZE);
    println!("Free:       {} KiB", free / 1024);
}
