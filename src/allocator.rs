//! Kernel heap. A fixed static arena handed to `linked_list_allocator`,
//! since there is no demand paging to grow the heap lazily (§2 Non-goals).

use linked_list_allocator::LockedHeap;

pub const HEAP_SIZE: usize = 1024 * 1024; // 1 MiB

#[repr(align(16))]
struct HeapArena([u8; HEAP_SIZE]);

static mut HEAP_ARENA: HeapArena = HeapArena([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Hand the static arena to the allocator. Must run exactly once, before
/// any `alloc`-backed type (`Vec`, `String`, `Box`, ...) is used.
pub fn init_heap() {
    unsafe {
        let start = core::ptr::addr_of_mut!(HEAP_ARENA) as *mut u8;
        ALLOCATOR.lock().init(start, HEAP_SIZE);
    }
}

pub fn used_bytes() -> usize {
    ALLOCATOR.lock().used()
}

pub fn free_bytes() -> usize {
    ALLOCATOR.lock().free()
}
