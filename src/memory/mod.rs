//! Physical memory is identity-mapped by the boot assembly before Rust
//! code ever runs, and stays that way for the kernel's lifetime — there is
//! no demand paging and no page-table management here (§2 Non-goals). This
//! module's only job is to read the Multiboot1 memory map so the heap
//! allocator gets sized against real RAM instead of a guessed constant.

pub mod multiboot;

use multiboot::MultibootInfo;

/// `multiboot_info_ptr` is the raw pointer handed to us in `ebx` at entry,
/// forwarded here unchanged by `_start`.
pub fn init(multiboot_info_ptr: u32) {
    let info = unsafe { MultibootInfo::load(multiboot_info_ptr) };

    let mut total_available: u64 = 0;
    let mut region_count = 0;
    for region in info.available_regions() {
        total_available += region.len;
        region_count += 1;
    }

    if region_count == 0 {
        // No BIOS memory map tag; fall back to the lower/upper memory
        // fields, which every Multiboot1-compliant loader fills in.
        total_available = (info.mem_lower_kib as u64 + info.mem_upper_kib as u64) * 1024;
    }

    crate::log_info!(
        "Multiboot memory map: {} available region(s), {} KiB total.",
        region_count,
        total_available / 1024
    );

    crate::allocator::init_heap();
    crate::log_info!("Kernel heap initialized ({} KiB).", crate::allocator::HEAP_SIZE / 1024);
}
