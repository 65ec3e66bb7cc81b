#![no_std]
#![feature(abi_x86_interrupt)]
#![feature(naked_functions)]

extern crate alloc;

pub mod allocator;
pub mod compositor;
pub mod config;
pub mod drivers;
pub mod editor;
pub mod error;
pub mod fs;
pub mod interrupts;
pub mod loader;
pub mod memory;
pub mod pci;
pub mod process;
pub mod serial;
pub mod shell;
pub mod syscalls;
pub mod timer;

use core::panic::PanicInfo;

/// Entry point. The boot stub hands off in the Multiboot1 calling
/// convention: magic in `eax`, info-struct pointer in `ebx` — we only
/// need the latter, so the linker-provided trampoline passes it as our
/// sole argument.
#[no_mangle]
pub extern "C" fn _start(multiboot_info_ptr: u32) -> ! {
    serial::init();
    interrupts::init();
    log_info!("ContinuumOS kernel started.");

    memory::init(multiboot_info_ptr);
    fs::init();
    process::init();
    compositor::init();
    pci::init();
    timer::init();
    syscalls::init();
    drivers::init();

    drivers::ata::init();
    if fs::mount_fat32() {
        log_info!("Disk mounted.");
    }

    let shell_stack = config::DEFAULT_STACK_SIZE;
    match process::spawn("shell", shell::shell_entry as u32, shell_stack) {
        Ok(pid) => log_info!("Spawned shell, pid {}.", pid),
        Err(e) => log_error!("Failed to spawn shell: {}", e),
    }

    match loader::elf::load("/apps/hello.app", "hello", "hello_main", None, "") {
        Ok(pid) => log_info!("Loaded /apps/hello.app, pid {}.", pid),
        Err(e) => log_warn!("No app loaded from /apps/hello.app: {}", e),
    }

    println!("ContinuumOS is running.");
    x86_64::instructions::interrupts::enable();

    loop {
        x86_64::instructions::hlt();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    log_error!("{}", info);
    loop {
        x86_64::instructions::hlt();
    }
}
