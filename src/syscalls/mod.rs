//! Syscall surface (§4.3). Entered via `int 0x80` in a real build; here
//! each syscall is a plain function taking already-validated arguments —
//! the trap handler's job is only to decode registers and call these.
//!
//! All pointer arguments are trusted (single address space, §4.3). Every
//! fallible call returns the negative-integer encoding of `KernelError`
//! (§7) on failure.

use alloc::string::String;
use alloc::vec::Vec;

use crate::compositor::{GuiCommandKind, COMPOSITOR};
use crate::error::success_raw;
use crate::fs::dentry::Dirent;
use crate::fs::VFS;
use crate::pci;
use crate::process::event::Event;
use crate::process::hooks::HookKind;
use crate::process::task::{Pid, WindowId};

pub fn init() {
    crate::log_info!("Syscall interface initialized.");
}

// ---- Process -----------------------------------------------------------

pub fn sys_yield() {
    crate::process::yield_now();
}

pub fn sys_yield_for_event(kind: HookKind, value: u32) {
    crate::process::yield_for_event(kind, value);
}

pub fn sys_start_process(name: &str, entry: u32, speculative: bool, stack_size: usize) -> i32 {
    match crate::process::spawn_ex(name, entry, stack_size, speculative) {
        Ok(pid) => success_raw(pid as usize),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_exit(pid: Pid) -> i32 {
    match crate::process::exit(pid) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

/// Non-blocking: returns `Ok(Some(event))`, `Ok(None)` if the queue is
/// empty, or an error if `pid` doesn't exist.
pub fn sys_poll_event(pid: Pid) -> Result<Option<Event>, i32> {
    crate::process::poll_event(pid).map_err(|e| e.to_raw())
}

/// Blocks the *calling* process on its own queue until an event arrives.
/// Modelled as parking on `SIGNAL(pid)`, the same hook a producer resumes
/// after pushing (§5 "Suspension points").
pub fn sys_wait_event(pid: Pid) -> Result<Event, i32> {
    loop {
        match crate::process::poll_event(pid).map_err(|e| e.to_raw())? {
            Some(event) => return Ok(event),
            None => crate::process::yield_for_event(HookKind::Signal, pid),
        }
    }
}

pub fn sys_getpid() -> Option<Pid> {
    crate::process::current_pid()
}

pub fn sys_set_foreground(pid: Pid) -> i32 {
    match crate::process::set_foreground(pid) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_get_foreground() -> Option<Pid> {
    crate::process::foreground()
}

// ---- VFS -----------------------------------------------------------------

pub fn sys_open(path: &str) -> i32 {
    match VFS.lock().open(path) {
        Ok(handle) => success_raw(handle as usize),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_read(handle: usize, buf: &mut [u8]) -> i32 {
    match VFS.lock().read(handle, buf) {
        Ok(n) => success_raw(n),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_write(handle: usize, data: &[u8]) -> i32 {
    match VFS.lock().write(handle, data) {
        Ok(n) => success_raw(n),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_seek(handle: usize, position: usize) -> i32 {
    match VFS.lock().seek(handle, position) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_close(handle: usize) -> i32 {
    match VFS.lock().close(handle) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_create(path: &str) -> i32 {
    match VFS.lock().create(path) {
        Ok(inode) => success_raw(inode.id as usize),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_remove(path: &str) -> i32 {
    match VFS.lock().remove(path) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_mkdir(path: &str) -> i32 {
    match VFS.lock().mkdir(path) {
        Ok(inode) => success_raw(inode.id as usize),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_rmdir(path: &str) -> i32 {
    match VFS.lock().rmdir(path) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_readdir(path: &str) -> Result<Vec<Dirent>, i32> {
    VFS.lock().readdir(path).map_err(|e| e.to_raw())
}

pub fn sys_stat(path: &str) -> i32 {
    match VFS.lock().stat(path) {
        Ok(inode) => success_raw(inode.size),
        Err(e) => e.to_raw(),
    }
}

pub fn sys_normalize_path(path: &str) -> Result<String, i32> {
    let cwd = VFS.lock().getcwd();
    crate::fs::vfs::normalize_path(path, &cwd).map_err(|e| e.to_raw())
}

// ---- Graphics --------------------------------------------------------

pub fn sys_ensure_window(pid: Pid, title: &str) -> WindowId {
    COMPOSITOR.lock().ensure_window(pid, title)
}

pub fn sys_put_char(window: WindowId, col: usize, row: usize, ch: u8, attr: u8) -> i32 {
    match COMPOSITOR.lock().put_char(window, col, row, ch, attr) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_present(window: WindowId) -> i32 {
    let mut compositor = COMPOSITOR.lock();
    if let Err(e) = compositor.get_cursor(window) {
        return e.to_raw();
    }
    compositor.present();
    0
}

pub fn sys_set_cursor(window: WindowId, row: usize, col: usize, active: bool) -> i32 {
    match COMPOSITOR.lock().set_cursor(window, row, col, active) {
        Ok(()) => 0,
        Err(e) => e.to_raw(),
    }
}

pub fn sys_get_cursor(window: WindowId) -> Result<(usize, usize), i32> {
    COMPOSITOR.lock().get_cursor(window).map_err(|e| e.to_raw())
}

pub fn sys_columns() -> usize {
    COMPOSITOR.lock().columns()
}

pub fn sys_rows() -> usize {
    COMPOSITOR.lock().rows()
}

pub fn sys_framebuffer_available() -> bool {
    COMPOSITOR.lock().framebuffer_available()
}

// ---- GUI ---------------------------------------------------------------

pub fn sys_gui_command(kind: GuiCommandKind, arg0: i32, arg1: i32, pid: Pid) -> i32 {
    let mut compositor = COMPOSITOR.lock();
    match kind {
        GuiCommandKind::Redraw => {
            compositor.present();
            0
        }
        GuiCommandKind::SetTerminalOrigin => {
            let window = compositor.ensure_window(pid, "terminal");
            match compositor.set_cursor(window, arg1.max(0) as usize, arg0.max(0) as usize, true) {
                Ok(()) => 0,
                Err(e) => e.to_raw(),
            }
        }
        GuiCommandKind::RequestNewWindow => success_raw(compositor.ensure_window(pid, "window") as usize),
    }
}

// ---- PCI -----------------------------------------------------------------

pub fn sys_pci_register_listener(pid: Pid, vendor_id: u16, device_id: u16) {
    pci::register_listener(pid, vendor_id, device_id);
}

pub fn sys_pci_unregister_listener(pid: Pid) {
    pci::unregister_listener(pid);
}
