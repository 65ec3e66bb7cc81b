//! A single scheduled task: its identity, saved CPU state, private stack,
//! hook gate, and input event queue (§3 "Process").

use alloc::boxed::Box;
use alloc::string::String;

use super::context::Context;
use super::event::{Event, EventQueue};
use super::hooks::Hook;

pub type Pid = u32;

/// Handle into the (not yet built) compositor's window table.
pub type WindowId = u32;

pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub alive: bool,
    /// Spawned ahead of having real work queued — e.g. a freshly loaded
    /// ELF image waiting for its first scheduling slot. Speculative
    /// processes are eligible to run exactly like any other.
    pub speculative: bool,
    pub context: Context,
    pub stack: Box<[u8]>,
    pub ticks: u64,
    pub wait_hook: Option<Hook>,
    pub events: EventQueue,
    pub keyboard_handler: Option<fn(&mut Process, &Event)>,
    pub window: Option<WindowId>,
}

impl Process {
    pub fn new(pid: Pid, name: String, entry: u32, stack: Box<[u8]>) -> Self {
        let stack_top = stack.as_ptr() as u32 + stack.len() as u32;
        let stack_top = stack_top & !0xF; // 16-byte align the initial frame
        Process {
            pid,
            name,
            alive: true,
            speculative: false,
            context: Context::new(entry, stack_top),
            stack,
            ticks: 0,
            wait_hook: None,
            events: EventQueue::new(),
            keyboard_handler: None,
            window: None,
        }
    }

    /// A process is eligible to be scheduled when it's alive and either
    /// has no pending hook, or its hook has already been satisfied by
    /// `resume_for_event` (which clears `wait_hook`).
    pub fn is_eligible(&self) -> bool {
        self.alive && self.wait_hook.is_none()
    }
}
