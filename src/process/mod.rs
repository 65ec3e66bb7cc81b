//! Preemptive, single-CPU, cooperative-when-gated process table (§4.1).
//!
//! A fixed `[Option<Process>; MAX_PROCESSES]` table, round-robin over the
//! processes that are both alive and not blocked behind a [`Hook`].
//! Scheduling is driven by the PIT timer ISR calling [`on_tick`] and,
//! voluntarily, by [`yield_now`]/[`yield_for_event`].

pub mod context;
pub mod event;
pub mod hooks;
pub mod task;

use alloc::string::String;

use crate::config::MAX_PROCESSES;
use crate::error::{KernelError, KernelResult};
use context::{switch_context, Context};
use event::Event;
use hooks::{Hook, HookKind};
use lazy_static::lazy_static;
use spin::Mutex;
use task::{Pid, Process};

pub struct Scheduler {
    processes: [Option<Process>; MAX_PROCESSES],
    current_slot: Option<usize>,
    foreground_pid: Option<Pid>,
    next_pid: Pid,
    tick: u64,
    idle: Context,
}

impl Scheduler {
    fn new() -> Self {
        Scheduler {
            processes: core::array::from_fn(|_| None),
            current_slot: None,
            foreground_pid: None,
            next_pid: 1,
            tick: 0,
            idle: Context { esp: 0 },
        }
    }

    fn slot_of(&self, pid: Pid) -> Option<usize> {
        self.processes.iter().position(|p| p.as_ref().map_or(false, |p| p.pid == pid))
    }

    pub fn add(&mut self, name: String, entry: u32, stack_size: usize) -> KernelResult<Pid> {
        self.add_ex(name, entry, stack_size, false)
    }

    pub fn add_ex(&mut self, name: String, entry: u32, stack_size: usize, speculative: bool) -> KernelResult<Pid> {
        let slot = self.processes.iter().position(|p| p.is_none()).ok_or(KernelError::NoSpace)?;
        let stack = alloc::vec![0u8; stack_size].into_boxed_slice();
        let pid = self.next_pid;
        self.next_pid = if self.next_pid == Pid::MAX { 1 } else { self.next_pid + 1 };
        let mut process = Process::new(pid, name, entry, stack);
        process.speculative = speculative;
        self.processes[slot] = Some(process);
        if self.current_slot.is_none() {
            self.current_slot = Some(slot);
            self.foreground_pid = Some(pid);
        }
        Ok(pid)
    }

    pub fn remove(&mut self, pid: Pid) -> KernelResult<()> {
        let slot = self.slot_of(pid).ok_or(KernelError::NotFound)?;
        self.processes[slot] = None;
        if self.current_slot == Some(slot) {
            self.current_slot = None;
        }
        if self.foreground_pid == Some(pid) {
            self.foreground_pid = None;
        }
        Ok(())
    }

    pub fn current(&self) -> Option<Pid> {
        self.current_slot.and_then(|s| self.processes[s].as_ref()).map(|p| p.pid)
    }

    /// First eligible slot strictly after `from`, wrapping at most once
    /// around the table (first-match-wins: no fairness weighting beyond
    /// round-robin order).
    fn next_eligible(&self, from: usize) -> Option<usize> {
        for offset in 1..=MAX_PROCESSES {
            let slot = (from + offset) % MAX_PROCESSES;
            if let Some(p) = &self.processes[slot] {
                if p.is_eligible() {
                    return Some(slot);
                }
            }
        }
        None
    }

    pub fn foreground(&self) -> Option<Pid> {
        self.foreground_pid
    }

    pub fn set_foreground(&mut self, pid: Pid) -> KernelResult<()> {
        self.slot_of(pid).ok_or(KernelError::NotFound)?;
        self.foreground_pid = Some(pid);
        Ok(())
    }

    pub fn deliver_to_foreground(&mut self, event: Event) {
        if let Some(pid) = self.foreground_pid {
            if let Some(slot) = self.slot_of(pid) {
                if let Some(p) = &mut self.processes[slot] {
                    p.events.push(event);
                }
            }
        }
    }

    pub fn deliver_to(&mut self, pid: Pid, event: Event) -> KernelResult<()> {
        let slot = self.slot_of(pid).ok_or(KernelError::NotFound)?;
        if let Some(p) = &mut self.processes[slot] {
            p.events.push(event);
        }
        Ok(())
    }

    pub fn poll_event(&mut self, pid: Pid) -> KernelResult<Option<Event>> {
        let slot = self.slot_of(pid).ok_or(KernelError::NotFound)?;
        Ok(self.processes[slot].as_mut().and_then(|p| p.events.pop()))
    }

    fn set_wait_hook(&mut self, slot: usize, hook: Hook) {
        if let Some(p) = &mut self.processes[slot] {
            p.wait_hook = Some(hook);
        }
    }

    /// Clear `wait_hook` on every process whose pending hook matches
    /// `(kind, value)`, making it eligible again. At most one hook is
    /// pending per process, so this never double-wakes.
    pub fn resume_for_event(&mut self, kind: HookKind, value: u32) {
        for p in self.processes.iter_mut().flatten() {
            if let Some(hook) = p.wait_hook {
                if hook.matches(kind, value) {
                    p.wait_hook = None;
                }
            }
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance the monotonic tick, wake anything waiting on that tick,
    /// and perform one round-robin switch. Called from the timer ISR.
    pub fn on_tick(&mut self) {
        self.tick += 1;
        let tick = self.tick as u32;
        self.resume_for_event(HookKind::TimeReached, tick);
        self.switch_to_next();
    }

    /// Voluntarily give up the remainder of this tick.
    pub fn yield_now(&mut self) {
        self.switch_to_next();
    }

    /// Block the current process behind `hook`, then give up the CPU.
    pub fn yield_for_event(&mut self, kind: HookKind, value: u32) {
        if let Some(slot) = self.current_slot {
            self.set_wait_hook(slot, Hook { kind, value });
        }
        self.switch_to_next();
    }

    /// Perform the actual register-state switch. Safe to call with no
    /// process runnable (falls back to the idle context, which just
    /// `hlt`s waiting for the next interrupt).
    fn switch_to_next(&mut self) {
        let from_slot = self.current_slot;
        let to_slot = from_slot.and_then(|s| self.next_eligible(s)).or_else(|| {
            (0..MAX_PROCESSES).find(|&s| self.processes[s].as_ref().map_or(false, |p| p.is_eligible()))
        });

        let from_ctx: *mut Context = match from_slot {
            Some(s) => &mut self.processes[s].as_mut().unwrap().context as *mut Context,
            None => &mut self.idle as *mut Context,
        };
        let to_ctx: *const Context = match to_slot {
            Some(s) => &self.processes[s].as_ref().unwrap().context as *const Context,
            None => &self.idle as *const Context,
        };

        self.current_slot = to_slot;
        if from_ctx as *const Context == to_ctx {
            return;
        }
        unsafe { switch_context(from_ctx, to_ctx) };
    }
}

lazy_static! {
    pub static ref SCHEDULER: Mutex<Scheduler> = Mutex::new(Scheduler::new());
}

pub fn init() {
    crate::log_info!("Process table initialized: {} slots.", MAX_PROCESSES);
}

pub fn spawn(name: &str, entry: u32, stack_size: usize) -> KernelResult<Pid> {
    SCHEDULER.lock().add(String::from(name), entry, stack_size)
}

pub fn spawn_ex(name: &str, entry: u32, stack_size: usize, speculative: bool) -> KernelResult<Pid> {
    SCHEDULER.lock().add_ex(String::from(name), entry, stack_size, speculative)
}

pub fn exit(pid: Pid) -> KernelResult<()> {
    SCHEDULER.lock().remove(pid)
}

pub fn poll_event(pid: Pid) -> KernelResult<Option<Event>> {
    SCHEDULER.lock().poll_event(pid)
}

pub fn foreground() -> Option<Pid> {
    SCHEDULER.lock().foreground()
}

pub fn current_pid() -> Option<Pid> {
    SCHEDULER.lock().current()
}

pub fn yield_now() {
    SCHEDULER.lock().yield_now();
}

pub fn yield_for_event(kind: HookKind, value: u32) {
    SCHEDULER.lock().yield_for_event(kind, value);
}

pub fn resume_for_event(kind: HookKind, value: u32) {
    SCHEDULER.lock().resume_for_event(kind, value);
}

pub fn set_foreground(pid: Pid) -> KernelResult<()> {
    SCHEDULER.lock().set_foreground(pid)
}

pub fn on_tick() {
    SCHEDULER.lock().on_tick();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Scheduler {
        Scheduler::new()
    }

    #[test]
    fn round_robin_skips_hooked_processes() {
        let mut s = table();
        let a = s.add(String::from("a"), 0x1000, 4096).unwrap();
        let b = s.add(String::from("b"), 0x2000, 4096).unwrap();
        let _c = s.add(String::from("c"), 0x3000, 4096).unwrap();

        let slot_b = s.slot_of(b).unwrap();
        s.set_wait_hook(slot_b, Hook::custom(1));

        let slot_a = s.slot_of(a).unwrap();
        let next = s.next_eligible(slot_a).unwrap();
        assert_ne!(next, slot_b, "hooked process must be skipped");
    }

    #[test]
    fn resume_for_event_clears_matching_hook_only() {
        let mut s = table();
        let a = s.add(String::from("a"), 0x1000, 4096).unwrap();
        let b = s.add(String::from("b"), 0x2000, 4096).unwrap();

        let slot_a = s.slot_of(a).unwrap();
        let slot_b = s.slot_of(b).unwrap();
        s.set_wait_hook(slot_a, Hook::time_reached(5));
        s.set_wait_hook(slot_b, Hook::signal(9));

        s.resume_for_event(HookKind::TimeReached, 5);
        assert!(s.processes[slot_a].as_ref().unwrap().wait_hook.is_none());
        assert!(s.processes[slot_b].as_ref().unwrap().wait_hook.is_some());
    }

    #[test]
    fn remove_frees_slot_for_reuse() {
        let mut s = table();
        let a = s.add(String::from("a"), 0x1000, 4096).unwrap();
        s.remove(a).unwrap();
        assert!(s.slot_of(a).is_none());
        let b = s.add(String::from("b"), 0x2000, 4096).unwrap();
        assert!(s.slot_of(b).is_some());
    }
}
