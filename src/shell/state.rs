use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::SHELL_HISTORY_CAPACITY;

lazy_static! {
    /// Bounded ring of past command lines, most recent last.
    pub static ref HISTORY: Mutex<Vec<String>> = Mutex::new(Vec::new());
}

pub fn push_history(line: &str) {
    let mut history = HISTORY.lock();
    if history.len() >= SHELL_HISTORY_CAPACITY {
        history.remove(0);
    }
    history.push(String::from(line));
}
