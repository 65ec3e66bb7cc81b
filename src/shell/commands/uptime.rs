use crate::config::TIMER_HZ;
use crate::println;

pub fn run(_args: &str) {
    let ticks = crate::process::SCHEDULER.lock().tick_count();
    let total_secs = ticks / TIMER_HZ as u64;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    println!("up {:02}:{:02}:{:02} ({} ticks)", hours, mins, secs, ticks);
}
