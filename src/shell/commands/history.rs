use crate::println;

pub fn run(_args: &str) {
    for (i, line) in crate::shell::state::HISTORY.lock().iter().enumerate() {
        println!("{:4}  {}", i + 1, line);
    }
}
