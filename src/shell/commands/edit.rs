use crate::println;

pub fn run(args: &str) {
    let path = args.trim();
    if path.is_empty() {
        println!("edit: missing filename");
        return;
    }
    let Some(pid) = crate::process::current_pid() else {
        println!("edit: no current process");
        return;
    };
    crate::editor::run(pid, path);
}
