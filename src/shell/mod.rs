//! The command-line shell (§4.9). Runs as an ordinary process: it reads
//! keyboard events off its own queue, echoes them, and dispatches
//! complete lines to the command table below.

pub mod commands;
pub mod state;

use alloc::string::String;

use crate::println;
use crate::process::event::Event;
use crate::process::hooks::HookKind;
use crate::process::task::Pid;

/// Parse input line into command + arguments, then dispatch.
pub fn exec_command(input: &str) {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return;
    }
    state::push_history(trimmed);

    let mut parts = trimmed.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("");

    match cmd {
        "help" => commands::help::run(args),
        "ls" => commands::ls::run(args),
        "cd" => commands::cd::run(args),
        "cat" => commands::cat::run(args),
        "touch" => commands::touch::run(args),
        "mkdir" => commands::mkdir::run(args),
        "rm" => commands::rm::run(args),
        "rmdir" => commands::rmdir::run(args),
        "echo" => commands::echo::run(args),
        "pwd" => commands::pwd::run(args),
        "uptime" => commands::uptime::run(args),
        "history" => commands::history::run(args),
        "edit" => commands::edit::run(args),
        "lsblk" => commands::lsblk::run(args),
        "disktest" => commands::disktest::run(args),
        "mount" => commands::mount::run(args),
        "umount" => commands::umount::run(args),
        "fsinfo" => commands::fsinfo::run(args),
        "meminfo" => commands::meminfo::run(args),
        "free" => commands::free::run(args),
        "lspci" => commands::lspci::run(args),
        _ => println!("{}: command not found", cmd),
    }
}

fn prompt() {
    println!();
    crate::print!("{} $ ", crate::fs::VFS.lock().getcwd());
}

/// Process entry point: `process::spawn`'s `entry` for the shell. Takes
/// the foreground seat, then loops reading its own event queue.
pub extern "C" fn shell_entry() -> ! {
    let pid = crate::process::current_pid().unwrap_or(0);
    let _ = crate::process::set_foreground(pid);
    println!("ContinuumOS shell ready.");
    prompt();

    let mut line = String::new();
    loop {
        let event = match crate::process::poll_event(pid) {
            Ok(Some(e)) => e,
            Ok(None) => {
                crate::process::yield_for_event(HookKind::Signal, pid);
                continue;
            }
            Err(_) => {
                crate::process::yield_now();
                continue;
            }
        };

        let Event::Keyboard { released: false, scancode, ascii, .. } = event else { continue };

        match scancode {
            0x1C => {
                crate::print!("\n");
                exec_command(&line);
                line.clear();
                prompt();
            }
            0x0E => {
                if line.pop().is_some() {
                    crate::print!("\x08 \x08");
                }
            }
            _ => {
                if let Some(ascii) = ascii {
                    if ascii.is_ascii_graphic() || ascii == b' ' {
                        line.push(ascii as char);
                        crate::print!("{}", ascii as char);
                    }
                }
            }
        }
    }
}
