//! Line editor (§4.9 "edit"). A fixed-capacity line buffer with cursor
//! navigation and two sentinel commands (`.save`, `.exit`), grounded on
//! the original `Editor` class's `buffer`/`handle_enter`/`handle_arrows`
//! shape but re-expressed against the VFS and the event queue instead of
//! direct VGA writes.

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::{EDITOR_LINE_LENGTH, EDITOR_MAX_LINES};
use crate::println;
use crate::process::event::Event;
use crate::process::hooks::HookKind;
use crate::process::task::Pid;

pub struct EditorBuffer {
    lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    dirty: bool,
}

impl EditorBuffer {
    pub fn new() -> Self {
        EditorBuffer { lines: alloc::vec![String::new()], cursor_line: 0, cursor_col: 0, dirty: false }
    }

    /// Split file contents into lines, truncating past `EDITOR_MAX_LINES`
    /// and clamping each line to `EDITOR_LINE_LENGTH`.
    pub fn load(contents: &[u8]) -> Self {
        let text = core::str::from_utf8(contents).unwrap_or("");
        let mut lines: Vec<String> = text
            .split('\n')
            .take(EDITOR_MAX_LINES)
            .map(|l| {
                let mut s = String::from(l);
                s.truncate(EDITOR_LINE_LENGTH - 1);
                s
            })
            .collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        EditorBuffer { lines, cursor_line: 0, cursor_col: 0, dirty: false }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, idx: usize) -> &str {
        &self.lines[idx]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Joined with `\n`, terminated by a trailing newline — the format
    /// `.save` writes back to the VFS.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out
    }

    pub fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.cursor_line];
        if line.len() >= EDITOR_LINE_LENGTH - 1 {
            return;
        }
        let byte_idx = char_byte_index(line, self.cursor_col);
        line.insert(byte_idx, c);
        self.cursor_col += 1;
        self.dirty = true;
    }

    pub fn backspace(&mut self) {
        if self.cursor_col > 0 {
            let line = &mut self.lines[self.cursor_line];
            let byte_idx = char_byte_index(line, self.cursor_col - 1);
            line.remove(byte_idx);
            self.cursor_col -= 1;
            self.dirty = true;
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            let prev_len = self.lines[self.cursor_line].chars().count();
            self.lines[self.cursor_line].push_str(&current);
            self.cursor_col = prev_len;
            self.dirty = true;
        }
    }

    /// Split the current line at the cursor. Returns the sentinel command
    /// (`.save`/`.exit`) if the *whole* current line equals one, without
    /// mutating the buffer further — matching the original's check before
    /// splitting.
    pub fn enter(&mut self) -> Option<&'static str> {
        let current = self.lines[self.cursor_line].trim();
        if current == ".save" {
            return Some(".save");
        }
        if current == ".exit" {
            return Some(".exit");
        }
        if self.lines.len() >= EDITOR_MAX_LINES {
            return None;
        }
        let line = &mut self.lines[self.cursor_line];
        let byte_idx = char_byte_index(line, self.cursor_col);
        let right = line.split_off(byte_idx);
        self.lines.insert(self.cursor_line + 1, right);
        self.cursor_line += 1;
        self.cursor_col = 0;
        self.dirty = true;
        None
    }

    pub fn move_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.clamp_col();
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.lines[self.cursor_line].chars().count();
        }
    }

    pub fn move_right(&mut self) {
        let len = self.lines[self.cursor_line].chars().count();
        if self.cursor_col < len {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    fn clamp_col(&mut self) {
        let len = self.lines[self.cursor_line].chars().count();
        if self.cursor_col > len {
            self.cursor_col = len;
        }
    }
}

fn char_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map(|(i, _)| i).unwrap_or(s.len())
}

const KEY_UP: u8 = 0x48;
const KEY_DOWN: u8 = 0x50;
const KEY_LEFT: u8 = 0x4B;
const KEY_RIGHT: u8 = 0x4D;

/// Runs the editor loop for the calling process: loads `path` (creating
/// it if absent), services keyboard events from its own queue, and
/// writes back to the VFS on `.save`.
pub fn run(pid: Pid, path: &str) {
    let mut vfs = crate::fs::VFS.lock();
    let mut buffer = match vfs.read_file(path) {
        Ok(bytes) => EditorBuffer::load(&bytes),
        Err(_) => {
            let _ = vfs.create(path);
            EditorBuffer::new()
        }
    };
    drop(vfs);

    println!("-- editing {} (.save / .exit on their own line) --", path);
    loop {
        let event = match crate::process::poll_event(pid) {
            Ok(Some(e)) => e,
            Ok(None) => {
                crate::process::yield_for_event(HookKind::Signal, pid);
                continue;
            }
            Err(_) => break,
        };
        let Event::Keyboard { released: false, scancode, ascii, .. } = event else { continue };

        match scancode {
            KEY_UP => buffer.move_up(),
            KEY_DOWN => buffer.move_down(),
            KEY_LEFT => buffer.move_left(),
            KEY_RIGHT => buffer.move_right(),
            0x1C => {
                if let Some(cmd) = buffer.enter() {
                    if cmd == ".save" {
                        let data = buffer.serialize();
                        let mut vfs = crate::fs::VFS.lock();
                        let _ = vfs.remove(path);
                        let _ = vfs.create(path);
                        let _ = vfs.write_file(path, &data);
                        println!("File '{}' saved.", path);
                    } else {
                        println!("Edit aborted.");
                    }
                    break;
                }
            }
            0x0E => buffer.backspace(),
            _ => {
                if let Some(ascii) = ascii {
                    if ascii.is_ascii_graphic() || ascii == b' ' {
                        buffer.insert_char(ascii as char);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_backspace_roundtrip() {
        let mut b = EditorBuffer::new();
        b.insert_char('h');
        b.insert_char('i');
        assert_eq!(b.line(0), "hi");
        b.backspace();
        assert_eq!(b.line(0), "h");
    }

    #[test]
    fn enter_splits_line_at_cursor() {
        let mut b = EditorBuffer::new();
        for c in "hello".chars() {
            b.insert_char(c);
        }
        b.cursor_col = 2;
        assert!(b.enter().is_none());
        assert_eq!(b.line(0), "he");
        assert_eq!(b.line(1), "llo");
        assert_eq!(b.cursor_line, 1);
        assert_eq!(b.cursor_col, 0);
    }

    #[test]
    fn save_sentinel_detected_without_mutating() {
        let mut b = EditorBuffer::new();
        for c in ".save".chars() {
            b.insert_char(c);
        }
        assert_eq!(b.enter(), Some(".save"));
        assert_eq!(b.line_count(), 1);
    }

    #[test]
    fn backspace_at_line_start_joins_previous_line() {
        let mut b = EditorBuffer::new();
        for c in "ab".chars() {
            b.insert_char(c);
        }
        b.cursor_col = 2;
        b.enter();
        for c in "cd".chars() {
            b.insert_char(c);
        }
        b.cursor_col = 0;
        b.backspace();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0), "abcd");
    }
}
