//! Central tunables. Kept in one place so the process table, VFS, and
//! compositor agree on the same fixed capacities instead of repeating
//! magic numbers at each call site.

/// Process table capacity (§3 Process).
pub const MAX_PROCESSES: usize = 32;

/// Default stack size handed to a spawned process when the caller doesn't
/// ask for a specific one.
pub const DEFAULT_STACK_SIZE: usize = 8192;

/// Capacity of a process's bounded input-event ring buffer.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Maximum simultaneous VFS mounts.
pub const MAX_MOUNTS: usize = 8;

/// Global open-file handle table size.
pub const MAX_OPEN_FILES: usize = 64;

/// Maximum normalised path length.
pub const MAX_PATH_LEN: usize = 256;

/// Maximum dirent name length.
pub const MAX_NAME_LEN: usize = 63;

/// PIT frequency driving the preemption tick.
pub const TIMER_HZ: u32 = 100;

/// PIT input clock frequency (divisor base).
pub const PIT_BASE_FREQUENCY: u32 = 1_193_180;

/// Shell history ring depth.
pub const SHELL_HISTORY_CAPACITY: usize = 16;

/// Editor line buffer dimensions.
pub const EDITOR_MAX_LINES: usize = 128;
pub const EDITOR_LINE_LENGTH: usize = 128;

/// Text-mode window grid.
pub const WINDOW_COLUMNS: usize = 80;
pub const WINDOW_ROWS: usize = 25;

/// Compositor chrome.
pub const TITLE_BAR_HEIGHT: i32 = 24;
pub const BORDER_WIDTH: i32 = 2;
pub const CLOSE_BUTTON_SIZE: i32 = 14;
pub const CASCADE_OFFSET: (i32, i32) = (28, 28);
pub const GLYPH_WIDTH: i32 = 8;
pub const GLYPH_HEIGHT: i32 = 16;

/// Software mouse cursor overlay footprint (§4.7 "Mouse cursor").
pub const CURSOR_SIZE: i32 = 8;

/// Maximum PCI devices cached by the enumerator.
pub const MAX_PCI_DEVICES: usize = 64;
pub const MAX_PCI_LISTENERS: usize = 16;

/// Screen bounds the mouse cursor is clamped to, derived from the text
/// grid dimensions (one glyph cell per character).
pub const SCREEN_WIDTH: i32 = WINDOW_COLUMNS as i32 * GLYPH_WIDTH;
pub const SCREEN_HEIGHT: i32 = WINDOW_ROWS as i32 * GLYPH_HEIGHT;
