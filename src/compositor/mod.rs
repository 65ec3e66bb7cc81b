//! Window compositor: owns the framebuffer, the window list, Z-order,
//! hit-testing/dragging, and the software mouse cursor overlay (§4.7).

pub mod font;
pub mod framebuffer;
pub mod window;

use alloc::string::String;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::{
    BORDER_WIDTH, CLOSE_BUTTON_SIZE, CURSOR_SIZE, GLYPH_HEIGHT, GLYPH_WIDTH, SCREEN_HEIGHT, TITLE_BAR_HEIGHT,
    WINDOW_COLUMNS, WINDOW_ROWS,
};
use crate::error::{KernelError, KernelResult};
use crate::process::task::{Pid, WindowId};
use framebuffer::Framebuffer;
use window::Window;

/// Standard 16-color EGA/VGA text palette; cell attribute nibbles index
/// into this the same way the original's text-mode attribute byte did
/// (§4.7 "Rendering", `(bg<<4)|fg`).
const PALETTE: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0x00, 0x00, 0xAA),
    (0x00, 0xAA, 0x00),
    (0x00, 0xAA, 0xAA),
    (0xAA, 0x00, 0x00),
    (0xAA, 0x00, 0xAA),
    (0xAA, 0x55, 0x00),
    (0xAA, 0xAA, 0xAA),
    (0x55, 0x55, 0x55),
    (0x55, 0x55, 0xFF),
    (0x55, 0xFF, 0x55),
    (0x55, 0xFF, 0xFF),
    (0xFF, 0x55, 0x55),
    (0xFF, 0x55, 0xFF),
    (0xFF, 0xFF, 0x55),
    (0xFF, 0xFF, 0xFF),
];

/// Pixels stashed from under the software cursor so moving it doesn't
/// permanently overwrite whatever was drawn there (§4.7 "Mouse cursor").
struct CursorSave {
    x: i32,
    y: i32,
    pixels: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiCommandKind {
    Redraw,
    SetTerminalOrigin,
    RequestNewWindow,
}

struct Drag {
    window: WindowId,
    grab_dx: i32,
    grab_dy: i32,
}

pub struct Compositor {
    framebuffer: Framebuffer,
    windows: Vec<Window>,
    z_order: Vec<WindowId>,
    active: Option<WindowId>,
    next_id: WindowId,
    cursor_x: i32,
    cursor_y: i32,
    cursor_visible: bool,
    cursor_saved: Option<CursorSave>,
    drag: Option<Drag>,
}

impl Compositor {
    fn new() -> Self {
        Compositor {
            framebuffer: Framebuffer::empty(),
            windows: Vec::new(),
            z_order: Vec::new(),
            active: None,
            next_id: 1,
            cursor_x: 0,
            cursor_y: 0,
            cursor_visible: true,
            cursor_saved: None,
            drag: None,
        }
    }

    fn color(&self, index: u8) -> u32 {
        let (r, g, b) = PALETTE[(index & 0x0F) as usize];
        self.framebuffer.pack_color(r, g, b)
    }

    /// A vertical desktop gradient standing in for attribute color `0`
    /// (§4.7 "Rendering": "workspace gradient for bg 0"), rather than flat
    /// black.
    fn workspace_gradient_color(&self, y: i32) -> u32 {
        let height = SCREEN_HEIGHT.max(1);
        let t = y.clamp(0, height);
        let lerp = |top: i32, bottom: i32| -> u8 { (top + (bottom - top) * t / height) as u8 };
        let r = lerp(0x10, 0x00);
        let g = lerp(0x18, 0x00);
        let b = lerp(0x30, 0x08);
        self.framebuffer.pack_color(r, g, b)
    }

    pub fn init_framebuffer(&mut self, info: Option<framebuffer::FrameBufferInfo>) {
        let ok = info.map_or(false, |i| self.framebuffer.init_from_multiboot(i));
        if !ok {
            self.framebuffer.probe_bga(1024, 768, 0xE000_0000);
        }
    }

    pub fn framebuffer_available(&self) -> bool {
        self.framebuffer.is_available()
    }

    fn slot_of(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    /// Return the window owned by `pid`, creating a cascaded one if it
    /// doesn't exist yet.
    pub fn ensure_window(&mut self, pid: Pid, title: &str) -> WindowId {
        if let Some(w) = self.windows.iter().find(|w| w.owner == pid) {
            return w.id;
        }
        let id = self.next_id;
        self.next_id += 1;
        let cascade_index = self.windows.len() as i32;
        self.windows.push(Window::new(id, pid, String::from(title), cascade_index));
        self.z_order.push(id);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    pub fn close_window(&mut self, id: WindowId) {
        if let Some(slot) = self.slot_of(id) {
            self.windows.remove(slot);
        }
        self.z_order.retain(|w| *w != id);
        if self.active == Some(id) {
            self.active = self.z_order.last().copied();
        }
    }

    pub fn put_char(&mut self, id: WindowId, col: usize, row: usize, ch: u8, attr: u8) -> KernelResult<()> {
        let slot = self.slot_of(id).ok_or(KernelError::NotFound)?;
        self.windows[slot].put_char(col, row, ch, attr);
        Ok(())
    }

    pub fn set_cursor(&mut self, id: WindowId, row: usize, col: usize, active: bool) -> KernelResult<()> {
        let slot = self.slot_of(id).ok_or(KernelError::NotFound)?;
        self.windows[slot].set_cursor(row, col, active);
        Ok(())
    }

    pub fn get_cursor(&self, id: WindowId) -> KernelResult<(usize, usize)> {
        let slot = self.slot_of(id).ok_or(KernelError::NotFound)?;
        Ok(self.windows[slot].get_cursor())
    }

    pub fn write_text(&mut self, id: WindowId, text: &[u8]) -> KernelResult<()> {
        let slot = self.slot_of(id).ok_or(KernelError::NotFound)?;
        self.windows[slot].write_text(text);
        if self.active == Some(id) {
            self.present();
        }
        Ok(())
    }

    pub fn set_foreground_window(&mut self, id: WindowId) -> KernelResult<()> {
        self.slot_of(id).ok_or(KernelError::NotFound)?;
        self.z_order.retain(|w| *w != id);
        self.z_order.push(id);
        self.active = Some(id);
        Ok(())
    }

    /// Hit-test top-down through Z-order; returns the topmost window under
    /// the point, if any.
    pub fn window_at(&self, x: i32, y: i32) -> Option<WindowId> {
        self.z_order.iter().rev().copied().find(|id| {
            let slot = self.slot_of(*id).unwrap();
            self.windows[slot].hit_test(x, y, GLYPH_WIDTH, GLYPH_HEIGHT)
        })
    }

    /// The pid that owns the window under `(x, y)`, if any.
    pub fn owner_at(&self, x: i32, y: i32) -> Option<Pid> {
        let id = self.window_at(x, y)?;
        let slot = self.slot_of(id)?;
        Some(self.windows[slot].owner)
    }

    pub fn start_drag(&mut self, id: WindowId, pointer_x: i32, pointer_y: i32) {
        if let Some(slot) = self.slot_of(id) {
            let w = &self.windows[slot];
            self.drag = Some(Drag { window: id, grab_dx: pointer_x - w.x, grab_dy: pointer_y - w.y });
        }
    }

    /// Repaint the frame rectangle the window is about to vacate with the
    /// workspace background, otherwise the old frame trails behind as a
    /// visual artifact while dragging (§4.7 "Dragging").
    pub fn drag_to(&mut self, pointer_x: i32, pointer_y: i32) {
        let Some(drag) = &self.drag else { return };
        let (grab_dx, grab_dy) = (drag.grab_dx, drag.grab_dy);
        let window = drag.window;
        let Some(slot) = self.slot_of(window) else { return };

        let new_x = pointer_x - grab_dx;
        let new_y = pointer_y - grab_dy;
        let (old_x, old_y) = (self.windows[slot].x, self.windows[slot].y);
        if old_x == new_x && old_y == new_y {
            return;
        }

        let (frame_w, frame_h) = self.windows[slot].frame_size(GLYPH_WIDTH, GLYPH_HEIGHT);
        self.begin_window_redraw();
        self.paint_workspace_rect(old_x, old_y, frame_w, frame_h);

        self.windows[slot].x = new_x;
        self.windows[slot].y = new_y;
        self.windows[slot].mark_dirty();
        self.paint_window(slot);
        self.windows[slot].clear_dirty();
        self.end_window_redraw();
        self.framebuffer.present();
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Move the software cursor, restoring the pixels it was covering and
    /// re-saving/drawing it at the new spot (§4.7 "Mouse cursor").
    pub fn move_cursor(&mut self, x: i32, y: i32) {
        if self.cursor_x == x && self.cursor_y == y {
            return;
        }
        self.restore_cursor();
        self.cursor_x = x;
        self.cursor_y = y;
        if self.cursor_visible {
            self.draw_cursor();
            self.framebuffer.present();
        }
    }

    /// Hide the cursor overlay before a workspace redraw so stale saved
    /// pixels can't be blitted on top of the new content (§4.7 "Mouse
    /// cursor").
    pub fn begin_window_redraw(&mut self) {
        self.restore_cursor();
    }

    pub fn end_window_redraw(&mut self) {
        if self.cursor_visible {
            self.draw_cursor();
        }
    }

    fn draw_cursor(&mut self) {
        let size = CURSOR_SIZE;
        let mut pixels = Vec::with_capacity((size * size) as usize);
        for row in 0..size {
            for col in 0..size {
                pixels.push(self.framebuffer.peek_pixel((self.cursor_x + col) as u32, (self.cursor_y + row) as u32));
            }
        }
        self.cursor_saved = Some(CursorSave { x: self.cursor_x, y: self.cursor_y, pixels });
        let color = self.color(0x0F);
        self.framebuffer.fill_rect(self.cursor_x as u32, self.cursor_y as u32, size as u32, size as u32, color);
    }

    fn restore_cursor(&mut self) {
        let Some(saved) = self.cursor_saved.take() else { return };
        let size = CURSOR_SIZE;
        for row in 0..size {
            for col in 0..size {
                let color = saved.pixels[(row * size + col) as usize];
                self.framebuffer.write_pixel((saved.x + col) as u32, (saved.y + row) as u32, color);
            }
        }
    }

    /// Fill a rectangle of the desktop with the workspace background,
    /// a vertical gradient rather than flat fill (§4.7 "Rendering").
    fn paint_workspace_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        for row in 0..h {
            let color = self.workspace_gradient_color(y + row);
            self.framebuffer.fill_rect(x.max(0) as u32, (y + row).max(0) as u32, w.max(0) as u32, 1, color);
        }
    }

    /// Border, title bar, close button, and title text for one window.
    fn paint_chrome(&mut self, slot: usize) {
        let (x, y) = (self.windows[slot].x, self.windows[slot].y);
        let (frame_w, frame_h) = self.windows[slot].frame_size(GLYPH_WIDTH, GLYPH_HEIGHT);

        let border = self.color(0x07);
        self.framebuffer.fill_rect(x as u32, y as u32, frame_w as u32, BORDER_WIDTH as u32, border);
        self.framebuffer.fill_rect(x as u32, y as u32, BORDER_WIDTH as u32, frame_h as u32, border);
        self.framebuffer.fill_rect(x as u32, (y + frame_h - BORDER_WIDTH) as u32, frame_w as u32, BORDER_WIDTH as u32, border);
        self.framebuffer.fill_rect((x + frame_w - BORDER_WIDTH) as u32, y as u32, BORDER_WIDTH as u32, frame_h as u32, border);

        let title_bar = self.color(0x01);
        self.framebuffer.fill_rect(
            (x + BORDER_WIDTH) as u32,
            (y + BORDER_WIDTH) as u32,
            (frame_w - 2 * BORDER_WIDTH) as u32,
            TITLE_BAR_HEIGHT as u32,
            title_bar,
        );

        let close_button = self.color(0x04);
        let btn_x = x + frame_w - BORDER_WIDTH - CLOSE_BUTTON_SIZE - 4;
        let btn_y = y + BORDER_WIDTH + (TITLE_BAR_HEIGHT - CLOSE_BUTTON_SIZE) / 2;
        self.framebuffer.fill_rect(btn_x as u32, btn_y as u32, CLOSE_BUTTON_SIZE as u32, CLOSE_BUTTON_SIZE as u32, close_button);

        let text_fg = self.color(0x0F);
        let text_x = x + BORDER_WIDTH + 4;
        let text_y = y + BORDER_WIDTH + (TITLE_BAR_HEIGHT - GLYPH_HEIGHT) / 2;
        let title_bytes: Vec<u8> = self.windows[slot].title.as_bytes().to_vec();
        for (i, &byte) in title_bytes.iter().enumerate() {
            let glyph = font::glyph_for(byte);
            self.framebuffer.draw_mono_bitmap(
                (text_x + i as i32 * GLYPH_WIDTH) as u32,
                text_y as u32,
                GLYPH_WIDTH as u32,
                GLYPH_HEIGHT as u32,
                glyph,
                1,
                text_fg,
                title_bar,
                false,
            );
        }
    }

    /// Blit every dirty row's cells as glyphs into the framebuffer, per
    /// §4.7 "Rendering": 8x16 glyph per cell, `(bg<<4)|fg` attribute
    /// colors, unprintable characters rendered as `?`.
    fn blit_rows(&mut self, slot: usize) {
        let region = self.windows[slot].dirty_region();
        let (min_row, max_row) = if region.full { (0, WINDOW_ROWS - 1) } else { (region.min_row, region.max_row) };
        if min_row > max_row {
            return;
        }

        let (win_x, win_y) = (self.windows[slot].x, self.windows[slot].y);
        let content_x = win_x + BORDER_WIDTH;
        let content_y = win_y + BORDER_WIDTH + TITLE_BAR_HEIGHT;

        for row in min_row..=max_row {
            for col in 0..WINDOW_COLUMNS {
                let cell = self.windows[slot].cell(row, col);
                let fg_index = cell.attr & 0x0F;
                let bg_index = (cell.attr >> 4) & 0x0F;
                let px = content_x + col as i32 * GLYPH_WIDTH;
                let py = content_y + row as i32 * GLYPH_HEIGHT;

                let fg = self.color(fg_index);
                let bg = if bg_index == 0 { self.workspace_gradient_color(py) } else { self.color(bg_index) };
                let ch = if cell.ch.is_ascii_graphic() || cell.ch == b' ' { cell.ch } else { b'?' };
                let glyph = font::glyph_for(ch);

                self.framebuffer.draw_mono_bitmap(px as u32, py as u32, GLYPH_WIDTH as u32, GLYPH_HEIGHT as u32, glyph, 1, fg, bg, false);
            }
        }
    }

    fn paint_window(&mut self, slot: usize) {
        self.paint_chrome(slot);
        self.blit_rows(slot);
    }

    /// Repaint the active window's dirty rows, flip, then restore the
    /// cursor overlay. A no-op when nothing is dirty (§4.7, §8 property 9).
    pub fn present(&mut self) {
        let active = match self.active {
            Some(id) => id,
            None => return,
        };
        let slot = match self.slot_of(active) {
            Some(s) => s,
            None => return,
        };
        if !self.windows[slot].is_dirty() {
            return;
        }
        self.begin_window_redraw();
        self.paint_window(slot);
        self.windows[slot].clear_dirty();
        self.end_window_redraw();
        self.framebuffer.present();
    }

    pub fn columns(&self) -> usize {
        crate::config::WINDOW_COLUMNS
    }

    pub fn rows(&self) -> usize {
        crate::config::WINDOW_ROWS
    }
}

lazy_static! {
    pub static ref COMPOSITOR: Mutex<Compositor> = Mutex::new(Compositor::new());
}

pub fn init() {
    COMPOSITOR.lock().init_framebuffer(None);
    crate::log_info!(
        "Compositor initialized (framebuffer available: {}).",
        COMPOSITOR.lock().framebuffer_available()
    );
}
