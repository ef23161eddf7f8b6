/// Half-block terminal presentation of RGBA framebuffers
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use uvedit_core::Framebuffer;

const DIVIDER: [u8; 4] = [70, 70, 80, 255];

/// Presents two framebuffers side by side, one terminal cell per 1x2 pixel
/// column pair: the upper-half-block glyph carries the top pixel in its
/// foreground and the bottom pixel in its background.
///
/// The whole frame is queued and flushed once; nothing draws cell by cell
/// outside this pass.
pub struct HalfBlockSurface;

impl HalfBlockSurface {
    pub fn new() -> Self {
        Self
    }

    pub fn present<W: Write>(
        &self,
        out: &mut W,
        left: &Framebuffer,
        right: &Framebuffer,
    ) -> std::io::Result<()> {
        let rows = left.height().max(right.height()) / 2;
        let mut last_fg: Option<[u8; 4]> = None;
        let mut last_bg: Option<[u8; 4]> = None;

        for row in 0..rows {
            out.queue(cursor::MoveTo(0, row as u16))?;
            self.present_row(out, left, row, &mut last_fg, &mut last_bg)?;
            set_colors(out, DIVIDER, DIVIDER, &mut last_fg, &mut last_bg)?;
            out.queue(Print('▀'))?;
            self.present_row(out, right, row, &mut last_fg, &mut last_bg)?;
        }
        out.queue(ResetColor)?;
        out.flush()
    }

    fn present_row<W: Write>(
        &self,
        out: &mut W,
        fb: &Framebuffer,
        row: usize,
        last_fg: &mut Option<[u8; 4]>,
        last_bg: &mut Option<[u8; 4]>,
    ) -> std::io::Result<()> {
        let top_y = row * 2;
        let bottom_y = top_y + 1;
        let data = fb.data();
        for x in 0..fb.width() {
            let top = pixel_at(fb, data, x, top_y);
            let bottom = pixel_at(fb, data, x, bottom_y);
            set_colors(out, top, bottom, last_fg, last_bg)?;
            out.queue(Print('▀'))?;
        }
        Ok(())
    }
}

impl Default for HalfBlockSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn pixel_at(fb: &Framebuffer, data: &[[u8; 4]], x: usize, y: usize) -> [u8; 4] {
    if y < fb.height() {
        data[y * fb.width() + x]
    } else {
        [0, 0, 0, 255]
    }
}

/// Only emit color escapes when the color actually changes; long runs of one
/// color dominate both views.
fn set_colors<W: Write>(
    out: &mut W,
    fg: [u8; 4],
    bg: [u8; 4],
    last_fg: &mut Option<[u8; 4]>,
    last_bg: &mut Option<[u8; 4]>,
) -> std::io::Result<()> {
    if *last_fg != Some(fg) {
        out.queue(SetForegroundColor(Color::Rgb {
            r: fg[0],
            g: fg[1],
            b: fg[2],
        }))?;
        *last_fg = Some(fg);
    }
    if *last_bg != Some(bg) {
        out.queue(SetBackgroundColor(Color::Rgb {
            r: bg[0],
            g: bg[1],
            b: bg[2],
        }))?;
        *last_bg = Some(bg);
    }
    Ok(())
}
