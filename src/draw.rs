// ============================
// Framebuffer drawing helpers
// ============================

pub type Rgba = (u8, u8, u8, u8);

/// RGBA8 frame with clipping on every write.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self { frame, width, height }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, (r, g, b, a): Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&[r, g, b, a]);
        }
    }

    pub fn blend_pixel(&mut self, x: u32, y: u32, (r, g, b, a): Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        if idx + 3 >= self.frame.len() {
            return;
        }
        let ar = a as u16;
        let iar = (255 - a) as u16;
        let px = &mut self.frame[idx..idx + 4];
        px[0] = ((r as u16 * ar + px[0] as u16 * iar) / 255) as u8;
        px[1] = ((g as u16 * ar + px[1] as u16 * iar) / 255) as u8;
        px[2] = ((b as u16 * ar + px[2] as u16 * iar) / 255) as u8;
        px[3] = 255;
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        let x2 = (x + w).min(self.width);
        let y2 = (y + h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                self.blend_pixel(px, py, col);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, col: Rgba) {
        if w == 0 || h == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let x2 = (x + w - 1).min(self.width - 1);
        let y2 = (y + h - 1).min(self.height - 1);
        for px in x..=x2 {
            self.blend_pixel(px, y, col);
            self.blend_pixel(px, y2, col);
        }
        for py in y..=y2 {
            self.blend_pixel(x, py, col);
            self.blend_pixel(x2, py, col);
        }
    }

    /// Fills one board cell of `size` pixels, leaving a `gap` pixel border.
    pub fn fill_cell(&mut self, gx: u32, gy: u32, size: u32, gap: u32, col: Rgba) {
        let inner = size.saturating_sub(2 * gap);
        self.fill_rect(gx * size + gap, gy * size + gap, inner, inner, col);
    }

    /// Returns the x advance.
    pub fn draw_char(&mut self, ch: char, x: u32, y: u32, scale: u32, col: Rgba) -> u32 {
        if let Some(rows) = glyph_5x7(ch) {
            for (ry, row) in rows.iter().enumerate() {
                for rx in 0..5u32 {
                    if (row >> (4 - rx)) & 1 == 1 {
                        self.fill_rect(x + rx * scale, y + ry as u32 * scale, scale, scale, col);
                    }
                }
            }
        }
        6 * scale
    }

    pub fn draw_text(&mut self, text: &str, x: u32, y: u32, scale: u32, col: Rgba) {
        let mut cx = x;
        for ch in text.chars() {
            cx += self.draw_char(ch, cx, y, scale, col);
        }
    }

    /// Bar chart of the most recent values that fit in `w`.
    pub fn draw_chart(&mut self, x: u32, y: u32, w: u32, h: u32, data: &[u32]) {
        self.stroke_rect(x, y, w, h, (200, 200, 200, 120));
        let max_val = data.iter().copied().max().unwrap_or(0);
        if max_val == 0 || h < 3 {
            return;
        }
        let bars = data.len().min(w as usize / 6);
        if bars == 0 {
            return;
        }
        let bar_w = (w / bars as u32).max(2);
        for (i, &v) in data[data.len() - bars..].iter().enumerate() {
            let bh = v * (h - 2) / max_val;
            let bx = x + 1 + i as u32 * bar_w;
            let by = y + h - 1 - bh;
            self.fill_rect(bx, by, bar_w - 1, bh, (120, 180, 255, 160));
        }
    }
}

pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * 6 * scale
}

fn glyph_5x7(ch: char) -> Option<[u8; 7]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b11110, 0b10001, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001, 0b10001],
        'I' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '+' => [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        ' ' => [0; 7],
        _ => return None,
    })
}
