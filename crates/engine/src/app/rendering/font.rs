//! 3x5 bitmap font and the raw RGBA drawing primitives the renderer builds on.

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 2;
pub(crate) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub(crate) const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;

// One entry per printable ASCII char starting at ' '. Each octal digit is a glyph row,
// top to bottom, with the high bit as the leftmost column.
const GLYPHS: [u16; 95] = [
    0o00000, 0o22202, 0o55000, 0o57575, 0o76737, 0o51245, 0o25253, 0o22000,
    0o12221, 0o42224, 0o05250, 0o02720, 0o00024, 0o00700, 0o00002, 0o11244,
    0o75557, 0o26227, 0o71747, 0o71717, 0o55711, 0o74717, 0o74757, 0o71222,
    0o75757, 0o75717, 0o02020, 0o02024, 0o12421, 0o07070, 0o42124, 0o71302,
    0o75747, 0o25755, 0o65656, 0o74447, 0o65556, 0o74647, 0o74644, 0o74557,
    0o55755, 0o72227, 0o71157, 0o55655, 0o44447, 0o57755, 0o57775, 0o75557,
    0o65644, 0o75571, 0o65655, 0o74717, 0o72222, 0o55557, 0o55552, 0o55775,
    0o55255, 0o55222, 0o71247, 0o64446, 0o44211, 0o31113, 0o25000, 0o00007,
    0o42000, 0o07177, 0o44656, 0o07447, 0o11757, 0o07647, 0o34644, 0o07571,
    0o44655, 0o20222, 0o10152, 0o45655, 0o44447, 0o06755, 0o06555, 0o07557,
    0o06564, 0o07571, 0o06544, 0o07617, 0o27223, 0o05557, 0o05552, 0o05572,
    0o05225, 0o05571, 0o07127, 0o32623, 0o22222, 0o62326, 0o03600,
];

const FALLBACK_CHAR: char = '?';

pub(crate) fn glyph_bits(ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        GLYPHS[(code - 0x20) as usize]
    } else {
        GLYPHS[(FALLBACK_CHAR as u32 - 0x20) as usize]
    }
}

pub(crate) fn glyph_pixel(bits: u16, row: i32, col: i32) -> bool {
    let row_bits = (bits >> ((GLYPH_HEIGHT - 1 - row) * 3)) & 0o7;
    row_bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0
}

pub(crate) fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

/// Raw RGBA frame with clipped drawing helpers.
pub(crate) struct Canvas<'a> {
    pub frame: &'a mut [u8],
    pub width: u32,
    pub height: u32,
}

impl Canvas<'_> {
    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Writes one pixel, alpha-blending over what is already there. Out of bounds is a no-op.
    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let Some(offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
            .and_then(|pixel| pixel.checked_mul(4))
        else {
            return;
        };
        let Some(dst) = self.frame.get_mut(offset..offset + 4) else {
            return;
        };
        let alpha = color[3] as u32;
        if alpha == 255 {
            dst.copy_from_slice(&color);
            return;
        }
        for channel in 0..3 {
            let src = color[channel] as u32;
            let old = dst[channel] as u32;
            dst[channel] = ((src * alpha + old * (255 - alpha)) / 255) as u8;
        }
        dst[3] = 255;
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = (x + w).min(self.width as i32);
        let end_y = (y + h).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn outline_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        if w <= 1 || h <= 1 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    pub(crate) fn line(&mut self, from: (i32, i32), to: (i32, i32), color: [u8; 4]) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        // Bounded so a wild projection can never stall a frame.
        let max_steps = (dx - dy).min(8192);
        for _ in 0..=max_steps {
            self.blend_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    pub(crate) fn disc(&mut self, center: (i32, i32), radius: i32, color: [u8; 4]) {
        let radius = radius.clamp(0, 512);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.blend_pixel(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    pub(crate) fn text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        let mut cursor = x;
        for ch in text.chars() {
            let bits = glyph_bits(ch);
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if glyph_pixel(bits, row, col) {
                        self.fill_rect(
                            cursor + col * TEXT_SCALE,
                            y + row * TEXT_SCALE,
                            TEXT_SCALE,
                            TEXT_SCALE,
                            color,
                        );
                    }
                }
            }
            cursor += GLYPH_ADVANCE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(frame: &[u8]) -> usize {
        frame
            .chunks_exact(4)
            .filter(|pixel| pixel[0] != 0 || pixel[1] != 0 || pixel[2] != 0)
            .count()
    }

    #[test]
    fn space_is_blank_and_letters_are_not() {
        assert_eq!(glyph_bits(' '), 0);
        for ch in ('A'..='Z').chain('a'..='z').chain('0'..='9') {
            assert_ne!(glyph_bits(ch), 0, "glyph for {ch:?} is blank");
        }
    }

    #[test]
    fn non_ascii_falls_back_to_question_mark() {
        assert_eq!(glyph_bits('é'), glyph_bits('?'));
        assert_eq!(glyph_bits('\n'), glyph_bits('?'));
    }

    #[test]
    fn glyph_rows_read_top_to_bottom() {
        // 'T': full top row, then the center column.
        let bits = glyph_bits('T');
        assert!(glyph_pixel(bits, 0, 0) && glyph_pixel(bits, 0, 2));
        assert!(glyph_pixel(bits, 4, 1));
        assert!(!glyph_pixel(bits, 4, 0));
    }

    #[test]
    fn drawing_off_canvas_never_panics() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 4,
            height: 4,
        };
        canvas.text(-20, -20, "hello", [255; 4]);
        canvas.text(3, 3, "hello", [255; 4]);
        canvas.line((-100, -100), (100, 100), [255; 4]);
        canvas.disc((2, 2), 10, [255; 4]);
        canvas.fill_rect(10, 10, 5, 5, [255; 4]);
        assert!(lit_pixels(&frame) > 0);
    }

    #[test]
    fn zero_sized_canvas_is_safe() {
        let mut frame = Vec::new();
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 0,
            height: 0,
        };
        canvas.clear([1, 2, 3, 255]);
        canvas.text(0, 0, "x", [255; 4]);
        canvas.line((0, 0), (5, 5), [255; 4]);
    }

    #[test]
    fn half_alpha_blends_toward_color() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 1,
            height: 1,
        };
        canvas.blend_pixel(0, 0, [255, 255, 255, 128]);
        assert_eq!(frame[0], 128);
        assert_eq!(frame[3], 255);
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut frame = vec![0u8; 10 * 10 * 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 10,
            height: 10,
        };
        canvas.line((1, 1), (8, 5), [255; 4]);
        let at = |x: usize, y: usize| frame[(y * 10 + x) * 4];
        assert_eq!(at(1, 1), 255);
        assert_eq!(at(8, 5), 255);
    }
}
