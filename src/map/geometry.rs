use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    trace_line(x0, y0, x1, y1, |x, y| canvas.set_pixel_signed(x, y));
}

/// Walk the Bresenham pixels from (x0, y0) to (x1, y1), endpoints included
pub fn trace_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a thicker line (heavy strokes and highlights)
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y1);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1);
}

/// On/off pixel run lengths carried across the segments of one path
#[derive(Clone, Copy, Debug)]
pub struct Dash {
    on: u32,
    off: u32,
    step: u32,
}

impl Dash {
    pub fn new(on: u32, off: u32) -> Self {
        Self { on: on.max(1), off, step: 0 }
    }

    /// Parse an SVG-style dash array (`"10, 5"`). Lengths are halved to
    /// suit Braille pixel density.
    pub fn parse(pattern: &str) -> Option<Self> {
        let mut parts = pattern
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().parse::<f64>());
        let on = parts.next()?.ok()?;
        let off = parts.next().and_then(Result::ok).unwrap_or(on);
        Some(Self::new((on / 2.0).round() as u32, (off / 2.0).round() as u32))
    }

    fn advance(&mut self) -> bool {
        let drawn = self.step < self.on;
        self.step = (self.step + 1) % (self.on + self.off);
        drawn
    }
}

/// Draw a dashed line, continuing the dash phase from earlier segments
pub fn draw_dashed_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, dash: &mut Dash) {
    trace_line(x0, y0, x1, y1, |x, y| {
        if dash.advance() {
            canvas.set_pixel_signed(x, y);
        }
    });
}

/// Draw a point marker (small cross)
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Draw a filled circle (point features)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Stipple the inside of a projected ring with dots every `spacing` pixels.
/// Scanlines are limited to the canvas.
pub fn stipple_ring(canvas: &mut BrailleCanvas, ring: &[(i32, i32)], spacing: i32) {
    if ring.len() < 3 || spacing < 1 {
        return;
    }
    let (width, height) = canvas.pixel_size();
    let min_y = ring.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = ring.iter().map(|p| p.1).max().unwrap_or(0).min(height as i32 - 1);

    let mut crossings = Vec::new();
    let mut y = min_y - min_y.rem_euclid(spacing);
    while y <= max_y {
        crossings.clear();
        let fy = f64::from(y) + 0.5;
        let mut prev = ring[ring.len() - 1];
        for &curr in ring {
            let (y0, y1) = (f64::from(prev.1), f64::from(curr.1));
            if (y0 > fy) != (y1 > fy) {
                let t = (fy - y0) / (y1 - y0);
                crossings.push(f64::from(prev.0) + t * f64::from(curr.0 - prev.0));
            }
            prev = curr;
        }
        crossings.sort_by(f64::total_cmp);

        // Offset alternate rows for a checkerboard
        let phase = if (y / spacing) % 2 == 0 { 0 } else { spacing / 2 };
        for pair in crossings.chunks_exact(2) {
            let start = (pair[0].ceil() as i32).max(0);
            let end = (pair[1].floor() as i32).min(width as i32 - 1);
            let mut x = start - start.rem_euclid(spacing) + phase;
            while x <= end {
                if x >= start {
                    canvas.set_pixel_signed(x, y);
                }
                x += spacing;
            }
        }
        y += spacing;
    }
}
