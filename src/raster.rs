use std::f32::consts::TAU;

use crate::{
    color::Rgba,
    math::{vec2, Affine, Rect, Vec2f, Vec2i, Vec2u},
    surface::{PixelBuffer, Result, Surface, SurfaceError},
};

type Contour = Vec<Vec2f>;

pub struct Canvas {
    buffer: PixelBuffer,
    transform: Affine,
    saved: Vec<Affine>,
    detached: bool,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: PixelBuffer::new(width, height),
            transform: Affine::IDENTITY,
            saved: Vec::new(),
            detached: false,
        }
    }

    /// Drops the backing storage; every later operation fails with [`SurfaceError::Detached`].
    pub fn detach(&mut self) {
        log::debug!("detaching {}x{} canvas", self.buffer.width(), self.buffer.height());
        self.detached = true;
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.buffer.get(x, y)
    }

    pub fn saved_frames(&self) -> usize {
        self.saved.len()
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    fn check(&self) -> Result<()> {
        if self.detached {
            return Err(SurfaceError::Detached);
        }
        Ok(())
    }

    fn fill_shapes(&mut self, shapes: &[Vec<Contour>], color: Rgba) {
        let mut coverage = Coverage::new(self.buffer.width(), self.buffer.height());
        for shape in shapes {
            let device: Vec<Contour> = shape
                .iter()
                .map(|contour| contour.iter().map(|&p| self.transform.apply(p)).collect())
                .collect();
            coverage.mark(&device);
        }
        coverage.composite(&mut self.buffer, |dst| color.over(dst));
    }
}

impl Surface for Canvas {
    fn size(&self) -> Vec2u {
        self.buffer.size()
    }

    fn clear(&mut self) -> Result<()> {
        self.check()?;
        self.buffer.pixels_mut().fill(Rgba::TRANSPARENT);
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Vec2f], width: f32, color: Rgba) -> Result<()> {
        self.check()?;
        let half = width * 0.5;
        let mut shapes = Vec::with_capacity(points.len() * 2);
        for &p in points {
            shapes.push(vec![circle(p, half)]);
        }
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let dir = b - a;
            if dir.length() == 0.0 {
                continue;
            }
            let n = dir.normalize().perp() * half;
            shapes.push(vec![vec![a + n, b + n, b - n, a - n]]);
        }
        self.fill_shapes(&shapes, color);
        Ok(())
    }

    fn fill_circle(&mut self, center: Vec2f, radius: f32, color: Rgba) -> Result<()> {
        self.check()?;
        self.fill_shapes(&[vec![circle(center, radius)]], color);
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<()> {
        self.check()?;
        self.fill_shapes(&[vec![rect.corners().to_vec()]], color);
        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Rgba) -> Result<()> {
        self.check()?;
        let inner = rect.inset(width);
        let mut contours = vec![rect.corners().to_vec()];
        if inner.width() > 0.0 && inner.height() > 0.0 {
            contours.push(inner.corners().to_vec());
        }
        self.fill_shapes(&[contours], color);
        Ok(())
    }

    fn fill_ellipse(&mut self, bounds: Rect, color: Rgba) -> Result<()> {
        self.check()?;
        let b = bounds.normalized();
        self.fill_shapes(&[vec![ellipse(b.center(), b.size * 0.5)]], color);
        Ok(())
    }

    fn stroke_ellipse(&mut self, bounds: Rect, width: f32, color: Rgba) -> Result<()> {
        self.check()?;
        let b = bounds.normalized();
        let radii = b.size * 0.5;
        let inner = vec2(radii.x() - width, radii.y() - width);
        let mut contours = vec![ellipse(b.center(), radii)];
        if inner.x() > 0.0 && inner.y() > 0.0 {
            contours.push(ellipse(b.center(), inner));
        }
        self.fill_shapes(&[contours], color);
        Ok(())
    }

    fn fill_text(&mut self, text: &str, origin: Vec2f, size: f32, color: Rgba) -> Result<()> {
        self.check()?;
        // No font rasterizer here: each visible glyph is a solid block on the baseline, with a
        // fixed advance. Layout width still matches a monospace font of the same size.
        let advance = size * 0.6;
        let glyph = vec2(size * 0.45, size * 0.7);
        let mut pen = origin;
        let mut shapes = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                pen = vec2(origin.x(), pen.y() + size * 1.2);
                continue;
            }
            if !ch.is_whitespace() {
                let top_left = pen + vec2(size * 0.075, -glyph.y());
                shapes.push(vec![Rect::new(top_left, glyph).corners().to_vec()]);
            }
            pen += vec2(advance, 0.0);
        }
        self.fill_shapes(&shapes, color);
        Ok(())
    }

    fn draw_image(&mut self, image: &PixelBuffer, dest: Rect) -> Result<()> {
        self.check()?;
        if image.is_empty() || dest.size.x() == 0.0 || dest.size.y() == 0.0 {
            return Ok(());
        }
        let Some(inverse) = self.transform.inverse() else {
            return Ok(());
        };

        let corners = dest.corners().map(|p| self.transform.apply(p));
        let Some((x0, y0, x1, y1)) = device_bounds(&corners, self.buffer.size()) else {
            return Ok(());
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse.apply(vec2(x as f32 + 0.5, y as f32 + 0.5));
                let u = (local.x() - dest.origin.x()) / dest.size.x();
                let v = (local.y() - dest.origin.y()) / dest.size.y();
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let sx = ((u * image.width() as f32) as u32).min(image.width() - 1);
                let sy = ((v * image.height() as f32) as u32).min(image.height() - 1);
                if let (Some(src), Some(dst)) = (image.get(sx, sy), self.buffer.get(x, y)) {
                    self.buffer.set(x, y, src.over(dst));
                }
            }
        }
        Ok(())
    }

    fn erase_polygon(&mut self, points: &[Vec2f]) -> Result<()> {
        self.check()?;
        let device: Contour = points.iter().map(|&p| self.transform.apply(p)).collect();
        let mut coverage = Coverage::new(self.buffer.width(), self.buffer.height());
        coverage.mark(&[device]);
        coverage.composite(&mut self.buffer, |_| Rgba::TRANSPARENT);
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        self.check()?;
        self.saved.push(self.transform);
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.check()?;
        // Like a 2D canvas context, an unbalanced restore is ignored.
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
        Ok(())
    }

    fn translate(&mut self, offset: Vec2f) -> Result<()> {
        self.check()?;
        self.transform = self.transform.then(Affine::translation(offset));
        Ok(())
    }

    fn rotate(&mut self, angle: f32) -> Result<()> {
        self.check()?;
        self.transform = self.transform.then(Affine::rotation(angle));
        Ok(())
    }

    fn get_pixels(&self, origin: Vec2i, size: Vec2u) -> Result<PixelBuffer> {
        self.check()?;
        let surface = self.buffer.size();
        let outside = origin.x() >= surface.x() as i32
            || origin.y() >= surface.y() as i32
            || origin.x() + size.x() as i32 <= 0
            || origin.y() + size.y() as i32 <= 0;
        if size.x() == 0 || size.y() == 0 || outside {
            return Err(SurfaceError::OutOfBounds {
                origin,
                size,
                surface,
            });
        }

        // Pixels outside of the surface read as transparent.
        let mut out = PixelBuffer::new(size.x(), size.y());
        for y in 0..size.y() {
            for x in 0..size.x() {
                let (sx, sy) = (origin.x() + x as i32, origin.y() + y as i32);
                if sx < 0 || sy < 0 {
                    continue;
                }
                if let Some(p) = self.buffer.get(sx as u32, sy as u32) {
                    out.set(x, y, p);
                }
            }
        }
        Ok(out)
    }

    fn put_pixels(&mut self, buffer: &PixelBuffer, origin: Vec2i) -> Result<()> {
        self.check()?;
        for y in 0..buffer.height() {
            for x in 0..buffer.width() {
                let (dx, dy) = (origin.x() + x as i32, origin.y() + y as i32);
                if dx < 0 || dy < 0 {
                    continue;
                }
                if let Some(p) = buffer.get(x, y) {
                    self.buffer.set(dx as u32, dy as u32, p);
                }
            }
        }
        Ok(())
    }
}

fn arc_segments(radius: f32) -> usize {
    ((radius * 4.0).ceil() as usize).clamp(16, 256)
}

fn circle(center: Vec2f, radius: f32) -> Contour {
    ellipse(center, vec2(radius, radius))
}

fn ellipse(center: Vec2f, radii: Vec2f) -> Contour {
    let n = arc_segments(radii.x().max(radii.y()));
    (0..n)
        .map(|i| {
            let (sin, cos) = (i as f32 / n as f32 * TAU).sin_cos();
            center + vec2(radii.x() * cos, radii.y() * sin)
        })
        .collect()
}

fn device_bounds(points: &[Vec2f], size: Vec2u) -> Option<(u32, u32, u32, u32)> {
    let (mut min, mut max) = (vec2(f32::MAX, f32::MAX), vec2(f32::MIN, f32::MIN));
    for p in points {
        min = vec2(min.x().min(p.x()), min.y().min(p.y()));
        max = vec2(max.x().max(p.x()), max.y().max(p.y()));
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let x0 = min.x().floor().max(0.0) as u32;
    let y0 = min.y().floor().max(0.0) as u32;
    let x1 = (max.x().ceil().max(0.0) as u32).min(size.x());
    let y1 = (max.y().ceil().max(0.0) as u32).min(size.y());
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Per-pixel coverage mask, so overlapping parts of one primitive are only composited once.
struct Coverage {
    width: u32,
    height: u32,
    bits: Vec<bool>,
    rows: Option<(u32, u32)>,
}

impl Coverage {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
            rows: None,
        }
    }

    fn mark(&mut self, contours: &[Contour]) {
        let points: Vec<Vec2f> = contours.iter().flatten().copied().collect();
        let Some((_, y0, _, y1)) = device_bounds(&points, vec2(self.width, self.height)) else {
            return;
        };

        let mut crossings = Vec::new();
        for row in y0..y1 {
            let y = row as f32 + 0.5;
            crossings.clear();
            for contour in contours {
                for (i, &a) in contour.iter().enumerate() {
                    let b = contour[(i + 1) % contour.len()];
                    let (lo, hi) = if a.y() < b.y() { (a, b) } else { (b, a) };
                    if y < lo.y() || y >= hi.y() {
                        continue;
                    }
                    let t = (y - lo.y()) / (hi.y() - lo.y());
                    crossings.push(lo.x() + t * (hi.x() - lo.x()));
                }
            }
            crossings.sort_by(f32::total_cmp);

            for span in crossings.chunks_exact(2) {
                // Pixel `c` is covered when `span[0] <= c + 0.5 < span[1]`.
                let first = (span[0] - 0.5).ceil().max(0.0) as u32;
                let end = ((span[1] - 0.5).ceil().max(0.0) as u32).min(self.width);
                for col in first..end {
                    self.bits[row as usize * self.width as usize + col as usize] = true;
                }
                if first < end {
                    self.rows = Some(match self.rows {
                        Some((a, b)) => (a.min(row), b.max(row + 1)),
                        None => (row, row + 1),
                    });
                }
            }
        }
    }

    fn composite(&self, target: &mut PixelBuffer, mut paint: impl FnMut(Rgba) -> Rgba) {
        let Some((first, end)) = self.rows else { return };
        let width = self.width as usize;
        let pixels = target.pixels_mut();
        for row in first as usize..end as usize {
            for col in 0..width {
                let i = row * width + col;
                if self.bits[i] {
                    pixels[i] = paint(pixels[i]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn count(canvas: &Canvas, color: Rgba) -> usize {
        canvas.pixels().pixels().iter().filter(|p| **p == color).count()
    }

    #[test]
    fn fill_rect_covers_pixel_centers() {
        let mut c = Canvas::new(10, 10);
        c.fill_rect(Rect::new(vec2(1.0, 2.0), vec2(4.0, 3.0)), Rgba::BLACK)
            .unwrap();
        assert_eq!(count(&c, Rgba::BLACK), 12);
        assert_eq!(c.pixel(1, 2), Some(Rgba::BLACK));
        assert_eq!(c.pixel(4, 4), Some(Rgba::BLACK));
        assert_eq!(c.pixel(5, 4), Some(Rgba::TRANSPARENT));
        assert_eq!(c.pixel(1, 5), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn negative_size_rect_fills_same_area() {
        let mut a = Canvas::new(10, 10);
        let mut b = Canvas::new(10, 10);
        a.fill_rect(Rect::from_corners(vec2(1.0, 1.0), vec2(6.0, 5.0)), Rgba::BLACK)
            .unwrap();
        b.fill_rect(Rect::from_corners(vec2(6.0, 5.0), vec2(1.0, 1.0)), Rgba::BLACK)
            .unwrap();
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn stroke_rect_leaves_interior() {
        let mut c = Canvas::new(12, 12);
        c.stroke_rect(Rect::new(vec2(0.0, 0.0), vec2(10.0, 10.0)), 2.0, Rgba::BLACK)
            .unwrap();
        assert_eq!(c.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(c.pixel(1, 5), Some(Rgba::BLACK));
        assert_eq!(c.pixel(2, 5), Some(Rgba::TRANSPARENT));
        assert_eq!(c.pixel(5, 5), Some(Rgba::TRANSPARENT));
        assert_eq!(count(&c, Rgba::BLACK), 100 - 36);
    }

    #[test]
    fn translucent_polyline_blends_once() {
        let mut c = Canvas::new(20, 20);
        let color = Rgba::new(255, 0, 0, 128);
        c.stroke_polyline(&[vec2(2.0, 10.0), vec2(10.0, 10.0), vec2(10.0, 2.0)], 3.0, color)
            .unwrap();
        // Every covered pixel gets exactly the source color, even at the joint.
        assert_eq!(c.pixel(10, 10), Some(color));
        assert!(c
            .pixels()
            .pixels()
            .iter()
            .all(|p| *p == color || *p == Rgba::TRANSPARENT));
    }

    #[test]
    fn frame_stack() {
        let mut c = Canvas::new(10, 10);
        c.save().unwrap();
        c.translate(vec2(5.0, 5.0)).unwrap();
        c.rotate(FRAC_PI_2).unwrap();
        c.fill_rect(Rect::new(vec2(0.0, 0.0), vec2(3.0, 1.0)), Rgba::BLACK)
            .unwrap();
        c.restore().unwrap();
        assert_eq!(c.transform(), Affine::IDENTITY);
        assert_eq!(c.saved_frames(), 0);
        // The 3x1 bar was rotated to run downwards from (5, 5) and to the left by one pixel.
        assert_eq!(c.pixel(4, 5), Some(Rgba::BLACK));
        assert_eq!(c.pixel(4, 7), Some(Rgba::BLACK));
        assert_eq!(c.pixel(5, 5), Some(Rgba::TRANSPARENT));
        assert_eq!(count(&c, Rgba::BLACK), 3);
    }

    #[test]
    fn draw_image_scales_nearest() {
        let mut img = PixelBuffer::new(2, 1);
        img.set(0, 0, Rgba::BLACK);
        img.set(1, 0, Rgba::WHITE);
        let mut c = Canvas::new(8, 8);
        c.draw_image(&img, Rect::new(vec2(0.0, 0.0), vec2(4.0, 2.0)))
            .unwrap();
        assert_eq!(c.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(c.pixel(1, 1), Some(Rgba::BLACK));
        assert_eq!(c.pixel(2, 0), Some(Rgba::WHITE));
        assert_eq!(c.pixel(3, 1), Some(Rgba::WHITE));
        assert_eq!(c.pixel(4, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(c.pixel(0, 2), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn pixels_round_trip_and_clip() {
        let mut c = Canvas::new(4, 4);
        c.fill_rect(Rect::new(vec2(0.0, 0.0), vec2(2.0, 2.0)), Rgba::BLACK)
            .unwrap();
        let snap = c.get_pixels(vec2(-1, -1), vec2(3, 3)).unwrap();
        assert_eq!(snap.get(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(snap.get(1, 1), Some(Rgba::BLACK));

        c.clear().unwrap();
        c.put_pixels(&snap, vec2(-1, -1)).unwrap();
        assert_eq!(count(&c, Rgba::BLACK), 4);

        assert!(matches!(
            c.get_pixels(vec2(4, 0), vec2(1, 1)),
            Err(SurfaceError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn erase_polygon_clears_inside() {
        let mut c = Canvas::new(6, 6);
        c.fill_rect(Rect::new(vec2(0.0, 0.0), vec2(6.0, 6.0)), Rgba::BLACK)
            .unwrap();
        c.erase_polygon(&Rect::new(vec2(1.0, 1.0), vec2(2.0, 2.0)).corners())
            .unwrap();
        assert_eq!(count(&c, Rgba::TRANSPARENT), 4);
        assert_eq!(c.pixel(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn detached_canvas_rejects_everything() {
        let mut c = Canvas::new(4, 4);
        c.detach();
        assert!(matches!(c.clear(), Err(SurfaceError::Detached)));
        assert!(matches!(
            c.fill_circle(vec2(1.0, 1.0), 1.0, Rgba::BLACK),
            Err(SurfaceError::Detached)
        ));
        assert!(matches!(
            c.get_pixels(vec2(0, 0), vec2(1, 1)),
            Err(SurfaceError::Detached)
        ));
    }
}
