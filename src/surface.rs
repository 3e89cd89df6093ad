use std::path::Path;

use crate::{
    color::Rgba,
    math::{vec2, Rect, Vec2f, Vec2i, Vec2u},
};

pub type Result<T, E = SurfaceError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The surface has lost its backing storage (eg. a detached rendering context).
    #[error("drawing surface is detached")]
    Detached,
    #[error("pixel region at {origin:?} with size {size:?} is outside of the {surface:?} surface")]
    OutOfBounds {
        origin: Vec2i,
        size: Vec2u,
        surface: Vec2u,
    },
}

pub trait Surface {
    fn size(&self) -> Vec2u;

    fn clear(&mut self) -> Result<()>;

    fn stroke_polyline(&mut self, points: &[Vec2f], width: f32, color: Rgba) -> Result<()>;

    fn fill_circle(&mut self, center: Vec2f, radius: f32, color: Rgba) -> Result<()>;

    fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<()>;

    /// Strokes the border of `rect`, `width` units wide, inside of its extent.
    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Rgba) -> Result<()>;

    fn fill_ellipse(&mut self, bounds: Rect, color: Rgba) -> Result<()>;

    fn stroke_ellipse(&mut self, bounds: Rect, width: f32, color: Rgba) -> Result<()>;

    fn fill_text(&mut self, text: &str, origin: Vec2f, size: f32, color: Rgba) -> Result<()>;

    fn draw_image(&mut self, image: &PixelBuffer, dest: Rect) -> Result<()>;

    fn erase_polygon(&mut self, points: &[Vec2f]) -> Result<()>;

    fn save(&mut self) -> Result<()>;

    fn restore(&mut self) -> Result<()>;

    fn translate(&mut self, offset: Vec2f) -> Result<()>;

    fn rotate(&mut self, angle: f32) -> Result<()>;

    /// Copies a rectangular region of pixels, ignoring the coordinate frame.
    fn get_pixels(&self, origin: Vec2i, size: Vec2u) -> Result<PixelBuffer>;

    /// Overwrites a rectangular region of pixels verbatim, ignoring the coordinate frame.
    fn put_pixels(&mut self, buffer: &PixelBuffer, origin: Vec2i) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        let image = image::open(path.as_ref())?.into_rgba8();
        let (width, height) = image.dimensions();
        let pixels = bytemuck::cast_slice::<u8, Rgba>(image.as_raw()).to_vec();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn save<A: AsRef<Path>>(&self, path: A) -> anyhow::Result<()> {
        image::save_buffer(
            path.as_ref(),
            self.as_bytes(),
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2u {
        vec2(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = color;
        }
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
