use std::sync::Arc;

use crate::{
    color::{ColorError, Rgba},
    geometry::{bounding_box, point_in_polygon, polyline_self_intersects},
    math::{vec2, Rect, Vec2f},
    style::{FillMode, RenderPolicy, Style},
    surface::{PixelBuffer, Surface, SurfaceError},
};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{tool} needs at least {needed} points, got {got}")]
    TooFewPoints {
        tool: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("{tool}: {what} is not a finite number")]
    NotFinite {
        tool: &'static str,
        what: &'static str,
    },
    #[error("{tool}: {what} must be positive (got {value})")]
    NotPositive {
        tool: &'static str,
        what: &'static str,
        value: f32,
    },
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error("text is empty")]
    EmptyText,
    #[error("stamp image has no pixels")]
    EmptyImage,
    #[error("lasso path crosses itself")]
    SelfIntersectingLasso,
    #[error("could not capture the selected pixels")]
    Capture(#[from] SurfaceError),
}

type Result<T, E = CommandError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub enum Command {
    Pencil(Stroke),
    Line(Line),
    Rectangle(Shape),
    Ellipse(Shape),
    Stamp(Stamp),
    Text(Text),
    Selection(Selection),
}

impl Command {
    pub fn pencil(style: &Style, points: &[Vec2f]) -> Result<Self> {
        Ok(Command::Pencil(Stroke::capture("pencil", 1, style, points)?))
    }

    pub fn line(style: &Style, policy: &RenderPolicy, points: &[Vec2f]) -> Result<Self> {
        let stroke = Stroke::capture("line", 2, style, points)?;
        let junction = if style.junction {
            check_finite("line", "junction diameter", style.junction_diameter)?;
            let radius = (style.junction_diameter * 0.5)
                .max(stroke.width * policy.junction_min_fraction);
            Some(radius)
        } else {
            None
        };
        Ok(Command::Line(Line { stroke, junction }))
    }

    pub fn rectangle(style: &Style, policy: &RenderPolicy, path: &[Vec2f]) -> Result<Self> {
        Ok(Command::Rectangle(Shape::capture("rectangle", style, policy, path)?))
    }

    pub fn ellipse(style: &Style, policy: &RenderPolicy, path: &[Vec2f]) -> Result<Self> {
        Ok(Command::Ellipse(Shape::capture("ellipse", style, policy, path)?))
    }

    pub fn stamp(image: Arc<PixelBuffer>, anchor: Vec2f, angle: f32, zoom: f32) -> Result<Self> {
        if image.is_empty() {
            return Err(CommandError::EmptyImage);
        }
        check_point("stamp", anchor)?;
        check_finite("stamp", "angle", angle)?;
        check_finite("stamp", "zoom", zoom)?;
        Ok(Command::Stamp(Stamp {
            image,
            anchor,
            angle,
            zoom,
        }))
    }

    pub fn text(style: &Style, text: &str, origin: Vec2f) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(CommandError::EmptyText);
        }
        check_point("text", origin)?;
        check_positive("text", "font size", style.font_size)?;
        Ok(Command::Text(Text {
            text: text.to_string(),
            origin,
            size: style.font_size,
            color: style.primary.parse()?,
        }))
    }

    pub fn selection<S>(surface: &S, region: Region, dest: Rect) -> Result<Self>
    where
        S: Surface + ?Sized,
    {
        Ok(Command::Selection(Selection::capture(surface, region, dest)?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Pencil(_) => "pencil",
            Command::Line(_) => "line",
            Command::Rectangle(_) => "rectangle",
            Command::Ellipse(_) => "ellipse",
            Command::Stamp(_) => "stamp",
            Command::Text(_) => "text",
            Command::Selection(_) => "selection",
        }
    }

    pub fn execute<S>(&self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        log::trace!("replaying {}", self.name());
        match self {
            Command::Pencil(stroke) => stroke.draw(surface),
            Command::Line(line) => line.draw(surface),
            Command::Rectangle(shape) => shape.draw(surface, ShapeKind::Rectangle),
            Command::Ellipse(shape) => shape.draw(surface, ShapeKind::Ellipse),
            Command::Stamp(stamp) => stamp.draw(surface),
            Command::Text(text) => {
                surface.fill_text(&text.text, text.origin, text.size, text.color)
            }
            Command::Selection(selection) => selection.draw(surface),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Vec2f>,
    width: f32,
    color: Rgba,
}

impl Stroke {
    fn capture(
        tool: &'static str,
        needed: usize,
        style: &Style,
        points: &[Vec2f],
    ) -> Result<Self> {
        if points.len() < needed {
            return Err(CommandError::TooFewPoints {
                tool,
                needed,
                got: points.len(),
            });
        }
        for &p in points {
            check_point(tool, p)?;
        }
        check_positive(tool, "width", style.width)?;
        Ok(Self {
            points: points.to_vec(),
            width: style.width,
            color: style.primary.parse()?,
        })
    }

    pub fn points(&self) -> &[Vec2f] {
        &self.points
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        surface.stroke_polyline(&self.points, self.width, self.color)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    stroke: Stroke,
    /// Radius of the dots drawn at interior points.
    junction: Option<f32>,
}

impl Line {
    pub fn junction_radius(&self) -> Option<f32> {
        self.junction
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        self.stroke.draw(surface)?;
        if let Some(radius) = self.junction {
            let points = &self.stroke.points;
            for &p in &points[1..points.len() - 1] {
                surface.fill_circle(p, radius, self.stroke.color)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Rectangle,
    Ellipse,
}

impl ShapeKind {
    fn fill<S: Surface + ?Sized>(
        self,
        surface: &mut S,
        bounds: Rect,
        color: Rgba,
    ) -> Result<(), SurfaceError> {
        match self {
            ShapeKind::Rectangle => surface.fill_rect(bounds, color),
            ShapeKind::Ellipse => surface.fill_ellipse(bounds, color),
        }
    }

    fn stroke<S: Surface + ?Sized>(
        self,
        surface: &mut S,
        bounds: Rect,
        width: f32,
        color: Rgba,
    ) -> Result<(), SurfaceError> {
        match self {
            ShapeKind::Rectangle => surface.stroke_rect(bounds, width, color),
            ShapeKind::Ellipse => surface.stroke_ellipse(bounds, width, color),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    start: Vec2f,
    end: Vec2f,
    constrain_aspect: bool,
    fill: FillMode,
    width: f32,
    primary: Rgba,
    secondary: Rgba,
    policy: RenderPolicy,
}

impl Shape {
    fn capture(
        tool: &'static str,
        style: &Style,
        policy: &RenderPolicy,
        path: &[Vec2f],
    ) -> Result<Self> {
        let (Some(&start), Some(&end)) = (path.first(), path.last()) else {
            return Err(CommandError::TooFewPoints {
                tool,
                needed: 2,
                got: 0,
            });
        };
        if path.len() < 2 {
            return Err(CommandError::TooFewPoints {
                tool,
                needed: 2,
                got: path.len(),
            });
        }
        check_point(tool, start)?;
        check_point(tool, end)?;
        check_positive(tool, "width", style.width)?;
        Ok(Self {
            start,
            end,
            constrain_aspect: style.constrain_aspect,
            fill: style.fill,
            width: style.width,
            primary: style.primary.parse()?,
            secondary: style.secondary.parse()?,
            policy: *policy,
        })
    }

    pub fn bounds(&self) -> Rect {
        let mut size = self.end - self.start;
        if self.constrain_aspect {
            let side = size.x().abs().min(size.y().abs());
            size = vec2(side.copysign(size.x()), side.copysign(size.y()));
        }
        Rect::new(self.start, size)
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S, kind: ShapeKind) -> Result<(), SurfaceError> {
        let bounds = self.bounds();
        match self.fill {
            FillMode::Outline => kind.stroke(surface, bounds, self.width, self.secondary),
            FillMode::FillOnly => kind.fill(surface, bounds, self.primary),
            FillMode::OutlineFill => {
                let border = self.width.max(self.policy.min_outline_width);
                let shorter = bounds.width().min(bounds.height());
                if shorter <= 2.0 * border + self.policy.degenerate_slack {
                    // The border would swallow the interior (or the shape is a sliver): draw a
                    // solid border-colored shape that is at least one border wide on each axis.
                    let grown = vec2(
                        at_least(bounds.size.x(), border),
                        at_least(bounds.size.y(), border),
                    );
                    kind.fill(surface, Rect::new(bounds.origin, grown), self.secondary)
                } else {
                    kind.fill(surface, bounds, self.primary)?;
                    kind.stroke(surface, bounds, border, self.secondary)
                }
            }
        }
    }
}

fn at_least(value: f32, min: f32) -> f32 {
    if value.abs() >= min {
        value
    } else {
        min.copysign(value)
    }
}

#[derive(Debug, Clone)]
pub struct Stamp {
    image: Arc<PixelBuffer>,
    anchor: Vec2f,
    angle: f32,
    zoom: f32,
}

impl Stamp {
    /// Scale factor derived from the zoom setting: `0` means 1:1, positive values magnify, and a
    /// negative zoom `-z` shrinks by `1 / z`.
    pub fn scale(&self) -> f32 {
        if self.zoom == 0.0 {
            1.0
        } else if self.zoom < 0.0 {
            1.0 / -self.zoom
        } else {
            self.zoom
        }
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        surface.save()?;
        let drawn = self.draw_in_frame(surface);
        // Restore even if drawing failed, so the frame never leaks into later commands.
        let restored = surface.restore();
        drawn.and(restored)
    }

    fn draw_in_frame<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        surface.translate(self.anchor)?;
        surface.rotate(self.angle)?;
        let size = vec2(self.image.width() as f32, self.image.height() as f32) * self.scale();
        surface.draw_image(&self.image, Rect::new(size * -0.5, size))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    text: String,
    origin: Vec2f,
    size: f32,
    color: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Rect(Rect),
    /// Closed freehand path; the closing segment is implied.
    Lasso(Vec<Vec2f>),
}

#[derive(Debug, Clone)]
pub struct Selection {
    outline: Vec<Vec2f>,
    pixels: Arc<PixelBuffer>,
    dest: Rect,
    paste: Rect,
}

impl Selection {
    fn capture<S>(surface: &S, region: Region, dest: Rect) -> Result<Self>
    where
        S: Surface + ?Sized,
    {
        check_point("selection", dest.origin)?;
        check_point("selection", dest.size)?;

        let (outline, lasso) = match region {
            Region::Rect(rect) => {
                check_point("selection", rect.origin)?;
                check_point("selection", rect.size)?;
                // Snap to whole pixels so the erased area matches the copied one.
                let min = rect.min();
                let max = rect.max();
                let snapped = Rect::from_corners(
                    vec2(min.x().floor(), min.y().floor()),
                    vec2(max.x().ceil(), max.y().ceil()),
                );
                (snapped.corners().to_vec(), false)
            }
            Region::Lasso(points) => {
                if points.len() < 3 {
                    return Err(CommandError::TooFewPoints {
                        tool: "lasso",
                        needed: 3,
                        got: points.len(),
                    });
                }
                for &p in &points {
                    check_point("lasso", p)?;
                }
                if polyline_self_intersects(&points, true) {
                    return Err(CommandError::SelfIntersectingLasso);
                }
                (points, true)
            }
        };

        let bounds = bounding_box(&outline)
            .map(|b| b.normalized())
            .unwrap_or_default();
        let (lo, hi) = (bounds.min(), bounds.max());
        let full = Rect::from_corners(
            vec2(lo.x().floor(), lo.y().floor()),
            vec2(hi.x().ceil(), hi.y().ceil()),
        );

        // Clip in float space; only the part on the surface is copied.
        let surface_size = surface.size();
        let min = vec2(full.origin.x().max(0.0), full.origin.y().max(0.0));
        let max = vec2(
            full.end().x().min(surface_size.x() as f32),
            full.end().y().min(surface_size.y() as f32),
        );
        if max.x() <= min.x() || max.y() <= min.y() {
            return Err(CommandError::Capture(SurfaceError::OutOfBounds {
                origin: vec2(full.origin.x() as i32, full.origin.y() as i32),
                size: vec2(full.size.x() as u32, full.size.y() as u32),
                surface: surface_size,
            }));
        }
        let origin = vec2(min.x() as i32, min.y() as i32);
        let size = vec2((max.x() - min.x()) as u32, (max.y() - min.y()) as u32);
        let mut pixels = surface.get_pixels(origin, size)?;

        if lasso {
            for y in 0..pixels.height() {
                for x in 0..pixels.width() {
                    let center = vec2(
                        (origin.x() + x as i32) as f32 + 0.5,
                        (origin.y() + y as i32) as f32 + 0.5,
                    );
                    if !point_in_polygon(center, &outline) {
                        pixels.set(x, y, Rgba::TRANSPARENT);
                    }
                }
            }
        }

        // Where the clipped copy lands inside `dest`.
        let scale = vec2(dest.size.x() / full.size.x(), dest.size.y() / full.size.y());
        let paste = Rect::new(
            dest.origin + (min - full.origin) * scale,
            (max - min) * scale,
        );

        Ok(Self {
            outline,
            pixels: Arc::new(pixels),
            dest,
            paste,
        })
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn dest(&self) -> Rect {
        self.dest
    }

    fn draw<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), SurfaceError> {
        surface.erase_polygon(&self.outline)?;
        surface.draw_image(&self.pixels, self.paste)
    }
}

fn check_finite(tool: &'static str, what: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(CommandError::NotFinite { tool, what });
    }
    Ok(())
}

fn check_positive(tool: &'static str, what: &'static str, value: f32) -> Result<()> {
    check_finite(tool, what, value)?;
    if value <= 0.0 {
        return Err(CommandError::NotPositive { tool, what, value });
    }
    Ok(())
}

fn check_point(tool: &'static str, p: Vec2f) -> Result<()> {
    if !p.is_finite() {
        return Err(CommandError::NotFinite {
            tool,
            what: "coordinate",
        });
    }
    Ok(())
}
