use crate::math::{vec2, Rect, Vec2f};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    /// Which edges the handle drags: `-1` for left/top, `1` for right/bottom, `0` for neither.
    fn axes(self) -> (f32, f32) {
        match self {
            Handle::TopLeft => (-1.0, -1.0),
            Handle::Top => (0.0, -1.0),
            Handle::TopRight => (1.0, -1.0),
            Handle::Right => (1.0, 0.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::Bottom => (0.0, 1.0),
            Handle::BottomLeft => (-1.0, 1.0),
            Handle::Left => (-1.0, 0.0),
        }
    }
}

pub fn resize(rect: Rect, handle: Handle, delta: Vec2f, constrain_aspect: bool) -> Rect {
    let r = rect.normalized();
    let (hx, hy) = handle.axes();
    let (w, h) = (r.size.x(), r.size.y());

    // Signed size measured from the fixed edge towards the dragged one.
    let mut new_w = w + hx * delta.x();
    let mut new_h = h + hy * delta.y();

    if constrain_aspect && w > 0.0 && h > 0.0 {
        let (sx, sy) = (new_w / w, new_h / h);
        let s = match (hx != 0.0, hy != 0.0) {
            (true, true) => {
                if sx.abs() >= sy.abs() {
                    sx
                } else {
                    sy
                }
            }
            (true, false) => sx,
            _ => sy,
        };
        new_w = w * s;
        new_h = h * s;
    }

    let center = r.center();
    let (x0, x1) = match hx {
        hx if hx < 0.0 => (r.max().x() - new_w, r.max().x()),
        hx if hx > 0.0 => (r.min().x(), r.min().x() + new_w),
        _ => (center.x() - new_w * 0.5, center.x() + new_w * 0.5),
    };
    let (y0, y1) = match hy {
        hy if hy < 0.0 => (r.max().y() - new_h, r.max().y()),
        hy if hy > 0.0 => (r.min().y(), r.min().y() + new_h),
        _ => (center.y() - new_h * 0.5, center.y() + new_h * 0.5),
    };
    Rect::from_corners(vec2(x0, y0), vec2(x1, y1)).normalized()
}

pub fn segments_intersect(a1: Vec2f, a2: Vec2f, b1: Vec2f, b2: Vec2f) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

fn orientation(a: Vec2f, b: Vec2f, p: Vec2f) -> f32 {
    (b - a).cross(p - a)
}

/// `p` is known to be collinear with `a`-`b`; checks that it lies within the segment's bounds.
fn on_segment(a: Vec2f, b: Vec2f, p: Vec2f) -> bool {
    p.x() >= a.x().min(b.x())
        && p.x() <= a.x().max(b.x())
        && p.y() >= a.y().min(b.y())
        && p.y() <= a.y().max(b.y())
}

pub fn polyline_self_intersects(points: &[Vec2f], closed: bool) -> bool {
    let mut segments: Vec<(Vec2f, Vec2f)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && points.len() > 2 {
        segments.push((points[points.len() - 1], points[0]));
    }

    let n = segments.len();
    for i in 0..n {
        for j in i + 2..n {
            if closed && i == 0 && j == n - 1 {
                // First and closing segment share the start point.
                continue;
            }
            let (a1, a2) = segments[i];
            let (b1, b2) = segments[j];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

pub fn point_in_polygon(point: Vec2f, polygon: &[Vec2f]) -> bool {
    let mut inside = false;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        if (a.y() > point.y()) != (b.y() > point.y()) {
            let t = (point.y() - a.y()) / (b.y() - a.y());
            if point.x() < a.x() + t * (b.x() - a.x()) {
                inside = !inside;
            }
        }
    }
    inside
}

pub fn bounding_box(points: &[Vec2f]) -> Option<Rect> {
    let first = *points.first()?;
    let (min, max) = points.iter().fold((first, first), |(min, max), p| {
        (
            vec2(min.x().min(p.x()), min.y().min(p.y())),
            vec2(max.x().max(p.x()), max.y().max(p.y())),
        )
    });
    Some(Rect::from_corners(min, max))
}
