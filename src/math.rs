use std::{
    array,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub},
};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Vec<T, const N: usize>([T; N]);

impl<T: Default, const N: usize> Default for Vec<T, N> {
    fn default() -> Self {
        Vec(array::from_fn(|_| T::default()))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Vec<T, 2> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        <[T; 2]>::deserialize(deserializer).map(Vec)
    }
}

impl<const N: usize> Vec<f32, N> {
    pub fn dist(self, other: Self) -> f32 {
        let mut sum = 0.0;
        for (&a, &b) in self.0.iter().zip(&other.0) {
            let diff = b - a;
            sum += diff * diff;
        }
        sum.sqrt()
    }

    pub fn length(self) -> f32 {
        self.dist(Vec([0.0; N]))
    }

    pub fn normalize(self) -> Self {
        self / self.length()
    }

    pub fn abs(self) -> Self {
        Vec(self.0.map(f32::abs))
    }

    pub fn is_finite(self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl<T: Copy> Vec<T, 2> {
    pub fn x(self) -> T {
        self.0[0]
    }

    pub fn y(self) -> T {
        self.0[1]
    }
}

impl Vec2f {
    pub fn cross(self, other: Self) -> f32 {
        self.x() * other.y() - self.y() * other.x()
    }

    pub fn perp(self) -> Self {
        vec2(-self.y(), self.x())
    }
}

pub type Vec2<T> = Vec<T, 2>;
pub type Vec2f = Vec2<f32>;
pub type Vec2u = Vec2<u32>;
pub type Vec2i = Vec2<i32>;

impl<T, const N: usize> From<[T; N]> for Vec<T, N> {
    fn from(value: [T; N]) -> Self {
        Self(value)
    }
}

impl<T, const N: usize> From<Vec<T, N>> for [T; N] {
    fn from(value: Vec<T, N>) -> Self {
        value.0
    }
}

impl<T, const N: usize> Add<Vec<T, N>> for Vec<T, N>
where
    T: Add<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn add(self, rhs: Vec<T, N>) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

impl<T, const N: usize> AddAssign<Vec<T, N>> for Vec<T, N>
where
    T: Add<Output = T> + Copy,
{
    fn add_assign(&mut self, rhs: Vec<T, N>) {
        *self = *self + rhs;
    }
}

impl<T, const N: usize> Sub<Vec<T, N>> for Vec<T, N>
where
    T: Sub<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn sub(self, rhs: Vec<T, N>) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] - rhs.0[i]))
    }
}

impl<T, const N: usize> Neg for Vec<T, N>
where
    T: Neg<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn neg(self) -> Self::Output {
        Vec(array::from_fn(|i| -self.0[i]))
    }
}

impl<T, const N: usize> Mul<Vec<T, N>> for Vec<T, N>
where
    T: Mul<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn mul(self, rhs: Vec<T, N>) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] * rhs.0[i]))
    }
}

impl<T, const N: usize> Mul<T> for Vec<T, N>
where
    T: Mul<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn mul(self, rhs: T) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] * rhs))
    }
}

impl<T, const N: usize> Div<T> for Vec<T, N>
where
    T: Div<Output = T> + Copy,
{
    type Output = Vec<T, N>;

    fn div(self, rhs: T) -> Self::Output {
        Vec(array::from_fn(|i| self.0[i] / rhs))
    }
}

pub fn vec2<T>(x: T, y: T) -> Vec2<T> {
    Vec([x, y])
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Rect {
    pub origin: Vec2f,
    pub size: Vec2f,
}

impl Rect {
    pub fn new(origin: Vec2f, size: Vec2f) -> Self {
        Self { origin, size }
    }

    pub fn from_corners(a: Vec2f, b: Vec2f) -> Self {
        Self {
            origin: a,
            size: b - a,
        }
    }

    pub fn end(&self) -> Vec2f {
        self.origin + self.size
    }

    pub fn min(&self) -> Vec2f {
        let end = self.end();
        vec2(self.origin.x().min(end.x()), self.origin.y().min(end.y()))
    }

    pub fn max(&self) -> Vec2f {
        let end = self.end();
        vec2(self.origin.x().max(end.x()), self.origin.y().max(end.y()))
    }

    pub fn normalized(&self) -> Self {
        let min = self.min();
        Self {
            origin: min,
            size: self.max() - min,
        }
    }

    pub fn width(&self) -> f32 {
        self.size.x().abs()
    }

    pub fn height(&self) -> f32 {
        self.size.y().abs()
    }

    pub fn center(&self) -> Vec2f {
        self.origin + self.size * 0.5
    }

    pub fn translate(&self, offset: Vec2f) -> Self {
        Self {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    pub fn inset(&self, amount: f32) -> Self {
        let r = self.normalized();
        let size = vec2(
            (r.size.x() - 2.0 * amount).max(0.0),
            (r.size.y() - 2.0 * amount).max(0.0),
        );
        Self {
            origin: r.center() - size * 0.5,
            size,
        }
    }

    pub fn corners(&self) -> [Vec2f; 4] {
        let (min, max) = (self.min(), self.max());
        [min, vec2(max.x(), min.y()), max, vec2(min.x(), max.y())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine([f32; 6]);

impl Affine {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translation(offset: Vec2f) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, offset.x(), offset.y()])
    }

    pub fn rotation(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self([cos, sin, -sin, cos, 0.0, 0.0])
    }

    /// Returns the transform that applies `inner` first, then `self`.
    pub fn then(self, inner: Self) -> Self {
        let [a, b, c, d, e, f] = self.0;
        let [ia, ib, ic, id, ie, if_] = inner.0;
        Self([
            a * ia + c * ib,
            b * ia + d * ib,
            a * ic + c * id,
            b * ic + d * id,
            a * ie + c * if_ + e,
            b * ie + d * if_ + f,
        ])
    }

    pub fn apply(&self, p: Vec2f) -> Vec2f {
        let [a, b, c, d, e, f] = self.0;
        vec2(a * p.x() + c * p.y() + e, b * p.x() + d * p.y() + f)
    }

    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * d - b * c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let (na, nb, nc, nd) = (d * inv, -b * inv, -c * inv, a * inv);
        Some(Self([
            na,
            nb,
            nc,
            nd,
            -(na * e + nc * f),
            -(nb * e + nd * f),
        ]))
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}
