use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Composites `self` over `dst` (alpha-over on straight alpha).
    pub fn over(self, dst: Self) -> Self {
        match self.a {
            255 => return self,
            0 => return dst,
            _ => {}
        }
        let src_a = f32::from(self.a) / 255.0;
        let dst_a = f32::from(dst.a) / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        let blend = |s: u8, d: u8| {
            ((f32::from(s) * src_a + f32::from(d) * dst_a * (1.0 - src_a)) / out_a)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self {
            r: blend(self.r, dst.r),
            g: blend(self.g, dst.g),
            b: blend(self.b, dst.b),
            a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}'")]
pub struct ColorError(pub String);

impl FromStr for Rgba {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorError(s.to_string());
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }
        if let Some(args) = trimmed
            .strip_prefix("rgba(")
            .or_else(|| trimmed.strip_prefix("rgb("))
        {
            let args = args.strip_suffix(')').ok_or_else(err)?;
            return parse_functional(args).ok_or_else(err);
        }

        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" => Rgba::BLACK,
            "white" => Rgba::WHITE,
            "red" => Rgba::opaque(255, 0, 0),
            "green" => Rgba::opaque(0, 128, 0),
            "lime" => Rgba::opaque(0, 255, 0),
            "blue" => Rgba::opaque(0, 0, 255),
            "yellow" => Rgba::opaque(255, 255, 0),
            "cyan" | "aqua" => Rgba::opaque(0, 255, 255),
            "magenta" | "fuchsia" => Rgba::opaque(255, 0, 255),
            "orange" => Rgba::opaque(255, 165, 0),
            "gray" | "grey" => Rgba::opaque(128, 128, 128),
            "transparent" => Rgba::TRANSPARENT,
            _ => return Err(err()),
        };
        Ok(named)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n << 4 | n);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Rgba::opaque(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let a: f32 = a.parse().ok()?;
            if !(0.0..=1.0).contains(&a) {
                return None;
            }
            Some(Rgba::new(
                channel(r)?,
                channel(g)?,
                channel(b)?,
                (a * 255.0).round() as u8,
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#f00".parse(), Ok(Rgba::opaque(255, 0, 0)));
        assert_eq!("#0f08".parse(), Ok(Rgba::new(0, 255, 0, 0x88)));
        assert_eq!("#102030".parse(), Ok(Rgba::opaque(0x10, 0x20, 0x30)));
        assert_eq!("#10203040".parse(), Ok(Rgba::new(0x10, 0x20, 0x30, 0x40)));
    }

    #[test]
    fn parses_functional_forms() {
        assert_eq!("rgb(1, 2, 3)".parse(), Ok(Rgba::opaque(1, 2, 3)));
        assert_eq!("rgba(1,2,3,0.5)".parse(), Ok(Rgba::new(1, 2, 3, 128)));
        assert_eq!(" White ".parse(), Ok(Rgba::WHITE));
    }

    #[test]
    fn rejects_garbage() {
        for s in ["", "#12", "#ggg", "rgb(1,2)", "rgba(1,2,3,2)", "rgb(300,0,0)", "chartreuse?"] {
            assert!(s.parse::<Rgba>().is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn over_blends() {
        assert_eq!(Rgba::BLACK.over(Rgba::WHITE), Rgba::BLACK);
        assert_eq!(Rgba::TRANSPARENT.over(Rgba::WHITE), Rgba::WHITE);
        let half_red = Rgba::new(255, 0, 0, 128);
        let out = half_red.over(Rgba::WHITE);
        assert_eq!(out.a, 255);
        assert_eq!(out.r, 255);
        assert!(out.g > 120 && out.g < 130);
    }
}
