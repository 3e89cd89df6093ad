use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::{
    color::Rgba,
    script::Step,
    style::{RenderPolicy, Style},
};

const MAX_CANVAS_SIDE: u32 = 16384;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub render: RenderPolicy,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
    /// Directory relative asset paths (stamp images) are resolved against.
    #[serde(skip)]
    pub assets_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Maximum number of undoable commands. Unlimited if unset.
    pub limit: Option<usize>,
}

impl Config {
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let mut config = Self::parse(&contents)?;
        config.assets_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        log::info!(
            "loaded '{}': {}x{} canvas, {} steps",
            path.display(),
            config.canvas.width,
            config.canvas.height,
            config.steps.len()
        );
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let CanvasConfig { width, height } = self.canvas;
        if !(1..=MAX_CANVAS_SIDE).contains(&width) || !(1..=MAX_CANVAS_SIDE).contains(&height) {
            bail!("canvas must be between 1x1 and {MAX_CANVAS_SIDE}x{MAX_CANVAS_SIDE} (got {width}x{height})");
        }

        for (name, color) in [
            ("primary", &self.style.primary),
            ("secondary", &self.style.secondary),
        ] {
            if let Err(e) = color.parse::<Rgba>() {
                bail!("[style] {name}: {e}");
            }
        }
        if !(self.style.width.is_finite() && self.style.width > 0.0) {
            bail!("[style] width must be positive (got {})", self.style.width);
        }

        let RenderPolicy {
            junction_min_fraction,
            min_outline_width,
            degenerate_slack,
        } = self.render;
        for (name, value) in [
            ("junction_min_fraction", junction_min_fraction),
            ("min_outline_width", min_outline_width),
            ("degenerate_slack", degenerate_slack),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("[render] {name} must be a non-negative number (got {value})");
            }
        }

        if self.history.limit == Some(0) {
            bail!("[history] limit must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FillMode;

    #[test]
    fn parses_example_script() {
        let config = Config::load("drawing.example.toml").unwrap();
        assert!(!config.steps.is_empty());
        assert_eq!(config.assets_dir, Path::new(""));
    }

    #[test]
    fn defaults() {
        let config = Config::parse("[canvas]\nwidth = 8\nheight = 4\n").unwrap();
        assert_eq!(config.style, Style::default());
        assert_eq!(config.render, RenderPolicy::default());
        assert_eq!(config.history.limit, None);
        assert!(config.steps.is_empty());
    }

    #[test]
    fn partial_style() {
        let config = Config::parse(
            r##"
            [canvas]
            width = 8
            height = 4

            [style]
            primary = "rgba(10, 20, 30, 0.5)"
            fill = "outline_fill"
            "##,
        )
        .unwrap();
        assert_eq!(config.style.primary, "rgba(10, 20, 30, 0.5)");
        assert_eq!(config.style.fill, FillMode::OutlineFill);
        assert_eq!(config.style.width, 1.0);
    }

    #[test]
    fn rejects_invalid_settings() {
        let cases = [
            "[canvas]\nwidth = 0\nheight = 4\n",
            "[canvas]\nwidth = 8\nheight = 4\n[style]\nprimary = \"nope\"\n",
            "[canvas]\nwidth = 8\nheight = 4\n[style]\nwidth = -1.0\n",
            "[canvas]\nwidth = 8\nheight = 4\n[render]\ndegenerate_slack = -2.0\n",
            "[canvas]\nwidth = 8\nheight = 4\n[history]\nlimit = 0\n",
            "[canvas]\nwidth = 8\nheight = 4\n[unknown]\n",
        ];
        for case in cases {
            assert!(Config::parse(case).is_err(), "accepted {case:?}");
        }
    }
}
