use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    #[default]
    Outline,
    FillOnly,
    OutlineFill,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub primary: String,
    pub secondary: String,
    pub width: f32,
    pub fill: FillMode,
    /// Forces rectangles to squares and ellipses to circles.
    pub constrain_aspect: bool,
    pub junction: bool,
    pub junction_diameter: f32,
    pub font_size: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            primary: "#000000".into(),
            secondary: "#000000".into(),
            width: 1.0,
            fill: FillMode::Outline,
            constrain_aspect: false,
            junction: false,
            junction_diameter: 0.0,
            font_size: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderPolicy {
    /// Junction dots have a radius of at least `width * junction_min_fraction`.
    pub junction_min_fraction: f32,
    pub min_outline_width: f32,
    /// A shape whose shorter side is at most `2 * border + degenerate_slack` has no visible
    /// interior and is drawn as a solid border-colored shape instead.
    pub degenerate_slack: f32,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            junction_min_fraction: 0.5,
            min_outline_width: 1.0,
            degenerate_slack: 0.0,
        }
    }
}
