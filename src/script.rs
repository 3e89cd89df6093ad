use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::{
    command::{Command, Region},
    config::Config,
    geometry::{bounding_box, resize, Handle},
    history::History,
    math::{Rect, Vec2f},
    style::{FillMode, RenderPolicy, Style},
    surface::{PixelBuffer, Surface},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Style(StyleUpdate),
    Pencil {
        points: Vec<Vec2f>,
    },
    Line {
        points: Vec<Vec2f>,
    },
    Rectangle {
        points: Vec<Vec2f>,
    },
    Ellipse {
        points: Vec<Vec2f>,
    },
    Stamp {
        /// PNG file, relative to the script.
        image: PathBuf,
        at: Vec2f,
        /// Clockwise rotation in radians.
        #[serde(default)]
        angle: f32,
        /// `0` and `1` draw at natural size, `-n` shrinks by `n`.
        #[serde(default)]
        zoom: f32,
    },
    Text {
        text: String,
        at: Vec2f,
    },
    Select {
        rect: Option<Rect>,
        lasso: Option<Vec<Vec2f>>,
        #[serde(default)]
        offset: Vec2f,
        resize: Option<ResizeDrag>,
    },
    Undo,
    Redo,
    Reset,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Style(_) => "style",
            Step::Pencil { .. } => "pencil",
            Step::Line { .. } => "line",
            Step::Rectangle { .. } => "rectangle",
            Step::Ellipse { .. } => "ellipse",
            Step::Stamp { .. } => "stamp",
            Step::Text { .. } => "text",
            Step::Select { .. } => "select",
            Step::Undo => "undo",
            Step::Redo => "redo",
            Step::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeDrag {
    pub handle: Handle,
    pub delta: Vec2f,
    #[serde(default)]
    pub constrain_aspect: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleUpdate {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub width: Option<f32>,
    pub fill: Option<FillMode>,
    pub constrain_aspect: Option<bool>,
    pub junction: Option<bool>,
    pub junction_diameter: Option<f32>,
    pub font_size: Option<f32>,
}

impl StyleUpdate {
    pub fn apply_to(&self, style: &mut Style) {
        if let Some(primary) = &self.primary {
            style.primary.clone_from(primary);
        }
        if let Some(secondary) = &self.secondary {
            style.secondary.clone_from(secondary);
        }
        if let Some(width) = self.width {
            style.width = width;
        }
        if let Some(fill) = self.fill {
            style.fill = fill;
        }
        if let Some(constrain_aspect) = self.constrain_aspect {
            style.constrain_aspect = constrain_aspect;
        }
        if let Some(junction) = self.junction {
            style.junction = junction;
        }
        if let Some(junction_diameter) = self.junction_diameter {
            style.junction_diameter = junction_diameter;
        }
        if let Some(font_size) = self.font_size {
            style.font_size = font_size;
        }
    }
}

pub struct Session<S> {
    surface: S,
    history: History,
    style: Style,
    policy: RenderPolicy,
    assets_dir: PathBuf,
    stamps: HashMap<PathBuf, Arc<PixelBuffer>>,
}

impl<S: Surface> Session<S> {
    pub fn new(surface: S, config: &Config) -> Self {
        let history = match config.history.limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        Self {
            surface,
            history,
            style: config.style.clone(),
            policy: config.render,
            assets_dir: config.assets_dir.clone(),
            stamps: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn run(&mut self, steps: &[Step]) -> anyhow::Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.apply(step)
                .with_context(|| format!("step #{} ({}) failed", i + 1, step.name()))?;
        }
        Ok(())
    }

    pub fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        log::trace!("applying {step:?}");
        let command = match step {
            Step::Style(update) => {
                update.apply_to(&mut self.style);
                return Ok(());
            }
            Step::Undo => return Ok(self.history.undo(&mut self.surface)?),
            Step::Redo => return Ok(self.history.redo(&mut self.surface)?),
            Step::Reset => return Ok(self.history.reset(&mut self.surface)?),

            Step::Pencil { points } => Command::pencil(&self.style, points)?,
            Step::Line { points } => Command::line(&self.style, &self.policy, points)?,
            Step::Rectangle { points } => Command::rectangle(&self.style, &self.policy, points)?,
            Step::Ellipse { points } => Command::ellipse(&self.style, &self.policy, points)?,
            Step::Stamp {
                image,
                at,
                angle,
                zoom,
            } => {
                let image = self.stamp_image(image)?;
                Command::stamp(image, *at, *angle, *zoom)?
            }
            Step::Text { text, at } => Command::text(&self.style, text, *at)?,
            Step::Select {
                rect,
                lasso,
                offset,
                resize: drag,
            } => {
                let (region, bounds) = match (rect, lasso) {
                    (Some(rect), None) => (Region::Rect(*rect), rect.normalized()),
                    (None, Some(points)) => (
                        Region::Lasso(points.clone()),
                        bounding_box(points).unwrap_or_default().normalized(),
                    ),
                    _ => bail!("select needs exactly one of `rect` or `lasso`"),
                };
                let mut dest = bounds.translate(*offset);
                if let Some(drag) = drag {
                    dest = resize(dest, drag.handle, drag.delta, drag.constrain_aspect);
                }
                Command::selection(&self.surface, region, dest)?
            }
        };
        self.history.push(command, &mut self.surface)?;
        Ok(())
    }

    fn stamp_image(&mut self, path: &Path) -> anyhow::Result<Arc<PixelBuffer>> {
        let path = self.assets_dir.join(path);
        if let Some(image) = self.stamps.get(&path) {
            return Ok(image.clone());
        }
        let image = PixelBuffer::load(&path)
            .with_context(|| format!("failed to load stamp '{}'", path.display()))?;
        log::debug!(
            "loaded stamp '{}' ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        let image = Arc::new(image);
        self.stamps.insert(path, image.clone());
        Ok(image)
    }
}
