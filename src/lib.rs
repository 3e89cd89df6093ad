pub mod color;
pub mod command;
pub mod config;
pub mod geometry;
pub mod history;
pub mod math;
pub mod raster;
pub mod script;
pub mod style;
pub mod surface;

pub use command::{Command, CommandError, Region};
pub use history::{History, HistoryState};
pub use raster::Canvas;
pub use style::{FillMode, RenderPolicy, Style};
pub use surface::{PixelBuffer, Surface, SurfaceError};
