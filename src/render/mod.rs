pub mod palette;
pub mod surface;
pub mod svg;
pub mod tree;
pub mod wheel;

pub use palette::ChartPalette;
pub use surface::{Paint, Point, RenderSurface, TextStyle};
pub use svg::SvgSurface;
pub use tree::{house_label_point, house_path, Sefirah, TreeRenderer};
pub use wheel::{polar, wheel_angle, WheelGeometry, WheelRenderer};

use crate::error::Result;
use tracing::{debug, error};

/// Runs one frame: clears the surface, draws, and commits. If drawing fails
/// the frame is discarded and the previously committed image is left alone.
pub fn render_frame<S, F>(surface: &mut S, layout: &str, draw: F) -> Result<()>
where
    S: RenderSurface,
    F: FnOnce(&mut S) -> Result<()>,
{
    surface.clear();
    match draw(surface) {
        Ok(()) => {
            surface.commit()?;
            debug!("{} frame committed", layout);
            Ok(())
        }
        Err(err) => {
            error!("{} render failed, keeping previous frame: {}", layout, err);
            surface.discard();
            Err(err)
        }
    }
}
