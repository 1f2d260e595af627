pub mod geometry;
pub mod hit;
pub mod projection;
pub mod renderer;
pub mod spatial;

pub use projection::Viewport;
pub use renderer::{CanvasLayer, MapRenderer};
