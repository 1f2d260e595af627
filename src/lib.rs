//! Terminal WebGIS: thematic GeoJSON layers drawn in Braille, with
//! click-to-inspect popups and data-driven styling.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod hash;
pub mod layers;
pub mod map;
pub mod popup;
pub mod style;
pub mod ui;
