//! Utility modules for opera_mpc

pub mod visualization;

pub use visualization::{colors, save_history_charts, SeriesStyle, Visualizer};
