//! Visualization utilities for opera_mpc
//!
//! Time-series charts of a recorded run through gnuplot. Series are
//! collected first and drawn onto a single axes when the chart is saved.

use std::fs;
use std::path::Path;

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth};

use crate::common::{ControlBounds, Interval, MpcError, MpcResult, ReferencePoint, StateBounds};
use crate::simulation::History;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00AA00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const PURPLE: &str = "#800080";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const X1: &str = BLUE;
    pub const X2: &str = GREEN;
    pub const REFERENCE: &str = RED;
    pub const BOUND: &str = GRAY;
    pub const U1: &str = ORANGE;
    pub const U2: &str = PURPLE;
    pub const OBJECTIVE: &str = BLACK;
}

/// Style for one plotted series
#[derive(Debug, Clone)]
pub struct SeriesStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl SeriesStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

#[derive(Debug, Clone)]
struct Series {
    x: Vec<f64>,
    y: Vec<f64>,
    style: SeriesStyle,
}

/// Corner points of a zero-order-hold plot: value `y[k]` is held over
/// `[x[k], x[k + 1])`, the last value for one more unit step.
pub fn stairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = x.len().min(y.len());
    let mut sx = Vec::with_capacity(2 * n);
    let mut sy = Vec::with_capacity(2 * n);
    for k in 0..n {
        let end = if k + 1 < n { x[k + 1] } else { x[k] + 1.0 };
        sx.push(x[k]);
        sy.push(y[k]);
        sx.push(end);
        sy.push(y[k]);
    }
    (sx, sy)
}

/// Step indices 0..len as plot abscissae
pub fn time_axis(len: usize) -> Vec<f64> {
    (0..len).map(|k| k as f64).collect()
}

/// Chart builder
pub struct Visualizer {
    title: String,
    x_label: String,
    y_label: String,
    y_range: Option<(f64, f64)>,
    series: Vec<Series>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            x_label: "step".to_string(),
            y_label: String::new(),
            y_range: None,
            series: Vec::new(),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_label(&mut self, label: &str) -> &mut Self {
        self.x_label = label.to_string();
        self
    }

    pub fn set_y_label(&mut self, label: &str) -> &mut Self {
        self.y_label = label.to_string();
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    /// Straight-line series
    pub fn plot_line(&mut self, x: &[f64], y: &[f64], style: &SeriesStyle) -> &mut Self {
        self.series.push(Series { x: x.to_vec(), y: y.to_vec(), style: style.clone() });
        self
    }

    /// Piecewise-constant series, for controls held over a step
    pub fn plot_steps(&mut self, x: &[f64], y: &[f64], style: &SeriesStyle) -> &mut Self {
        let (sx, sy) = stairs(x, y);
        self.series.push(Series { x: sx, y: sy, style: style.clone() });
        self
    }

    /// Horizontal lines at both ends of `interval` over `[x0, x1]`
    pub fn plot_bounds(&mut self, interval: &Interval, x0: f64, x1: f64, caption: &str) -> &mut Self {
        let style = SeriesStyle::new(colors::BOUND, caption).with_line_width(1.0);
        self.series.push(Series { x: vec![x0, x1], y: vec![interval.min; 2], style: style.clone() });
        let upper = SeriesStyle { caption: String::new(), ..style };
        self.series.push(Series { x: vec![x0, x1], y: vec![interval.max; 2], style: upper });
        self
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();
        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        for s in &self.series {
            axes.lines(&s.x, &s.y, &[
                Caption(s.style.caption.as_str()),
                Color(s.style.color.as_str()),
                LineWidth(s.style.line_width),
            ]);
        }
        figure
    }

    pub fn show(&self) -> MpcResult<()> {
        self.render()
            .show()
            .map(|_| ())
            .map_err(|e| MpcError::Visualization(e.to_string()))
    }

    pub fn save_png(&self, path: &str, width: u32, height: u32) -> MpcResult<()> {
        self.render()
            .save_to_png(path, width, height)
            .map_err(|e| MpcError::Visualization(e.to_string()))
    }

    pub fn save_svg(&self, path: &str, width: u32, height: u32) -> MpcResult<()> {
        self.render()
            .save_to_svg(path, width, height)
            .map_err(|e| MpcError::Visualization(e.to_string()))
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// States against their reference and bounds
pub fn state_chart(history: &History, reference: &[ReferencePoint], bounds: &StateBounds) -> Visualizer {
    let t = time_axis(history.states().len());
    let t_end = t.last().copied().unwrap_or(0.0);
    let r_t = time_axis(reference.len());
    let r1: Vec<f64> = reference.iter().map(|r| r.x1).collect();
    let r2: Vec<f64> = reference.iter().map(|r| r.x2).collect();

    let mut vis = Visualizer::new();
    vis.set_title("States").set_y_label("x");
    vis.plot_line(&t, &history.x1(), &SeriesStyle::new(colors::X1, "x1"))
        .plot_line(&t, &history.x2(), &SeriesStyle::new(colors::X2, "x2"))
        .plot_line(&r_t, &r1, &SeriesStyle::new(colors::REFERENCE, "x1 ref").with_line_width(1.0))
        .plot_line(&r_t, &r2, &SeriesStyle::new(colors::REFERENCE, "x2 ref").with_line_width(1.0))
        .plot_bounds(&bounds.x1, 0.0, t_end, "x1 bounds")
        .plot_bounds(&bounds.x2, 0.0, t_end, "x2 bounds");
    vis
}

/// Applied controls as steps, with bounds
pub fn control_chart(history: &History, bounds: &ControlBounds) -> Visualizer {
    let t = time_axis(history.controls().len());
    let t_end = t.len() as f64;

    let mut vis = Visualizer::new();
    vis.set_title("Controls").set_y_label("u");
    vis.plot_steps(&t, &history.u1(), &SeriesStyle::new(colors::U1, "u1"))
        .plot_steps(&t, &history.u2(), &SeriesStyle::new(colors::U2, "u2"))
        .plot_bounds(&bounds.u1, 0.0, t_end, "u1 bounds")
        .plot_bounds(&bounds.u2, 0.0, t_end, "u2 bounds");
    vis
}

/// Filtered objective over the run
pub fn objective_chart(history: &History) -> Visualizer {
    let t = time_axis(history.objective().len());
    let mut vis = Visualizer::new();
    vis.set_title("Filtered objective").set_y_label("o");
    vis.plot_line(&t, history.objective(), &SeriesStyle::new(colors::OBJECTIVE, "objective"));
    vis
}

/// Write the state, control and objective charts as PNGs into `dir`
pub fn save_history_charts(
    dir: &Path,
    history: &History,
    reference: &[ReferencePoint],
    state_bounds: &StateBounds,
    control_bounds: &ControlBounds,
) -> MpcResult<()> {
    fs::create_dir_all(dir)?;
    let charts = [
        ("states.png", state_chart(history, reference, state_bounds)),
        ("controls.png", control_chart(history, control_bounds)),
        ("objective.png", objective_chart(history)),
    ];
    for (name, chart) in &charts {
        let path = dir.join(name);
        chart.save_png(&path.to_string_lossy(), 800, 600)?;
    }
    Ok(())
}
