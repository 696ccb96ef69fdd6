//! Plotting helpers for highway_planner
//!
//! Collects track, path and vehicle layers and renders them onto a single
//! gnuplot axes when saved or shown.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};
use crate::common::{Path2D, PlanningError, PlanningResult, Point2D, Pose2D};
use crate::config::RoadConfig;
use crate::map::CoordinateTransform;
use std::io;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";
    pub const ORANGE: &str = "#FFA500";

    pub const LANE_EDGE: &str = BLACK;
    pub const LANE_DIVIDER: &str = GRAY;
    pub const EGO_PATH: &str = RED;
    pub const EGO: &str = BLUE;
    pub const TRAFFIC: &str = ORANGE;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
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

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::EGO_PATH, "Path")
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Layered 2D plot
pub struct Visualizer {
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Number of layers added so far
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.layers.push(Layer::Lines {
            x: path.x_coords(),
            y: path.y_coords(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        self.layers.push(Layer::Points {
            x: points.iter().map(|p| p.x).collect(),
            y: points.iter().map(|p| p.y).collect(),
            style: style.clone(),
        });
        self
    }

    /// Road edges and lane dividers, sampled every `step` meters of s
    pub fn plot_track(&mut self, transform: &CoordinateTransform, road: &RoadConfig, step: f64) -> &mut Self {
        let samples = (transform.max_s() / step).ceil().max(1.0) as usize;
        for boundary in 0..=road.num_lanes {
            let d = boundary as f64 * road.lane_width;
            let line: Path2D = (0..=samples)
                .map(|i| transform.to_cartesian(i as f64 * step, d))
                .collect::<Vec<_>>()
                .into();
            let edge = boundary == 0 || boundary == road.num_lanes;
            let style = if edge {
                PathStyle::new(colors::LANE_EDGE, if boundary == 0 { "Road edge" } else { "" })
            } else {
                PathStyle::new(colors::LANE_DIVIDER, if boundary == 1 { "Lane divider" } else { "" })
                    .with_line_width(1.0)
            };
            self.plot_path(&line, &style);
        }
        self
    }

    /// Ego position with a short heading tick
    pub fn plot_ego(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.plot_points(&[pose.position()], &PointStyle::new(colors::EGO, "Ego").with_size(size));
        let tip = Point2D::new(pose.x + 2.0 * size * pose.yaw.cos(), pose.y + 2.0 * size * pose.yaw.sin());
        self.plot_path(&vec![pose.position(), tip].into(), &PathStyle::new(colors::EGO, ""))
    }

    pub fn plot_traffic(&mut self, vehicles: &[Point2D]) -> &mut Self {
        self.plot_points(vehicles, &PointStyle::new(colors::TRAFFIC, "Traffic").with_symbol('S'))
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();
        for layer in &self.layers {
            match layer {
                Layer::Lines { x, y, style } => {
                    axes.lines(x, y, &[Caption(&style.caption), Color(&style.color), LineWidth(style.line_width)]);
                }
                Layer::Points { x, y, style } => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }
        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }

    /// Render and save to a PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> PlanningResult<()> {
        self.render()
            .save_to_png(path, width, height)
            .map_err(|e| PlanningError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }

    /// Render and open an interactive window
    pub fn show(&self) -> PlanningResult<()> {
        self.render()
            .show()
            .map(|_| ())
            .map_err(|e| PlanningError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
