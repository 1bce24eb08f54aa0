//! Declarative option records handed to the driver.
//!
//! The records describe the desired state of the grid, run and export dialogs;
//! how that state is applied lives in `crate::driver`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Width of the metric selector entries in the Run Options and Output Setup dialogs.
pub const METRIC_TOKEN_WIDTH: usize = 6;

/// Upper-case `raw` and pad it with spaces to the selector width.
///
/// The combo boxes match entries by exact text, and the tool lists its metrics
/// as six-character, space-padded tokens (`"DNL   "`, `"LAMAX "`).
pub fn normalize_metric_token(raw: &str) -> String {
    format!(
        "{:<width$}",
        raw.trim().to_uppercase(),
        width = METRIC_TOKEN_WIDTH
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridType {
    Location,
    Contour,
    Standard,
    Detailed,
}

impl GridType {
    /// Text shown by the grid type combo box.
    pub fn label(self) -> &'static str {
        match self {
            GridType::Location => "Location",
            GridType::Contour => "Contour",
            GridType::Standard => "Standard",
            GridType::Detailed => "Detailed",
        }
    }

    /// Contour, standard and detailed grids are placed with origin, extent and rotation.
    pub fn has_extent(self) -> bool {
        matches!(
            self,
            GridType::Contour | GridType::Standard | GridType::Detailed
        )
    }

    /// Standard and detailed grids additionally carry an id and point counts.
    pub fn has_points(self) -> bool {
        matches!(self, GridType::Standard | GridType::Detailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coordinates {
    #[serde(rename = "X/Y")]
    XY,
    /// Accepted but not applied: the tool's lat/long fields are never populated.
    #[serde(rename = "Lat/Long")]
    LatLong,
}

/// Grid threshold. The dialog offers the two as radio buttons, so only one is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Absolute threshold in dB.
    Fixed(f64),
    /// Ambient + delta, in dB.
    Relative(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSetup {
    pub grid_type: GridType,
    pub grid_id: Option<String>,
    pub coordinates: Coordinates,
    pub x: f64,
    pub y: f64,
    pub i: f64,
    pub j: f64,
    pub nb_pts_i: u32,
    pub nb_pts_j: u32,
    pub grid_rotation_angle: f64,
    pub threshold: Threshold,
    /// Hours; `None` leaves "Do Percent of Time" unticked.
    pub do_percent_of_time: Option<f64>,
}

impl Default for GridSetup {
    fn default() -> Self {
        Self {
            grid_type: GridType::Location,
            grid_id: None,
            coordinates: Coordinates::XY,
            x: -8.0,
            y: -8.0,
            i: 16.0,
            j: 16.0,
            nb_pts_i: 2,
            nb_pts_j: 2,
            grid_rotation_angle: 0.0,
            threshold: Threshold::Fixed(85.0),
            do_percent_of_time: None,
        }
    }
}

impl GridSetup {
    pub fn fixed_threshold(&self) -> Option<f64> {
        match self.threshold {
            Threshold::Fixed(db) => Some(db),
            Threshold::Relative(_) => None,
        }
    }

    pub fn relative_threshold(&self) -> Option<f64> {
        match self.threshold {
            Threshold::Relative(db) => Some(db),
            Threshold::Fixed(_) => None,
        }
    }

    /// Check the fields the grid type requires.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_type.has_points() {
            match self.grid_id.as_deref() {
                Some(id) if !id.trim().is_empty() => {}
                _ => {
                    return Err(format!(
                        "{} grid requires a grid id",
                        self.grid_type.label()
                    ))
                }
            }
            if self.nb_pts_i == 0 || self.nb_pts_j == 0 {
                return Err(format!(
                    "{} grid requires positive point counts (got {} x {})",
                    self.grid_type.label(),
                    self.nb_pts_i,
                    self.nb_pts_j
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunType {
    #[serde(rename = "Single-Metric")]
    SingleMetric,
    #[serde(rename = "Multi-Metric")]
    MultiMetric,
    #[serde(rename = "Flight-Path-Only")]
    FlightPathOnly,
}

impl RunType {
    pub fn label(self) -> &'static str {
        match self {
            RunType::SingleMetric => "Single-Metric",
            RunType::MultiMetric => "Multi-Metric",
            RunType::FlightPathOnly => "Flight-Path-Only",
        }
    }
}

/// Noise metrics known to the tool, in the order its Run Options dialog lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NoiseMetric {
    Dnl,
    Cnel,
    Laeq,
    Laeqd,
    Laeqn,
    Sel,
    Lamax,
    Tala,
    Nef,
    Wecpnl,
    Epnl,
    Pnltm,
    Tapnl,
    Cexp,
    Lcmax,
    Talc,
}

impl NoiseMetric {
    pub const ALL: [NoiseMetric; 16] = [
        NoiseMetric::Dnl,
        NoiseMetric::Cnel,
        NoiseMetric::Laeq,
        NoiseMetric::Laeqd,
        NoiseMetric::Laeqn,
        NoiseMetric::Sel,
        NoiseMetric::Lamax,
        NoiseMetric::Tala,
        NoiseMetric::Nef,
        NoiseMetric::Wecpnl,
        NoiseMetric::Epnl,
        NoiseMetric::Pnltm,
        NoiseMetric::Tapnl,
        NoiseMetric::Cexp,
        NoiseMetric::Lcmax,
        NoiseMetric::Talc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NoiseMetric::Dnl => "DNL",
            NoiseMetric::Cnel => "CNEL",
            NoiseMetric::Laeq => "LAEQ",
            NoiseMetric::Laeqd => "LAEQD",
            NoiseMetric::Laeqn => "LAEQN",
            NoiseMetric::Sel => "SEL",
            NoiseMetric::Lamax => "LAMAX",
            NoiseMetric::Tala => "TALA",
            NoiseMetric::Nef => "NEF",
            NoiseMetric::Wecpnl => "WECPNL",
            NoiseMetric::Epnl => "EPNL",
            NoiseMetric::Pnltm => "PNLTM",
            NoiseMetric::Tapnl => "TAPNL",
            NoiseMetric::Cexp => "CEXP",
            NoiseMetric::Lcmax => "LCMAX",
            NoiseMetric::Talc => "TALC",
        }
    }

    /// Selector token, e.g. `"SEL   "`.
    pub fn token(self) -> String {
        normalize_metric_token(self.name())
    }
}

impl fmt::Display for NoiseMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        NoiseMetric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown noise metric: {s:?}"))
    }
}

impl TryFrom<String> for NoiseMetric {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoiseMetric> for String {
    fn from(value: NoiseMetric) -> Self {
        value.name().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub run_type: RunType,
    pub noise_metric: NoiseMetric,
    pub do_terrain: bool,
    pub lateral_attenuation: String,
    pub use_bank_angle: bool,
    pub do_contours: bool,
    pub use_boundary_file: bool,
    /// Fixed grid when true, recursive grid otherwise.
    pub fixed_grid: bool,
    /// Within a fixed grid: fixed spacing when true, refinement otherwise.
    pub fixed_spacing: bool,
    pub spacing: f64,
    pub refinement: u32,
    pub tolerance: f64,
    pub low_cutoff: f64,
    pub high_cutoff: f64,
    pub do_population_points: bool,
    pub do_location_points: bool,
    pub do_standard_grids: bool,
    pub do_detailed_grids: bool,
    pub save_all_flights: bool,
    /// Metrics ticked in the "calculate metrics" checkbox group.
    pub include_metrics: BTreeSet<NoiseMetric>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_type: RunType::SingleMetric,
            noise_metric: NoiseMetric::Lamax,
            do_terrain: false,
            lateral_attenuation: "All-Soft-Ground".to_string(),
            use_bank_angle: false,
            do_contours: false,
            use_boundary_file: false,
            fixed_grid: true,
            fixed_spacing: true,
            spacing: 1000.0,
            refinement: 4,
            tolerance: 0.25,
            low_cutoff: 55.0,
            high_cutoff: 85.0,
            do_population_points: false,
            do_location_points: false,
            do_standard_grids: false,
            do_detailed_grids: false,
            save_all_flights: false,
            include_metrics: BTreeSet::new(),
        }
    }
}

impl RunOptions {
    pub fn noise_metric_token(&self) -> String {
        self.noise_metric.token()
    }

    pub fn includes(&self, metric: NoiseMetric) -> bool {
        self.include_metrics.contains(&metric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportUnits {
    #[default]
    Feet,
    Meters,
}

impl ExportUnits {
    pub fn label(self) -> &'static str {
        match self {
            ExportUnits::Feet => "feet",
            ExportUnits::Meters => "meters",
        }
    }
}

/// One export the driver knows how to produce, in the order `export_output` runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    OutputGraphics,
    ContourPoints,
    ContourAreaAndPop,
    AreaContourCoverage,
    StandardGrids,
    DetailedGrids,
    NoiseAtPopPoints,
    NoiseAtLocPoints,
    FlightPathReport,
}

impl ExportKind {
    pub const ALL: [ExportKind; 9] = [
        ExportKind::OutputGraphics,
        ExportKind::ContourPoints,
        ExportKind::ContourAreaAndPop,
        ExportKind::AreaContourCoverage,
        ExportKind::StandardGrids,
        ExportKind::DetailedGrids,
        ExportKind::NoiseAtPopPoints,
        ExportKind::NoiseAtLocPoints,
        ExportKind::FlightPathReport,
    ];
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub output_graphics: bool,
    pub contour_points: bool,
    pub contour_area_and_pop: bool,
    pub area_contour_coverage: bool,
    pub standard_grids: bool,
    pub detailed_grids: bool,
    pub noise_at_pop_points: bool,
    pub noise_at_loc_points: bool,
    pub flight_path_report: bool,
    /// File-type selector text for tabular exports; `None` keeps the dialog's current choice.
    pub file_type: Option<String>,
    pub graphics_units: ExportUnits,
}

impl ExportOptions {
    pub fn is_enabled(&self, kind: ExportKind) -> bool {
        match kind {
            ExportKind::OutputGraphics => self.output_graphics,
            ExportKind::ContourPoints => self.contour_points,
            ExportKind::ContourAreaAndPop => self.contour_area_and_pop,
            ExportKind::AreaContourCoverage => self.area_contour_coverage,
            ExportKind::StandardGrids => self.standard_grids,
            ExportKind::DetailedGrids => self.detailed_grids,
            ExportKind::NoiseAtPopPoints => self.noise_at_pop_points,
            ExportKind::NoiseAtLocPoints => self.noise_at_loc_points,
            ExportKind::FlightPathReport => self.flight_path_report,
        }
    }

    /// Enabled exports in execution order.
    pub fn kinds(&self) -> Vec<ExportKind> {
        ExportKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}
