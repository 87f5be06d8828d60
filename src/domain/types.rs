//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during validation/fitting/evaluation
//! - exported to JSON (the persisted series shape)
//! - reloaded later for evaluation or plotting

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// Which performance curve a series describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Head,
    Efficiency,
    Power,
}

impl SeriesType {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesType::Head => "head",
            SeriesType::Efficiency => "efficiency",
            SeriesType::Power => "power",
        }
    }
}

impl std::fmt::Display for SeriesType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a raw input row.
///
/// Pasted or imported data is loosely typed: a cell may hold a number or text
/// that failed to parse. Unparsed text is carried through normalization so
/// validation can point at the exact offending row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Unparsed(String),
}

impl RawField {
    /// Parse a text cell. Non-finite results (`NaN`, `inf`) stay unparsed.
    pub fn parse(text: &str) -> RawField {
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => RawField::Number(v),
            _ => RawField::Unparsed(trimmed.to_string()),
        }
    }

    /// Re-attempt a numeric parse of unparsed text; numbers pass through.
    pub fn normalize(self) -> RawField {
        match self {
            RawField::Number(v) if v.is_finite() => RawField::Number(v),
            RawField::Number(v) => RawField::Unparsed(v.to_string()),
            RawField::Unparsed(s) => RawField::parse(&s),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawField::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for RawField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawField::Number(v) => write!(f, "{v}"),
            RawField::Unparsed(s) => write!(f, "'{s}'"),
        }
    }
}

/// A `(flow, value)` input pair as submitted (before normalization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPair {
    pub flow: RawField,
    pub value: RawField,
}

/// A normalized candidate point. Fields may still be unparsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub flow: RawField,
    pub value: RawField,
    /// Position in the original input.
    pub sequence: usize,
}

/// A numeric curve point accepted into a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub flow: f64,
    pub value: f64,
    /// Original input order (audit/display only; fitting sorts by flow).
    pub sequence: usize,
}

/// Machine-readable validation issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    NonNumeric,
    NegativeFlow,
    TooFewPoints,
    DuplicateFlow,
    #[serde(rename = "EFF_LT_0")]
    EffLt0,
    NonMonotonicHead,
    NegativeHead,
    #[serde(rename = "EFF_GT_100")]
    EffGt100,
    PowerDecreasing,
    FewPoints,
    NarrowRange,
    LowR2,
    UndefinedR2,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::NonNumeric => "NON_NUMERIC",
            IssueCode::NegativeFlow => "NEGATIVE_FLOW",
            IssueCode::TooFewPoints => "TOO_FEW_POINTS",
            IssueCode::DuplicateFlow => "DUPLICATE_FLOW",
            IssueCode::EffLt0 => "EFF_LT_0",
            IssueCode::NonMonotonicHead => "NON_MONOTONIC_HEAD",
            IssueCode::NegativeHead => "NEGATIVE_HEAD",
            IssueCode::EffGt100 => "EFF_GT_100",
            IssueCode::PowerDecreasing => "POWER_DECREASING",
            IssueCode::FewPoints => "FEW_POINTS",
            IssueCode::NarrowRange => "NARROW_RANGE",
            IssueCode::LowR2 => "LOW_R2",
            IssueCode::UndefinedR2 => "UNDEFINED_R2",
        }
    }
}

/// A structured blocking error or warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    /// `sequence` numbers of the points involved (empty for set-level issues).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<usize>,
}

impl Issue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            indices: Vec::new(),
        }
    }

    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = indices;
        self
    }
}

/// Output of a validation dry-run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub blocking_errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    /// Numeric points sorted by ascending flow, `sequence` untouched.
    pub normalized_points: Vec<CurvePoint>,
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        self.blocking_errors.is_empty()
    }
}

/// Flow domain covered by the points a model was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub min_q: f64,
    pub max_q: f64,
}

impl DataRange {
    /// Min/max flow of `points`; `None` for an empty slice.
    pub fn of_points(points: &[CurvePoint]) -> Option<DataRange> {
        let first = points.first()?;
        let mut range = DataRange {
            min_q: first.flow,
            max_q: first.flow,
        };
        for p in &points[1..] {
            range.min_q = range.min_q.min(p.flow);
            range.max_q = range.max_q.max(p.flow);
        }
        Some(range)
    }

    /// Closed-interval membership; the endpoints are interpolation.
    pub fn contains(&self, flow: f64) -> bool {
        self.min_q <= flow && flow <= self.max_q
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Polynomial coefficients, highest degree first.
    pub coeffs: Vec<f64>,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Coefficient of determination. `None` when undefined (constant values
    /// that the model does not reproduce exactly).
    pub r2: Option<f64>,
    pub rmse: f64,
    pub n: usize,
}

/// A fitted polynomial with its domain of interpolation confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FitModel {
    pub degree: usize,
    pub coeffs: Vec<f64>,
    pub quality: FitQuality,
    pub data_range: DataRange,
}

const MODEL_TYPE_PREFIX: &str = "polynomial_degree_";

impl FitModel {
    pub fn model_type(&self) -> String {
        format!("{MODEL_TYPE_PREFIX}{}", self.degree)
    }

    /// Parse a `polynomial_degree_N` model type string into `N`.
    pub fn parse_model_type(model_type: &str) -> Option<usize> {
        model_type.strip_prefix(MODEL_TYPE_PREFIX)?.parse().ok()
    }
}

/// Unit declaration of a curve set. Free-form strings, e.g. `gpm`, `ft`, `%`, `hp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Units {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
}

impl Units {
    pub fn for_series(&self, series_type: SeriesType) -> Option<&str> {
        match series_type {
            SeriesType::Head => self.head.as_deref(),
            SeriesType::Efficiency => self.efficiency.as_deref(),
            SeriesType::Power => self.power.as_deref(),
        }
    }
}

/// One typed performance curve: its points and (when fitted) its model.
///
/// Field names match the persisted JSON shape. The fit fields are either all
/// present or all absent; construct fitted series with [`CurveSeries::fitted`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSeries {
    pub id: u64,
    pub curve_set_id: u64,
    #[serde(rename = "type")]
    pub series_type: SeriesType,
    pub points: Vec<CurvePoint>,
    #[serde(default)]
    pub fit_model_type: Option<String>,
    #[serde(default)]
    pub fit_params: Option<FitParams>,
    #[serde(default)]
    pub fit_quality: Option<FitQuality>,
    #[serde(default)]
    pub data_range: Option<DataRange>,
    #[serde(default)]
    pub validation_warnings: Vec<Issue>,
    pub updated_at: DateTime<Utc>,
}

impl CurveSeries {
    /// Build a series from an accepted point set and the model fitted on it.
    pub fn fitted(
        id: u64,
        curve_set_id: u64,
        series_type: SeriesType,
        points: Vec<CurvePoint>,
        model: &FitModel,
        validation_warnings: Vec<Issue>,
    ) -> Self {
        Self {
            id,
            curve_set_id,
            series_type,
            points,
            fit_model_type: Some(model.model_type()),
            fit_params: Some(FitParams {
                coeffs: model.coeffs.clone(),
            }),
            fit_quality: Some(model.quality),
            data_range: Some(model.data_range),
            validation_warnings,
            updated_at: Utc::now(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_model_type.is_some()
    }

    /// Reassemble the typed model from the persisted fit fields.
    pub fn fit_model(&self) -> Result<FitModel, CurveError> {
        let Some(model_type) = self.fit_model_type.as_deref() else {
            return Err(CurveError::NotFitted {
                series_type: self.series_type,
            });
        };
        let degree = FitModel::parse_model_type(model_type)
            .ok_or_else(|| CurveError::InvalidModel(format!("unsupported model type '{model_type}'")))?;
        let params = self
            .fit_params
            .as_ref()
            .ok_or_else(|| CurveError::InvalidModel("missing fit_params".to_string()))?;
        if params.coeffs.len() != degree + 1 {
            return Err(CurveError::InvalidModel(format!(
                "{model_type} expects {} coefficients, found {}",
                degree + 1,
                params.coeffs.len()
            )));
        }
        if params.coeffs.iter().any(|c| !c.is_finite()) {
            return Err(CurveError::InvalidModel("non-finite coefficient".to_string()));
        }
        let data_range = self
            .data_range
            .ok_or_else(|| CurveError::InvalidModel("missing data_range".to_string()))?;
        if !(data_range.min_q <= data_range.max_q) {
            return Err(CurveError::InvalidModel(format!(
                "data_range min_q={} exceeds max_q={}",
                data_range.min_q, data_range.max_q
            )));
        }
        let quality = self
            .fit_quality
            .ok_or_else(|| CurveError::InvalidModel("missing fit_quality".to_string()))?;

        Ok(FitModel {
            degree,
            coeffs: params.coeffs.clone(),
            quality,
            data_range,
        })
    }
}

/// A named collection of curves for one pump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub id: u64,
    pub pump_id: u64,
    pub name: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub series: Vec<CurveSeries>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CurveSet {
    pub fn series_of_type(&self, series_type: SeriesType) -> Option<&CurveSeries> {
        self.series.iter().find(|s| s.series_type == series_type)
    }
}

/// Residual of a predicted head against a target head.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    /// `predicted - target`.
    pub value: f64,
    pub pass: bool,
    /// Largest accepted `|value|` under the configured tolerance.
    pub allowed: f64,
}

/// Output of a duty-point evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub flow: f64,
    pub predictions: BTreeMap<SeriesType, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residuals: Option<Residual>,
    pub warnings: Vec<String>,
    pub extrapolation: bool,
}

/// Evenly spaced samples of a fitted curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub flow: Vec<f64>,
    pub value: Vec<f64>,
}

/// How the duty-point residual tolerance is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceMode {
    /// `|residual| <= tolerance`, in head units.
    Absolute,
    /// `|residual| <= tolerance * |target|`.
    Relative,
}

/// Engine tunables. Passed explicitly to every operation that needs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Highest polynomial degree the fitter may use.
    pub max_degree: usize,
    /// R² below this surfaces as a warning.
    pub min_r2: f64,
    pub tolerance: f64,
    pub tolerance_mode: ToleranceMode,
    /// `(max_q - min_q) / max_q` below this triggers `NARROW_RANGE`.
    pub min_span_ratio: f64,
    /// Relative epsilon for duplicate-flow detection.
    pub duplicate_eps: f64,
    /// Fewer points than this triggers `FEW_POINTS`.
    pub min_recommended_points: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_degree: 2,
            min_r2: 0.9,
            tolerance: 0.05,
            tolerance_mode: ToleranceMode::Relative,
            min_span_ratio: 0.1,
            duplicate_eps: 1e-9,
            min_recommended_points: 4,
        }
    }
}

impl EngineConfig {
    /// Reject settings that would make the engine misbehave.
    pub fn check(&self) -> Result<(), CurveError> {
        if self.max_degree == 0 {
            return Err(CurveError::InvalidArgument("max_degree must be >= 1".to_string()));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(CurveError::InvalidArgument(format!(
                "tolerance must be finite and >= 0 (got {})",
                self.tolerance
            )));
        }
        if !(self.duplicate_eps.is_finite() && self.duplicate_eps >= 0.0) {
            return Err(CurveError::InvalidArgument(format!(
                "duplicate_eps must be finite and >= 0 (got {})",
                self.duplicate_eps
            )));
        }
        if !self.min_r2.is_finite() || !self.min_span_ratio.is_finite() {
            return Err(CurveError::InvalidArgument(
                "min_r2 and min_span_ratio must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
