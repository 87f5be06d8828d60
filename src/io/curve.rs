//! Series JSON files.
//!
//! A series file is the portable representation of one fitted curve:
//! - the persisted series (points, model type, coefficients, quality, data range)
//! - the curve set's units, when known
//! - a precomputed sample grid for quick plotting
//!
//! The grid is produced by `models::sample_curve`, so consumers never need to
//! re-implement polynomial evaluation.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CurveGrid, CurveSeries, Units};
use crate::error::{AppError, CurveError};
use crate::models::sample_curve;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesFile {
    pub tool: String,
    #[serde(default)]
    pub units: Units,
    pub series: CurveSeries,
    pub grid: CurveGrid,
}

impl SeriesFile {
    /// Bundle a fitted series with an `samples`-point grid of its curve.
    pub fn new(series: &CurveSeries, units: &Units, samples: usize) -> Result<Self, CurveError> {
        Ok(Self {
            tool: "pumpcurve".to_string(),
            units: units.clone(),
            series: series.clone(),
            grid: sample_curve(series, samples)?,
        })
    }
}

/// Write a fitted series (plus an `samples`-point grid) to JSON.
pub fn write_series_json(path: &Path, series: &CurveSeries, units: &Units, samples: usize) -> Result<(), AppError> {
    let doc = SeriesFile::new(series, units, samples)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create series JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(2, format!("Failed to write series JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurvePoint, SeriesType};
    use crate::fit::fit_polynomial;

    #[test]
    fn series_file_round_trip_keeps_model() {
        let points = vec![
            CurvePoint { flow: 0.0, value: 40.0, sequence: 0 },
            CurvePoint { flow: 50.0, value: 72.0, sequence: 1 },
            CurvePoint { flow: 100.0, value: 65.0, sequence: 2 },
        ];
        let model = fit_polynomial(&points, 2).unwrap();
        let series = CurveSeries::fitted(4, 2, SeriesType::Efficiency, points, &model, vec![]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eff.json");
        write_series_json(&path, &series, &Units::default(), 11).unwrap();

        let doc: SeriesFile = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(doc.series.fit_model().unwrap().coeffs, model.coeffs);
        assert_eq!(doc.grid.flow.len(), 11);
        assert_eq!(doc.grid.flow[10], 100.0);
    }

    #[test]
    fn series_file_json_carries_grid() {
        let points = vec![
            CurvePoint { flow: 0.0, value: 100.0, sequence: 0 },
            CurvePoint { flow: 100.0, value: 95.0, sequence: 1 },
            CurvePoint { flow: 200.0, value: 85.0, sequence: 2 },
        ];
        let model = fit_polynomial(&points, 2).unwrap();
        let series = CurveSeries::fitted(0, 0, SeriesType::Head, points, &model, vec![]);

        let json = serde_json::to_value(SeriesFile::new(&series, &Units::default(), 5).unwrap()).unwrap();
        assert_eq!(json["series"]["type"], "head");
        assert_eq!(json["grid"]["flow"].as_array().unwrap().len(), 5);
        assert_eq!(json["grid"]["flow"][2], 100.0);
    }

    #[test]
    fn unfitted_series_has_no_file() {
        let points = vec![
            CurvePoint { flow: 0.0, value: 1.0, sequence: 0 },
            CurvePoint { flow: 1.0, value: 2.0, sequence: 1 },
        ];
        let model = fit_polynomial(&points, 1).unwrap();
        let mut series = CurveSeries::fitted(1, 1, SeriesType::Power, points, &model, vec![]);
        series.fit_model_type = None;
        assert!(matches!(
            SeriesFile::new(&series, &Units::default(), 5),
            Err(CurveError::NotFitted { .. })
        ));
    }
}
