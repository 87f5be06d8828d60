//! In-memory curve store.
//!
//! This is the persistence boundary of the engine. It owns curve sets and their
//! series and applies the save semantics:
//!
//! - saving a series runs validate + fit *before* taking the write lock
//! - on success the set's series of that type is replaced in one write
//! - on any failure the store is left untouched
//!
//! Readers hold the read lock while cloning, so they observe either the fully
//! old or the fully new series, never old points with a new fit.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CurveSeries, CurveSet, EngineConfig, EvaluationResult, RawPoint, SeriesType, Units,
};
use crate::duty::evaluate;
use crate::error::CurveError;
use crate::fit::prepare_series;

/// Serializable store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub curve_sets: Vec<CurveSet>,
    #[serde(default)]
    pub last_set_id: u64,
    #[serde(default)]
    pub last_series_id: u64,
}

impl StoreSnapshot {
    fn set_mut(&mut self, id: u64) -> Result<&mut CurveSet, CurveError> {
        self.curve_sets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CurveError::NotFound { what: "curve set", id })
    }

    fn find_series(&self, id: u64) -> Option<&CurveSeries> {
        self.curve_sets
            .iter()
            .flat_map(|set| set.series.iter())
            .find(|s| s.id == id)
    }
}

#[derive(Debug, Default)]
pub struct CurveStore {
    inner: RwLock<StoreSnapshot>,
}

impl CurveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.read().clone()
    }

    pub fn create_curve_set(&self, pump_id: u64, name: impl Into<String>, units: Units) -> CurveSet {
        let mut state = self.write();
        state.last_set_id += 1;
        let now = Utc::now();
        let set = CurveSet {
            id: state.last_set_id,
            pump_id,
            name: name.into(),
            units,
            series: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.curve_sets.push(set.clone());
        tracing::info!(curve_set_id = set.id, pump_id, "created curve set");
        set
    }

    /// Rename a curve set and/or replace its unit declaration.
    /// `None` leaves the field as it is.
    pub fn update_curve_set(
        &self,
        id: u64,
        name: Option<String>,
        units: Option<Units>,
    ) -> Result<CurveSet, CurveError> {
        let mut state = self.write();
        let set = state.set_mut(id)?;
        if let Some(name) = name {
            set.name = name;
        }
        if let Some(units) = units {
            set.units = units;
        }
        set.updated_at = Utc::now();
        tracing::info!(curve_set_id = id, "updated curve set");
        Ok(set.clone())
    }

    /// Remove a curve set together with all of its series.
    pub fn delete_curve_set(&self, id: u64) -> Result<CurveSet, CurveError> {
        let mut state = self.write();
        let pos = state
            .curve_sets
            .iter()
            .position(|s| s.id == id)
            .ok_or(CurveError::NotFound { what: "curve set", id })?;
        let removed = state.curve_sets.remove(pos);
        tracing::info!(curve_set_id = id, series = removed.series.len(), "deleted curve set");
        Ok(removed)
    }

    pub fn curve_sets(&self) -> Vec<CurveSet> {
        self.read().curve_sets.clone()
    }

    pub fn curve_set(&self, id: u64) -> Result<CurveSet, CurveError> {
        self.read()
            .curve_sets
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(CurveError::NotFound { what: "curve set", id })
    }

    pub fn series(&self, id: u64) -> Result<CurveSeries, CurveError> {
        self.read()
            .find_series(id)
            .cloned()
            .ok_or(CurveError::NotFound { what: "series", id })
    }

    /// Validate, fit and persist `points` as the `series_type` curve of a set.
    ///
    /// An existing series of the same type is replaced and keeps its id.
    pub fn save_series(
        &self,
        curve_set_id: u64,
        series_type: SeriesType,
        points: &[RawPoint],
        config: &EngineConfig,
    ) -> Result<CurveSeries, CurveError> {
        // Fail fast on an unknown set before doing any work.
        self.curve_set(curve_set_id)?;

        let prepared = prepare_series(series_type, points, config)?;

        let mut state = self.write();
        let next_id = state.last_series_id + 1;
        let set = state.set_mut(curve_set_id)?;

        let existing_id = set.series_of_type(series_type).map(|s| s.id);
        let id = existing_id.unwrap_or(next_id);
        let series = CurveSeries::fitted(
            id,
            curve_set_id,
            series_type,
            prepared.points,
            &prepared.model,
            prepared.warnings,
        );

        set.series.retain(|s| s.series_type != series_type);
        set.series.push(series.clone());
        set.series.sort_by_key(|s| s.series_type);
        set.updated_at = series.updated_at;

        if existing_id.is_none() {
            state.last_series_id = next_id;
        }

        tracing::info!(
            curve_set_id,
            series_id = id,
            series_type = %series_type,
            points = series.points.len(),
            replaced = existing_id.is_some(),
            "saved series"
        );
        Ok(series)
    }

    pub fn delete_series(&self, id: u64) -> Result<CurveSeries, CurveError> {
        let mut state = self.write();
        for set in state.curve_sets.iter_mut() {
            if let Some(pos) = set.series.iter().position(|s| s.id == id) {
                let removed = set.series.remove(pos);
                set.updated_at = Utc::now();
                tracing::info!(curve_set_id = set.id, series_id = id, "deleted series");
                return Ok(removed);
            }
        }
        Err(CurveError::NotFound { what: "series", id })
    }

    /// Evaluate a stored series at a duty point.
    pub fn evaluate(
        &self,
        series_id: u64,
        flow: f64,
        target: Option<f64>,
        config: &EngineConfig,
    ) -> Result<EvaluationResult, CurveError> {
        let series = self.series(series_id)?;
        evaluate(&series, flow, target, config)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
