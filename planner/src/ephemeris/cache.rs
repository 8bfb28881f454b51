//! Per-pass memoization of oracle lookups.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use qtty::{Degrees, Hours};

use super::{HorizonCrossing, PositionOracle};
use crate::core::domain::{HorizontalPosition, Source};
use crate::core::error::OracleError;
use crate::time::ModifiedJulianDate;

/// Caches positions keyed by source name and instant.
///
/// One cache lives for one refinement pass; rise and set queries pass
/// straight through.
pub struct PositionCache<'a> {
    inner: &'a dyn PositionOracle,
    positions: RefCell<HashMap<(String, u64), HorizontalPosition>>,
    hits: Cell<usize>,
}

impl<'a> PositionCache<'a> {
    pub fn new(inner: &'a dyn PositionOracle) -> Self {
        Self {
            inner,
            positions: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.borrow().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }
}

impl PositionOracle for PositionCache<'_> {
    fn position_at(
        &self,
        source: &Source,
        at: ModifiedJulianDate,
    ) -> Result<HorizontalPosition, OracleError> {
        let key = (source.name.clone(), at.value().to_bits());
        if let Some(position) = self.positions.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(*position);
        }
        let position = self.inner.position_at(source, at)?;
        self.positions.borrow_mut().insert(key, position);
        Ok(position)
    }

    fn next_rise(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        self.inner.next_rise(source, horizon, after)
    }

    fn next_set(
        &self,
        source: &Source,
        horizon: Degrees,
        after: ModifiedJulianDate,
    ) -> Result<HorizonCrossing, OracleError> {
        self.inner.next_set(source, horizon, after)
    }

    fn sidereal_time(&self, at: ModifiedJulianDate) -> Hours {
        self.inner.sidereal_time(at)
    }
}
