//! Model time and per-period time series.
//!
//! Every per-period quantity in the model is stored in a [`PeriodVec`], which has exactly one slot
//! per model period. The number of periods is fixed by the [`ModelTime`] that the vector was
//! created from and can never change afterwards.
use anyhow::{Result, ensure};
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// The time structure of the model: the year that each period represents
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTime {
    years: Vec<u32>,
}

impl ModelTime {
    /// Create a new [`ModelTime`] from a list of model years.
    ///
    /// Years must be non-empty, unique and in ascending order.
    pub fn new(years: Vec<u32>) -> Result<Self> {
        ensure!(!years.is_empty(), "Model must have at least one period");
        ensure!(
            years.windows(2).all(|w| w[0] < w[1]),
            "Model years must be unique and in order"
        );

        Ok(Self { years })
    }

    /// The number of periods in the model
    pub fn num_periods(&self) -> usize {
        self.years.len()
    }

    /// The year corresponding to `period`
    pub fn year(&self, period: usize) -> u32 {
        self.years[period]
    }

    /// All model years, in order
    pub fn years(&self) -> &[u32] {
        &self.years
    }

    /// Get the period index for the given year, if it is a model year
    pub fn period_of_year(&self, year: u32) -> Option<usize> {
        self.years.binary_search(&year).ok()
    }

    /// Iterate over all period indexes
    pub fn iter_periods(&self) -> std::ops::Range<usize> {
        0..self.years.len()
    }

    /// Check that `period` is a valid period index
    pub fn check_period(&self, period: usize) -> Result<()> {
        ensure!(
            period < self.num_periods(),
            "Period {period} is out of range (model has {} periods)",
            self.num_periods()
        );

        Ok(())
    }
}

/// A fixed-length series holding one value per model period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodVec<T>(Vec<T>);

impl<T: Clone> PeriodVec<T> {
    /// Create a new series for every period in `time`, with every slot set to `value`
    pub fn new(time: &ModelTime, value: T) -> Self {
        Self(vec![value; time.num_periods()])
    }

    /// Create a series from explicit values.
    ///
    /// The number of values must match the number of periods in `time`.
    pub fn from_values(time: &ModelTime, values: Vec<T>) -> Result<Self> {
        ensure!(
            values.len() == time.num_periods(),
            "Expected {} periods of data, got {}",
            time.num_periods(),
            values.len()
        );

        Ok(Self(values))
    }

    /// Set the value for every period from `start` onwards
    pub fn fill_from(&mut self, start: usize, value: T) {
        for slot in &mut self.0[start..] {
            *slot = value.clone();
        }
    }
}

impl<T> PeriodVec<T> {
    /// The number of periods in the series
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series is empty (never true for a series built from a [`ModelTime`])
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the values in period order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T> Index<usize> for PeriodVec<T> {
    type Output = T;

    fn index(&self, period: usize) -> &T {
        &self.0[period]
    }
}

impl<T> IndexMut<usize> for PeriodVec<T> {
    fn index_mut(&mut self, period: usize) -> &mut T {
        &mut self.0[period]
    }
}
