//! The interface to a climate model, which receives emissions from the economic model.
use crate::region::RegionID;
use anyhow::Result;
use indexmap::IndexMap;
use log::info;

/// A climate model driven by regional emissions
pub trait ClimateModel: std::fmt::Debug + Send + Sync {
    /// Set the emissions of a region for a period
    fn set_emissions(&mut self, region_id: &RegionID, period: usize, emissions: f64);

    /// Run the model up to and including the period
    fn run(&mut self, period: usize) -> Result<()>;
}

/// A minimal climate model which tracks total and cumulative global emissions.
///
/// The cumulative total assumes that emissions are constant within each period.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CumulativeEmissions {
    emissions: IndexMap<(RegionID, usize), f64>,
    cumulative: Vec<f64>,
}

impl CumulativeEmissions {
    /// Global emissions for a period
    pub fn global_emissions(&self, period: usize) -> f64 {
        self.emissions
            .iter()
            .filter(|((_, p), _)| *p == period)
            .map(|(_, value)| value)
            .sum()
    }

    /// Cumulative global emissions up to and including a period, if it has been run
    pub fn cumulative_emissions(&self, period: usize) -> Option<f64> {
        self.cumulative.get(period).copied()
    }
}

impl ClimateModel for CumulativeEmissions {
    fn set_emissions(&mut self, region_id: &RegionID, period: usize, emissions: f64) {
        self.emissions.insert((region_id.clone(), period), emissions);
    }

    fn run(&mut self, period: usize) -> Result<()> {
        self.cumulative.truncate(period);
        while self.cumulative.len() <= period {
            let p = self.cumulative.len();
            let previous = self.cumulative.last().copied().unwrap_or_default();
            self.cumulative.push(previous + self.global_emissions(p));
        }
        info!(
            "Cumulative emissions to period {period}: {}",
            self.cumulative[period]
        );

        Ok(())
    }
}
