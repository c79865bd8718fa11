//! Regions are independent economies, each with its own sectors and markets.
use crate::graph::order_sectors;
use crate::id::{IDCollection, define_id_getter, define_id_type};
use crate::market::Market;
use crate::period::{ModelTime, PeriodVec};
use crate::sector::Sector;
use crate::visitor::ModelVisitor;
use anyhow::{Context, Result, ensure};
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashSet;

define_id_type! {RegionID}

/// The kind of economy modelled for a region
#[derive(PartialEq, Eq, Debug, Clone, Copy, DeserializeLabeledStringEnum)]
pub enum RegionKind {
    /// Only the energy system is modelled
    #[string = "pe"]
    PartialEquilibrium,
    /// The wider economy is modelled, so the value of output is also tracked
    #[string = "ge"]
    GeneralEquilibrium,
}

/// Represents a region with its sectors and markets
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// A unique identifier for a region (e.g. "GBR").
    pub id: RegionID,
    /// A text description of the region (e.g. "United Kingdom").
    pub description: String,
    /// The kind of economy modelled
    pub kind: RegionKind,
    /// Market prices, supplies and demands
    pub market: Market,
    sectors: Vec<Sector>,
    carbon_tax: PeriodVec<f64>,
    output_value: PeriodVec<f64>,
}
define_id_getter! {Region, RegionID}

impl Region {
    /// Create a new region.
    ///
    /// Sectors are stored in calculation order, so that every sector is calculated before the
    /// sectors supplying its fuels.
    pub fn new(
        id: RegionID,
        description: String,
        kind: RegionKind,
        sectors: Vec<Sector>,
        time: &ModelTime,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for sector in &sectors {
            ensure!(
                sector.region_id == id,
                "Sector {} belongs to region {}, not {id}",
                sector.id,
                sector.region_id
            );
            ensure!(
                seen.insert(&sector.id),
                "Duplicate sector {} in region {id}",
                sector.id
            );
        }
        let sectors = order_sectors(sectors).with_context(|| format!("Invalid region {id}"))?;

        Ok(Self {
            id,
            description,
            kind,
            market: Market::default(),
            sectors,
            carbon_tax: PeriodVec::new(time, 0.0),
            output_value: PeriodVec::new(time, 0.0),
        })
    }

    /// The region's sectors, in calculation order
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Set the carbon tax for every period
    pub fn set_carbon_tax(&mut self, tax: &PeriodVec<f64>) {
        self.carbon_tax = tax.clone();
    }

    /// The carbon tax in the given period
    pub fn carbon_tax(&self, period: usize) -> f64 {
        self.carbon_tax[period]
    }

    /// Reset the calculated market quantities for the period
    pub fn init_calc(&mut self, period: usize) {
        self.market.clear_period(period);
    }

    /// Calculate every sector in the region for the period.
    ///
    /// Final demands are placed on the market first. Each sector then meets the demand for its good
    /// and adds the fuel consumption of its technologies to the demand for those goods.
    pub fn calc(&mut self, period: usize, calibrate: bool) -> Result<()> {
        self.market.clear_period(period);
        for sector in &self.sectors {
            self.market
                .demands
                .add(&sector.good, period, sector.final_demand[period]);
        }

        let tax = self.carbon_tax[period];
        for sector in &mut self.sectors {
            sector.apply_carbon_tax(period, tax);
            let demand = self
                .market
                .demands
                .get(&sector.good, period)
                .unwrap_or_default();
            sector
                .calc(period, demand, &self.market.prices, calibrate)
                .with_context(|| {
                    format!("Failed to calculate sector {} in region {}", sector.id, self.id)
                })?;

            for (fuel, input) in sector.fuel_inputs(period) {
                self.market.demands.add(fuel, period, input);
            }
            self.market
                .supplies
                .add(&sector.good, period, sector.output(period));
        }

        if self.kind == RegionKind::GeneralEquilibrium {
            self.output_value[period] = self
                .sectors
                .iter()
                .map(|sector| sector.price(period) * sector.output(period))
                .sum();
        }

        Ok(())
    }

    /// The value of the region's output, for general-equilibrium regions
    pub fn output_value(&self, period: usize) -> Option<f64> {
        (self.kind == RegionKind::GeneralEquilibrium).then(|| self.output_value[period])
    }

    /// The total emissions of the region
    pub fn emissions(&self, period: usize) -> f64 {
        self.sectors.iter().map(|s| s.emissions(period)).sum()
    }

    /// Check the calibration of every sector, without stopping at the first failure
    pub fn is_all_calibrated(&self, period: usize, accuracy: f64, print_warnings: bool) -> bool {
        self.sectors
            .iter()
            .map(|s| s.is_all_calibrated(period, accuracy, print_warnings))
            .fold(true, |all_ok, ok| all_ok && ok)
    }

    /// Finalise the period
    pub fn post_calc(&mut self, period: usize, time: &ModelTime) {
        for sector in &mut self.sectors {
            sector.post_calc(period, time);
        }
    }

    /// Visit the region and then each of its sectors
    pub fn accept(&self, visitor: &mut dyn ModelVisitor, period: usize) {
        visitor.visit_region(self, period);
        for sector in &self.sectors {
            sector.accept(visitor, period);
        }
    }
}

/// Parse a string of regions separated by semicolons into a set of RegionIDs.
///
/// The string can be either "all" (case-insensitive), a single region, or a semicolon-separated
/// list of regions (e.g. "GBR;FRA;USA" or "GBR; FRA; USA")
pub fn parse_region_str(s: &str, region_ids: &HashSet<RegionID>) -> Result<HashSet<RegionID>> {
    let s = s.trim();
    ensure!(!s.is_empty(), "No regions provided");

    if s.eq_ignore_ascii_case("all") {
        return Ok(region_ids.clone());
    }

    s.split(';')
        .map(|id| region_ids.get_id_by_str(id.trim()))
        .collect()
}
