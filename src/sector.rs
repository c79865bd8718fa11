//! Sectors produce a single good and allocate its production between subsectors.
use crate::calibration::{fixed_supply_scale_factor, recalibrate_share_weights};
use crate::id::{define_id_getter, define_id_type};
use crate::market::{GoodID, MarketQuantities};
use crate::period::{ModelTime, PeriodVec};
use crate::region::RegionID;
use crate::share::{SHARE_TOLERANCE, allocate_shares};
use crate::subsector::Subsector;
use crate::visitor::ModelVisitor;
use anyhow::{Context, Result};
use log::warn;

define_id_type! {SectorID}

/// A sector supplying one good in a region
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    /// A unique identifier for the sector within its region
    pub id: SectorID,
    /// The region the sector belongs to
    pub region_id: RegionID,
    /// The good produced by the sector
    pub good: GoodID,
    /// The subsectors competing to supply the good
    pub subsectors: Vec<Subsector>,
    /// Exogenous final demand for the good
    pub final_demand: PeriodVec<f64>,
    demand: PeriodVec<f64>,
    price: PeriodVec<f64>,
    output: PeriodVec<f64>,
}
define_id_getter! {Sector, SectorID}

impl Sector {
    /// Create a new sector with no subsectors and no final demand.
    ///
    /// The good produced by the sector has the same name as the sector.
    pub fn new(id: SectorID, region_id: RegionID, time: &ModelTime) -> Self {
        let good = GoodID::new(&id.0);
        Self {
            id,
            region_id,
            good,
            subsectors: Vec::new(),
            final_demand: PeriodVec::new(time, 0.0),
            demand: PeriodVec::new(time, 0.0),
            price: PeriodVec::new(time, 0.0),
            output: PeriodVec::new(time, 0.0),
        }
    }

    /// Apply a carbon tax to every technology in the sector
    pub fn apply_carbon_tax(&mut self, period: usize, tax: f64) {
        for subsector in &mut self.subsectors {
            subsector.apply_carbon_tax(period, tax);
        }
    }

    /// Calculate the sector for a period.
    ///
    /// # Arguments
    ///
    /// * `period` - The period to calculate
    /// * `demand` - Total demand for the sector's good (final and intermediate)
    /// * `prices` - Market prices of the fuels consumed by the sector's technologies
    /// * `calibrate` - Whether to reconcile shares with calibration data
    pub fn calc(
        &mut self,
        period: usize,
        demand: f64,
        prices: &MarketQuantities,
        calibrate: bool,
    ) -> Result<()> {
        self.demand[period] = demand;
        for subsector in &mut self.subsectors {
            subsector.calc_costs(period, prices)?;
            subsector.calc_tech_shares(period)?;
            subsector.calc_price(period);
        }

        self.calc_shares(period, demand, calibrate)?;

        let output = demand.max(0.0);
        for subsector in &mut self.subsectors {
            let share = subsector.share(period);
            subsector.set_output(period, share * output, calibrate)?;
        }

        self.output[period] = self.subsectors.iter().map(|s| s.output(period)).sum();
        self.price[period] = if self.output[period] > 0.0 {
            self.subsectors
                .iter()
                .map(|s| s.price(period) * s.output(period))
                .sum::<f64>()
                / self.output[period]
        } else {
            self.subsectors
                .iter()
                .map(|s| s.price(period) * s.share(period))
                .sum()
        };

        Ok(())
    }

    /// Allocate the sector's output between its subsectors.
    ///
    /// Subsectors whose technologies all have a fixed output take the share of demand their fixed
    /// supply covers. With calibration on, subsectors with calibration data have their share
    /// weights adjusted to reproduce their calibration output and, if every subsector is either
    /// fixed or calibrated, fixed supplies are scaled so that the total matches demand.
    pub fn calc_shares(&mut self, period: usize, demand: f64, calibrate: bool) -> Result<()> {
        if demand > 0.0 {
            self.scale_fixed_supplies(period, demand, calibrate);
        }

        let mut options: Vec<_> = self
            .subsectors
            .iter()
            .map(|subsector| {
                let mut option = subsector.share_option(period);
                if demand > 0.0 && subsector.all_output_fixed(period) {
                    option.fixed_share = Some(subsector.fixed_supply(period) / demand);
                }
                option
            })
            .collect();

        let targets: Vec<_> = self
            .subsectors
            .iter()
            .map(|subsector| {
                subsector
                    .calibration_target(period)
                    .filter(|_| calibrate && demand > 0.0)
                    .map(|target| (target / demand).min(1.0))
            })
            .collect();
        let any_targets = targets.iter().any(Option::is_some);

        let allocation = if any_targets {
            recalibrate_share_weights(&mut options, &targets)
        } else {
            allocate_shares(&options)
        }
        .with_context(|| {
            format!(
                "Failed to allocate subsector shares for sector {} in region {}",
                self.id, self.region_id
            )
        })?;
        if let Some(fallback) = allocation.fallback {
            warn!(
                "Subsector shares for sector {} in region {} (period {period}): {fallback}",
                self.id, self.region_id
            );
        }

        for (i, subsector) in self.subsectors.iter_mut().enumerate() {
            subsector.set_share(period, allocation.shares[i]);
            subsector.set_cap_limit_status(period, allocation.capacity_limited[i]);
            subsector.set_share_weight(period, options[i].share_weight);
            subsector.set_calibration_status(period, targets[i].is_some());
        }

        Ok(())
    }

    /// Scale the supply of all-fixed subsectors so that it is consistent with `demand`.
    ///
    /// Fixed supply exceeding demand is scaled down to meet it. When calibrating and every
    /// subsector is either fixed or calibrated, fixed supply is scaled to fill the demand left
    /// over by the calibrated subsectors.
    fn scale_fixed_supplies(&mut self, period: usize, demand: f64, calibrate: bool) {
        let fixed: f64 = self
            .subsectors
            .iter()
            .filter(|s| s.all_output_fixed(period))
            .map(|s| s.fixed_supply(period))
            .sum();
        if fixed <= 0.0 {
            return;
        }

        let all_fixed_or_calibrated = self
            .subsectors
            .iter()
            .all(|s| s.all_output_fixed(period) || s.do_calibration(period));
        let factor = if calibrate && all_fixed_or_calibrated {
            let calibrated = self
                .subsectors
                .iter()
                .filter_map(|s| s.calibration_target(period))
                .sum();
            fixed_supply_scale_factor(demand, calibrated, fixed)
        } else if fixed > demand * (1.0 + SHARE_TOLERANCE) {
            warn!(
                "Fixed supply of {fixed} for sector {} in region {} exceeds demand of {demand} \
                in period {period}; scaling it down",
                self.id, self.region_id
            );
            demand / fixed
        } else {
            return;
        };

        for subsector in &mut self.subsectors {
            if subsector.all_output_fixed(period) {
                subsector.scale_fixed_supply(period, factor);
            }
        }
    }

    /// The fuels consumed by the sector's technologies and the amount of each
    pub fn fuel_inputs(&self, period: usize) -> impl Iterator<Item = (&GoodID, f64)> {
        self.subsectors
            .iter()
            .flat_map(|subsector| &subsector.technologies)
            .filter_map(move |tech| Some((tech.fuel.as_ref()?, tech.input(period))))
    }

    /// The goods consumed by any technology in the sector, in any period
    pub fn fuels(&self) -> impl Iterator<Item = &GoodID> {
        self.subsectors
            .iter()
            .flat_map(|subsector| &subsector.technologies)
            .filter_map(|tech| tech.fuel.as_ref())
    }

    /// Check the calibration of every subsector in the sector, without stopping at the first
    /// failure
    pub fn is_all_calibrated(&self, period: usize, accuracy: f64, print_warnings: bool) -> bool {
        self.subsectors
            .iter()
            .map(|s| s.check_calibration(period, accuracy, print_warnings))
            .fold(true, |all_ok, ok| all_ok && ok)
    }

    /// Total demand for the sector's good in the last calculation
    pub fn demand(&self, period: usize) -> f64 {
        self.demand[period]
    }

    /// The output-weighted price of the sector's good
    pub fn price(&self, period: usize) -> f64 {
        self.price[period]
    }

    /// The total output of the sector
    pub fn output(&self, period: usize) -> f64 {
        self.output[period]
    }

    /// The total emissions of the sector
    pub fn emissions(&self, period: usize) -> f64 {
        self.subsectors.iter().map(|s| s.emissions(period)).sum()
    }

    /// Finalise the period
    pub fn post_calc(&mut self, period: usize, time: &ModelTime) {
        for subsector in &mut self.subsectors {
            subsector.post_calc(period, time);
        }
    }

    /// Visit the sector and then each of its subsectors
    pub fn accept(&self, visitor: &mut dyn ModelVisitor, period: usize) {
        visitor.visit_sector(self, period);
        for subsector in &self.subsectors {
            subsector.accept(visitor, period);
        }
    }
}
