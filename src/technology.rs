//! Technologies are the leaves of the model tree: they report a cost and produce output.
use crate::id::{define_id_getter, define_id_type};
use crate::market::GoodID;
use crate::calibration::propagate_calibrated_share_weight;
use crate::period::{ModelTime, PeriodVec};
use crate::share::ShareOption;

define_id_type! {TechnologyID}

/// The logit exponent used when none is given in the input data
pub const DEFAULT_LOGIT_EXPONENT: f64 = -3.0;

/// A technology within a subsector.
///
/// The cost of a technology for a period is
/// `non_energy_cost + (fuel_price + carbon_tax * emissions_coefficient) / efficiency`.
#[derive(Debug, Clone, PartialEq)]
pub struct Technology {
    /// A unique identifier for the technology within its subsector
    pub id: TechnologyID,
    /// The good consumed by the technology, if any
    pub fuel: Option<GoodID>,
    /// Base share weight for each period
    pub share_weight: PeriodVec<f64>,
    /// Whether the share weight was given explicitly for each period
    pub share_weight_anchor: PeriodVec<bool>,
    /// Logit exponent for each period
    pub logit_exponent: PeriodVec<f64>,
    /// Cost per unit output, excluding fuel and carbon costs
    pub non_energy_cost: PeriodVec<f64>,
    /// Output per unit of fuel input
    pub efficiency: PeriodVec<f64>,
    /// Emissions per unit of fuel input
    pub emissions_coefficient: PeriodVec<f64>,
    /// Exogenously fixed output, for periods in which it applies
    pub fixed_output: PeriodVec<Option<f64>>,
    /// Calibration target output, for periods in which it applies
    pub calibration_output: PeriodVec<Option<f64>>,
    calibrated_share_weight: PeriodVec<f64>,
    recalibrated: PeriodVec<bool>,
    fuel_price: PeriodVec<f64>,
    carbon_tax: PeriodVec<f64>,
    cost: PeriodVec<f64>,
    share: PeriodVec<f64>,
    output: PeriodVec<f64>,
    input: PeriodVec<f64>,
    emissions: PeriodVec<f64>,
}
define_id_getter! {Technology, TechnologyID}

impl Technology {
    /// Create a new technology with default parameters for every period.
    ///
    /// By default a technology has a share weight of one, unit efficiency, no costs and no
    /// emissions.
    pub fn new(id: TechnologyID, fuel: Option<GoodID>, time: &ModelTime) -> Self {
        Self {
            id,
            fuel,
            share_weight: PeriodVec::new(time, 1.0),
            share_weight_anchor: PeriodVec::new(time, false),
            logit_exponent: PeriodVec::new(time, DEFAULT_LOGIT_EXPONENT),
            non_energy_cost: PeriodVec::new(time, 0.0),
            efficiency: PeriodVec::new(time, 1.0),
            emissions_coefficient: PeriodVec::new(time, 0.0),
            fixed_output: PeriodVec::new(time, None),
            calibration_output: PeriodVec::new(time, None),
            calibrated_share_weight: PeriodVec::new(time, 1.0),
            recalibrated: PeriodVec::new(time, false),
            fuel_price: PeriodVec::new(time, 0.0),
            carbon_tax: PeriodVec::new(time, 0.0),
            cost: PeriodVec::new(time, 0.0),
            share: PeriodVec::new(time, 0.0),
            output: PeriodVec::new(time, 0.0),
            input: PeriodVec::new(time, 0.0),
            emissions: PeriodVec::new(time, 0.0),
        }
    }

    /// Set the carbon tax faced by the technology
    pub fn set_carbon_tax(&mut self, period: usize, tax: f64) {
        self.carbon_tax[period] = tax;
    }

    /// Calculate the cost of the technology, given the price of its fuel
    pub fn calc_cost(&mut self, period: usize, fuel_price: f64) {
        let efficiency = self.efficiency[period];
        let carbon_cost = self.carbon_tax[period] * self.emissions_coefficient[period];
        self.fuel_price[period] = fuel_price;
        self.cost[period] = self.non_energy_cost[period] + (fuel_price + carbon_cost) / efficiency;
    }

    /// The cost per unit output
    pub fn cost(&self, period: usize) -> f64 {
        self.cost[period]
    }

    /// The price of the fuel consumed
    pub fn fuel_price(&self, period: usize) -> f64 {
        self.fuel_price[period]
    }

    /// Whether the output of the technology is exogenously fixed
    pub fn is_fixed(&self, period: usize) -> bool {
        self.fixed_output[period].is_some()
    }

    /// Whether the technology has a calibration target
    pub fn is_calibrated(&self, period: usize) -> bool {
        self.calibration_output[period].is_some()
    }

    /// The technology as an option in its subsector's choice, using the base share weight
    pub fn share_option(&self, period: usize) -> ShareOption {
        ShareOption::new(
            self.share_weight[period],
            self.cost[period],
            self.logit_exponent[period],
        )
    }

    /// The share weight used in the last calculation (after any recalibration)
    pub fn calibrated_share_weight(&self, period: usize) -> f64 {
        self.calibrated_share_weight[period]
    }

    /// Go back to the base share weight for the period, discarding any recalibration
    pub fn reset_share_weight(&mut self, period: usize) {
        self.calibrated_share_weight[period] = self.share_weight[period];
        self.recalibrated[period] = false;
    }

    /// Record the share weight obtained by recalibrating against the calibration output
    pub fn set_calibrated_share_weight(&mut self, period: usize, share_weight: f64) {
        self.calibrated_share_weight[period] = share_weight;
        self.recalibrated[period] = true;
    }

    /// Whether the share weight was recalibrated in the last calculation of the period
    pub fn is_recalibrated(&self, period: usize) -> bool {
        self.recalibrated[period]
    }

    /// The share of the subsector's output
    pub fn share(&self, period: usize) -> f64 {
        self.share[period]
    }

    /// Set the share of the subsector's output
    pub fn set_share(&mut self, period: usize, share: f64) {
        self.share[period] = share;
    }

    /// Set the output of the technology, updating its fuel input and emissions
    pub fn set_output(&mut self, period: usize, output: f64) {
        self.output[period] = output;
        self.input[period] = if self.fuel.is_some() {
            output / self.efficiency[period]
        } else {
            0.0
        };
        self.emissions[period] = self.input[period] * self.emissions_coefficient[period];
    }

    /// The output of the technology
    pub fn output(&self, period: usize) -> f64 {
        self.output[period]
    }

    /// The amount of fuel consumed
    pub fn input(&self, period: usize) -> f64 {
        self.input[period]
    }

    /// The emissions from the technology
    pub fn emissions(&self, period: usize) -> f64 {
        self.emissions[period]
    }

    /// The carbon tax paid by the technology
    pub fn carbon_tax_paid(&self, period: usize) -> f64 {
        self.carbon_tax[period] * self.emissions[period]
    }

    /// Carry the calibrated share weight for `period` forward to later periods.
    ///
    /// Nothing changes unless the share weight was recalibrated for `period`.
    pub fn post_calc(&mut self, period: usize, time: &ModelTime) {
        if !self.recalibrated[period] {
            return;
        }

        let anchors = &self.share_weight_anchor;
        let calibration = &self.calibration_output;
        propagate_calibrated_share_weight(
            &mut self.share_weight,
            time,
            period,
            self.calibrated_share_weight[period],
            |p| anchors[p] || calibration[p].is_some(),
        );
    }
}
