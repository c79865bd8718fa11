//! Subsectors group competing technologies and compete with each other within a sector.
use crate::calibration::{
    fixed_supply_scale_factor, is_within_accuracy, propagate_calibrated_share_weight,
    recalibrate_share_weights,
};
use crate::id::{define_id_getter, define_id_type};
use crate::market::MarketQuantities;
use crate::period::{ModelTime, PeriodVec};
use crate::region::RegionID;
use crate::sector::SectorID;
use crate::share::{ShareOption, allocate_shares};
use crate::technology::{DEFAULT_LOGIT_EXPONENT, Technology};
use crate::visitor::ModelVisitor;
use anyhow::{Context, Result, ensure};
use log::warn;

define_id_type! {SubsectorID}

/// A group of technologies competing to supply part of a sector's output.
///
/// A subsector allocates its output between its technologies with the same capacity-limited logit
/// that its parent sector uses to allocate between subsectors. Technologies with a fixed output are
/// excluded from the choice and supply their fixed amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsector {
    /// A unique identifier for the subsector within its sector
    pub id: SubsectorID,
    /// The region the subsector belongs to
    pub region_id: RegionID,
    /// The sector the subsector belongs to
    pub sector_id: SectorID,
    /// The technologies in the subsector
    pub technologies: Vec<Technology>,
    /// Share weight from the input data, from which recalibration starts each calculation
    pub base_share_weight: PeriodVec<f64>,
    /// Whether the share weight was given explicitly for each period
    pub share_weight_anchor: PeriodVec<bool>,
    /// Logit exponent used when this subsector competes within its sector
    pub logit_exponent: PeriodVec<f64>,
    /// The maximum share of the sector's output the subsector may supply
    pub capacity_limit: PeriodVec<f64>,
    /// An externally imposed share of the sector's output
    pub fixed_share: PeriodVec<Option<f64>>,
    share_weight: PeriodVec<f64>,
    share: PeriodVec<f64>,
    capacity_limited: PeriodVec<bool>,
    calibration_status: PeriodVec<bool>,
    fixed_supply_scale: PeriodVec<f64>,
    price: PeriodVec<f64>,
    fuel_price: PeriodVec<f64>,
    input: PeriodVec<f64>,
    output: PeriodVec<f64>,
    carbon_tax_paid: PeriodVec<f64>,
    emissions: PeriodVec<f64>,
}
define_id_getter! {Subsector, SubsectorID}

impl Subsector {
    /// Create a new subsector with default parameters and no technologies
    pub fn new(
        id: SubsectorID,
        region_id: RegionID,
        sector_id: SectorID,
        time: &ModelTime,
    ) -> Self {
        Self {
            id,
            region_id,
            sector_id,
            technologies: Vec::new(),
            base_share_weight: PeriodVec::new(time, 1.0),
            share_weight_anchor: PeriodVec::new(time, false),
            logit_exponent: PeriodVec::new(time, DEFAULT_LOGIT_EXPONENT),
            capacity_limit: PeriodVec::new(time, 1.0),
            fixed_share: PeriodVec::new(time, None),
            share_weight: PeriodVec::new(time, 1.0),
            share: PeriodVec::new(time, 0.0),
            capacity_limited: PeriodVec::new(time, false),
            calibration_status: PeriodVec::new(time, false),
            fixed_supply_scale: PeriodVec::new(time, 1.0),
            price: PeriodVec::new(time, 0.0),
            fuel_price: PeriodVec::new(time, 0.0),
            input: PeriodVec::new(time, 0.0),
            output: PeriodVec::new(time, 0.0),
            carbon_tax_paid: PeriodVec::new(time, 0.0),
            emissions: PeriodVec::new(time, 0.0),
        }
    }

    /// Apply a carbon tax to every technology in the subsector
    pub fn apply_carbon_tax(&mut self, period: usize, tax: f64) {
        for technology in &mut self.technologies {
            technology.set_carbon_tax(period, tax);
        }
    }

    /// Calculate technology costs from the market prices of their fuels.
    ///
    /// This also resets any fixed-supply scaling from a previous calculation of the period.
    pub fn calc_costs(&mut self, period: usize, prices: &MarketQuantities) -> Result<()> {
        self.fixed_supply_scale[period] = 1.0;
        for technology in &mut self.technologies {
            let fuel_price = match &technology.fuel {
                Some(fuel) => prices.get(fuel, period).with_context(|| {
                    format!(
                        "No market price for {fuel} in period {period}, required by technology \
                        {} in subsector {} of sector {} in region {}",
                        technology.id, self.id, self.sector_id, self.region_id
                    )
                })?,
                None => 0.0,
            };
            technology.calc_cost(period, fuel_price);
        }

        Ok(())
    }

    /// Allocate the variable part of the subsector's output between technologies.
    ///
    /// Technologies with a fixed output do not take part and are given a share of zero.
    pub fn calc_tech_shares(&mut self, period: usize) -> Result<()> {
        let choice: Vec<_> = self
            .technologies
            .iter()
            .filter(|tech| !tech.is_fixed(period))
            .map(|tech| tech.share_option(period))
            .collect();
        let allocation = allocate_shares(&choice).with_context(|| {
            format!(
                "Failed to allocate technology shares for subsector {} of sector {} in region {}",
                self.id, self.sector_id, self.region_id
            )
        })?;
        if let Some(fallback) = allocation.fallback {
            warn!(
                "Technology shares for subsector {} of sector {} in region {} (period {period}): \
                {fallback}",
                self.id, self.sector_id, self.region_id
            );
        }

        let mut shares = allocation.shares.into_iter();
        for technology in &mut self.technologies {
            technology.reset_share_weight(period);
            if technology.is_fixed(period) {
                technology.set_share(period, 0.0);
            } else {
                technology.set_share(period, shares.next().unwrap_or_default());
            }
        }

        Ok(())
    }

    /// Calculate the subsector price from its technology costs.
    ///
    /// The price is the share-weighted cost of the technologies taking part in the choice. If every
    /// technology has a fixed output, their costs are weighted by fixed output instead.
    pub fn calc_price(&mut self, period: usize) {
        let all_fixed = self.all_output_fixed(period);
        let weights: Vec<_> = self
            .technologies
            .iter()
            .map(|tech| {
                if all_fixed {
                    tech.fixed_output[period].unwrap_or_default()
                } else {
                    tech.share(period)
                }
            })
            .collect();
        let (price, fuel_price) = weighted_costs(&self.technologies, &weights, period);
        self.price[period] = price;
        self.fuel_price[period] = fuel_price;
    }

    /// The subsector as an option in its sector's choice, using its base share weight
    pub fn share_option(&self, period: usize) -> ShareOption {
        let option = ShareOption::new(
            self.base_share_weight[period],
            self.price[period],
            self.logit_exponent[period],
        )
        .with_capacity_limit(self.capacity_limit[period]);

        match self.fixed_share[period] {
            Some(fixed_share) => option.with_fixed_share(fixed_share),
            None => option,
        }
    }

    /// The subsector's share of its sector's output
    pub fn share(&self, period: usize) -> f64 {
        self.share[period]
    }

    /// Set the subsector's share of its sector's output
    pub fn set_share(&mut self, period: usize, share: f64) {
        self.share[period] = share;
    }

    /// Whether the subsector's capacity limit was binding
    pub fn cap_limit_status(&self, period: usize) -> bool {
        self.capacity_limited[period]
    }

    /// Record whether the subsector's capacity limit was binding
    pub fn set_cap_limit_status(&mut self, period: usize, limited: bool) {
        self.capacity_limited[period] = limited;
    }

    /// The maximum share of the sector's output the subsector may supply
    pub fn capacity_limit(&self, period: usize) -> f64 {
        self.capacity_limit[period]
    }

    /// The share weight used in the last calculation (after any recalibration)
    pub fn share_weight(&self, period: usize) -> f64 {
        self.share_weight[period]
    }

    /// Record the share weight used in the calculation
    pub fn set_share_weight(&mut self, period: usize, share_weight: f64) {
        self.share_weight[period] = share_weight;
    }

    /// Whether the subsector's share was recalibrated in the last calculation
    pub fn calibration_status(&self, period: usize) -> bool {
        self.calibration_status[period]
    }

    /// Record whether the subsector's share was recalibrated
    pub fn set_calibration_status(&mut self, period: usize, calibrated: bool) {
        self.calibration_status[period] = calibrated;
    }

    /// Whether every technology in the subsector has a fixed output
    pub fn all_output_fixed(&self, period: usize) -> bool {
        !self.technologies.is_empty() && self.technologies.iter().all(|t| t.is_fixed(period))
    }

    /// The total fixed output of the subsector's technologies, after any scaling
    pub fn fixed_supply(&self, period: usize) -> f64 {
        let total: f64 = self
            .technologies
            .iter()
            .filter_map(|tech| tech.fixed_output[period])
            .sum();
        total * self.fixed_supply_scale[period]
    }

    /// Scale the fixed output of the subsector's technologies for this calculation
    pub fn scale_fixed_supply(&mut self, period: usize, factor: f64) {
        self.fixed_supply_scale[period] *= factor;
    }

    /// The total calibration output of the technologies which take part in the choice
    pub fn total_cal_outputs(&self, period: usize) -> f64 {
        self.technologies
            .iter()
            .filter(|tech| !tech.is_fixed(period))
            .filter_map(|tech| tech.calibration_output[period])
            .sum()
    }

    /// Whether the subsector's output is determined by calibration data.
    ///
    /// This is the case when every technology either has a fixed output or a calibration output
    /// and at least one has a calibration output.
    pub fn do_calibration(&self, period: usize) -> bool {
        let mut choice = self
            .technologies
            .iter()
            .filter(|tech| !tech.is_fixed(period))
            .peekable();
        choice.peek().is_some() && choice.all(|tech| tech.is_calibrated(period))
    }

    /// The calibration target for the subsector's total output, if it has one
    pub fn calibration_target(&self, period: usize) -> Option<f64> {
        self.do_calibration(period)
            .then(|| self.total_cal_outputs(period) + self.fixed_supply(period))
    }

    /// Adjust technology share weights so that calibrated technologies reproduce their targets.
    ///
    /// # Arguments
    ///
    /// * `period` - The period being calculated
    /// * `variable_output` - The part of the subsector's output not supplied by fixed technologies
    pub fn adjust_for_calibration(&mut self, period: usize, variable_output: f64) -> Result<()> {
        if variable_output <= 0.0 {
            return Ok(());
        }

        let choice: Vec<_> = self
            .technologies
            .iter()
            .filter(|tech| !tech.is_fixed(period))
            .collect();
        if !choice.iter().any(|tech| tech.is_calibrated(period)) {
            return Ok(());
        }

        let mut options: Vec<_> = choice.iter().map(|tech| tech.share_option(period)).collect();
        let targets: Vec<_> = choice
            .iter()
            .map(|tech| {
                tech.calibration_output[period].map(|target| (target / variable_output).min(1.0))
            })
            .collect();
        let allocation = recalibrate_share_weights(&mut options, &targets).with_context(|| {
            format!(
                "Failed to recalibrate technologies in subsector {} of sector {} in region {}",
                self.id, self.sector_id, self.region_id
            )
        })?;

        let choice_techs = self
            .technologies
            .iter_mut()
            .filter(|tech| !tech.is_fixed(period));
        for ((technology, option), share) in choice_techs.zip(options).zip(allocation.shares) {
            if technology.is_calibrated(period) {
                technology.set_calibrated_share_weight(period, option.share_weight);
            }
            technology.set_share(period, share);
        }

        Ok(())
    }

    /// Set the output of the subsector and distribute it between its technologies.
    ///
    /// Fixed technologies supply their (possibly scaled) fixed output first. If they would supply
    /// more than `output`, or there is no other technology to supply the rest, they are scaled to
    /// match it. The remainder is split between the other technologies by their shares.
    pub fn set_output(&mut self, period: usize, output: f64, calibrate: bool) -> Result<()> {
        ensure!(
            output >= 0.0,
            "Negative output {output} for subsector {} of sector {} in region {}",
            self.id,
            self.sector_id,
            self.region_id
        );

        if calibrate && self.do_calibration(period) {
            let factor = fixed_supply_scale_factor(
                output,
                self.total_cal_outputs(period),
                self.fixed_supply(period),
            );
            self.scale_fixed_supply(period, factor);
        }

        let has_choice = self.technologies.iter().any(|t| !t.is_fixed(period));
        let fixed = self.fixed_supply(period);
        if fixed > output || (!has_choice && fixed > 0.0) {
            self.scale_fixed_supply(period, output / fixed);
        } else {
            ensure!(
                has_choice || output == 0.0,
                "Subsector {} of sector {} in region {} has no technology able to supply an \
                output of {output}",
                self.id,
                self.sector_id,
                self.region_id
            );
        }

        let variable_output = (output - self.fixed_supply(period)).max(0.0);
        if calibrate {
            self.adjust_for_calibration(period, variable_output)?;
        }

        let scale = self.fixed_supply_scale[period];
        for technology in &mut self.technologies {
            let tech_output = match technology.fixed_output[period] {
                Some(fixed_output) => fixed_output * scale,
                None => technology.share(period) * variable_output,
            };
            technology.set_output(period, tech_output);
        }

        self.output[period] = output;
        self.input[period] = self.technologies.iter().map(|t| t.input(period)).sum();
        self.calc_emissions(period);

        if output > 0.0 {
            let outputs: Vec<_> = self.technologies.iter().map(|t| t.output(period)).collect();
            let (price, fuel_price) = weighted_costs(&self.technologies, &outputs, period);
            self.price[period] = price;
            self.fuel_price[period] = fuel_price;
            for technology in &mut self.technologies {
                let share = technology.output(period) / output;
                technology.set_share(period, share);
            }
        }

        Ok(())
    }

    /// Sum the emissions and carbon tax paid by the subsector's technologies
    pub fn calc_emissions(&mut self, period: usize) {
        self.emissions[period] = self.technologies.iter().map(|t| t.emissions(period)).sum();
        self.carbon_tax_paid[period] = self
            .technologies
            .iter()
            .map(|t| t.carbon_tax_paid(period))
            .sum();
    }

    /// Check that every calibrated technology reproduces its calibration output.
    ///
    /// Every technology is checked, so that all failures are reported when `print_warnings` is
    /// set.
    pub fn check_calibration(&self, period: usize, accuracy: f64, print_warnings: bool) -> bool {
        let mut all_ok = true;
        for technology in &self.technologies {
            let Some(target) = technology.calibration_output[period] else {
                continue;
            };
            let output = technology.output(period);
            if !is_within_accuracy(output, target, accuracy) {
                all_ok = false;
                if print_warnings {
                    warn!(
                        "Technology {} in subsector {} of sector {} in region {} is not \
                        calibrated in period {period}: output {output}, target {target}",
                        technology.id, self.id, self.sector_id, self.region_id
                    );
                }
            }
        }

        all_ok
    }

    /// The subsector price (average technology cost)
    pub fn price(&self, period: usize) -> f64 {
        self.price[period]
    }

    /// The average price of the fuels consumed
    pub fn fuel_price(&self, period: usize) -> f64 {
        self.fuel_price[period]
    }

    /// The output of the subsector
    pub fn output(&self, period: usize) -> f64 {
        self.output[period]
    }

    /// The total fuel input of the subsector
    pub fn input(&self, period: usize) -> f64 {
        self.input[period]
    }

    /// The total emissions of the subsector
    pub fn emissions(&self, period: usize) -> f64 {
        self.emissions[period]
    }

    /// The total carbon tax paid by the subsector
    pub fn carbon_tax_paid(&self, period: usize) -> f64 {
        self.carbon_tax_paid[period]
    }

    /// Carry calibrated share weights forward from `period` to later periods.
    ///
    /// Only share weights which were recalibrated in `period` are carried forward.
    pub fn post_calc(&mut self, period: usize, time: &ModelTime) {
        if self.calibration_status[period] {
            let anchors: Vec<_> = (0..self.base_share_weight.len())
                .map(|p| self.share_weight_anchor[p] || self.do_calibration(p))
                .collect();
            propagate_calibrated_share_weight(
                &mut self.base_share_weight,
                time,
                period,
                self.share_weight[period],
                |p| anchors[p],
            );
        }

        for technology in &mut self.technologies {
            technology.post_calc(period, time);
        }
    }

    /// Visit the subsector and then each of its technologies
    pub fn accept(&self, visitor: &mut dyn ModelVisitor, period: usize) {
        visitor.visit_subsector(self, period);
        for technology in &self.technologies {
            visitor.visit_technology(self, technology, period);
        }
    }
}

/// Average technology cost and fuel price, weighted by `weights`.
///
/// If the weights sum to zero, a simple mean is used.
fn weighted_costs(technologies: &[Technology], weights: &[f64], period: usize) -> (f64, f64) {
    if technologies.is_empty() {
        return (0.0, 0.0);
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let n = technologies.len() as f64;
        return (
            technologies.iter().map(|t| t.cost(period)).sum::<f64>() / n,
            technologies.iter().map(|t| t.fuel_price(period)).sum::<f64>() / n,
        );
    }

    technologies
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(price, fuel_price), (tech, weight)| {
            (
                price + tech.cost(period) * weight / total,
                fuel_price + tech.fuel_price(period) * weight / total,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, market_prices, model_time, subsector};
    use crate::market::GoodID;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn calc(subsector: &mut Subsector, prices: &MarketQuantities, output: f64, calibrate: bool) {
        subsector.calc_costs(0, prices).unwrap();
        subsector.calc_tech_shares(0).unwrap();
        subsector.calc_price(0);
        subsector.set_output(0, output, calibrate).unwrap();
    }

    #[rstest]
    fn test_tech_shares_and_price(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.calc_costs(0, &market_prices).unwrap();
        subsector.calc_tech_shares(0).unwrap();
        subsector.calc_price(0);

        let shares: Vec<_> = subsector.technologies.iter().map(|t| t.share(0)).collect();
        assert_approx_eq!(f64, shares.iter().sum::<f64>(), 1.0);
        // Gas is cheaper than oil
        assert!(shares[0] > shares[1]);

        let expected_price = shares[0] * subsector.technologies[0].cost(0)
            + shares[1] * subsector.technologies[1].cost(0);
        assert_approx_eq!(f64, subsector.price(0), expected_price);
    }

    #[rstest]
    fn test_missing_price(mut subsector: Subsector) {
        assert_error!(
            subsector.calc_costs(0, &MarketQuantities::default()),
            "No market price for gas in period 0, required by technology gas_boiler in \
            subsector boilers of sector heat in region GBR"
        );
    }

    #[rstest]
    fn test_set_output_splits_by_share(mut subsector: Subsector, market_prices: MarketQuantities) {
        calc(&mut subsector, &market_prices, 10.0, false);

        let total: f64 = subsector.technologies.iter().map(|t| t.output(0)).sum();
        assert_approx_eq!(f64, total, 10.0);
        assert_eq!(subsector.output(0), 10.0);
        assert_approx_eq!(
            f64,
            subsector.input(0),
            subsector.technologies.iter().map(|t| t.input(0)).sum::<f64>()
        );
    }

    #[rstest]
    fn test_set_output_with_fixed_technology(
        mut subsector: Subsector,
        market_prices: MarketQuantities,
    ) {
        subsector.technologies[1].fixed_output[0] = Some(4.0);
        calc(&mut subsector, &market_prices, 10.0, false);

        assert_eq!(subsector.technologies[1].output(0), 4.0);
        assert_approx_eq!(f64, subsector.technologies[0].output(0), 6.0);
        assert_approx_eq!(f64, subsector.technologies[1].share(0), 0.4);
    }

    #[rstest]
    fn test_fixed_supply_scaled_down_to_output(
        mut subsector: Subsector,
        market_prices: MarketQuantities,
    ) {
        subsector.technologies[1].fixed_output[0] = Some(20.0);
        calc(&mut subsector, &market_prices, 10.0, false);

        assert_approx_eq!(f64, subsector.technologies[1].output(0), 10.0);
        assert_eq!(subsector.technologies[0].output(0), 0.0);
    }

    #[rstest]
    fn test_all_output_fixed(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.technologies[0].fixed_output[0] = Some(1.0);
        subsector.technologies[1].fixed_output[0] = Some(3.0);
        assert!(subsector.all_output_fixed(0));
        assert_eq!(subsector.fixed_supply(0), 4.0);

        calc(&mut subsector, &market_prices, 8.0, false);
        assert_approx_eq!(f64, subsector.technologies[0].output(0), 2.0);
        assert_approx_eq!(f64, subsector.technologies[1].output(0), 6.0);
    }

    #[rstest]
    fn test_no_technology_can_supply(model_time: ModelTime) {
        let mut subsector = Subsector::new("empty".into(), "GBR".into(), "heat".into(), &model_time);
        subsector.calc_tech_shares(0).unwrap();
        assert!(subsector.set_output(0, 0.0, false).is_ok());
        assert!(subsector.set_output(0, 1.0, false).is_err());
    }

    #[rstest]
    fn test_calibration(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.technologies[0].calibration_output[0] = Some(3.0);
        calc(&mut subsector, &market_prices, 10.0, true);

        assert!(is_within_accuracy(subsector.technologies[0].output(0), 3.0, 1e-6));
        assert!(subsector.check_calibration(0, 1e-3, true));
        assert!(subsector.technologies[0].calibrated_share_weight(0) < 1.0);

        // Base share weights are unchanged, so the calculation can be repeated
        assert_eq!(subsector.technologies[0].share_weight[0], 1.0);
    }

    #[rstest]
    fn test_calibration_off(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.technologies[0].calibration_output[0] = Some(3.0);
        calc(&mut subsector, &market_prices, 10.0, false);

        assert!(!subsector.check_calibration(0, 1e-3, false));
        assert_eq!(subsector.technologies[0].calibrated_share_weight(0), 1.0);
    }

    #[rstest]
    fn test_fixed_supply_scaled_for_calibration(
        mut subsector: Subsector,
        market_prices: MarketQuantities,
    ) {
        subsector.technologies[0].calibration_output[0] = Some(6.0);
        subsector.technologies[1].fixed_output[0] = Some(2.0);
        assert!(subsector.do_calibration(0));
        assert_eq!(subsector.calibration_target(0), Some(8.0));

        calc(&mut subsector, &market_prices, 10.0, true);
        assert_approx_eq!(f64, subsector.technologies[0].output(0), 6.0);
        assert_approx_eq!(f64, subsector.technologies[1].output(0), 4.0);
    }

    #[rstest]
    fn test_repeat_calc_is_identical(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.technologies[0].calibration_output[0] = Some(3.0);
        calc(&mut subsector, &market_prices, 10.0, true);
        let first = subsector.clone();
        calc(&mut subsector, &market_prices, 10.0, true);
        assert_eq!(subsector, first);
    }

    #[rstest]
    fn test_post_calc_propagates_share_weight(mut subsector: Subsector, model_time: ModelTime) {
        subsector.set_share_weight(0, 2.0);
        subsector.set_calibration_status(0, true);
        subsector.post_calc(0, &model_time);
        assert_eq!(
            subsector.base_share_weight.iter().copied().collect::<Vec<_>>(),
            [1.0, 2.0, 2.0]
        );
    }

    #[rstest]
    fn test_post_calc_keeps_uncalibrated_share_weights(
        mut subsector: Subsector,
        market_prices: MarketQuantities,
    ) {
        // Uneven years, with a share weight interpolated by year from the input data
        let time = ModelTime::new(vec![2005, 2010, 2020]).unwrap();
        subsector.base_share_weight =
            PeriodVec::from_values(&time, vec![0.5, 2.0 / 3.0, 1.0]).unwrap();
        subsector.share_weight_anchor =
            PeriodVec::from_values(&time, vec![true, false, true]).unwrap();
        subsector.technologies[0].calibration_output[0] = Some(3.0);
        calc(&mut subsector, &market_prices, 10.0, false);
        let before = subsector.clone();

        subsector.post_calc(0, &time);
        assert_eq!(subsector, before);
        assert!(!subsector.technologies[0].is_recalibrated(0));
    }

    #[rstest]
    fn test_post_calc_carries_technology_calibration(
        mut subsector: Subsector,
        market_prices: MarketQuantities,
        model_time: ModelTime,
    ) {
        subsector.technologies[0].calibration_output[0] = Some(3.0);
        calc(&mut subsector, &market_prices, 10.0, true);
        let calibrated = subsector.technologies[0].calibrated_share_weight(0);
        assert!(subsector.technologies[0].is_recalibrated(0));
        assert!(!subsector.technologies[1].is_recalibrated(0));

        subsector.post_calc(0, &model_time);
        assert_eq!(subsector.technologies[0].share_weight[1], calibrated);
        assert_eq!(subsector.technologies[1].share_weight[1], 1.0);
    }

    #[rstest]
    fn test_carbon_tax(mut subsector: Subsector, market_prices: MarketQuantities) {
        subsector.technologies[0].emissions_coefficient[0] = 0.5;
        subsector.apply_carbon_tax(0, 10.0);
        calc(&mut subsector, &market_prices, 10.0, false);

        let gas = &subsector.technologies[0];
        assert_eq!(gas.fuel, Some(GoodID::new("gas")));
        assert_approx_eq!(f64, subsector.emissions(0), gas.emissions(0));
        assert_approx_eq!(f64, subsector.carbon_tax_paid(0), 10.0 * gas.emissions(0));
    }
}
