//! The world is the root of the model tree and the entry point for the equilibrium solver.
//!
//! The solver repeatedly calls [`World::calc`] for a period, adjusting market prices between
//! calls. Each call may be restricted to the regions the solver has perturbed.
use crate::climate::ClimateModel;
use crate::market::GoodID;
use crate::period::ModelTime;
use crate::policy::GhgPolicy;
use crate::region::{Region, RegionID};
use crate::visitor::ModelVisitor;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts calls to [`World::calc`], for performance diagnostics
#[derive(Debug, Default)]
pub struct CalcCounter(AtomicU64);

impl CalcCounter {
    /// Record one call
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// The number of calls recorded so far
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Maps region IDs to positions in the world's region collection
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegionIndex(HashMap<RegionID, usize>);

impl RegionIndex {
    /// Build the index for the given regions, checking that their IDs are unique
    fn build(regions: &[Region]) -> Result<Self> {
        let mut index = HashMap::with_capacity(regions.len());
        for (position, region) in regions.iter().enumerate() {
            ensure!(
                index.insert(region.id.clone(), position).is_none(),
                "Duplicate region {}",
                region.id
            );
        }

        Ok(Self(index))
    }

    /// The position of the region with the given ID, if there is one
    pub fn get(&self, id: &RegionID) -> Option<usize> {
        self.0.get(id).copied()
    }

    /// The number of regions in the index
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The collection of all regions in the model
#[derive(Debug)]
pub struct World {
    time: ModelTime,
    regions: Vec<Region>,
    index: RegionIndex,
    calibrate: bool,
    counter: Arc<CalcCounter>,
    climate_model: Option<Box<dyn ClimateModel>>,
}

impl World {
    /// Create a new world from its regions.
    ///
    /// Calibration is on by default.
    pub fn new(time: ModelTime, regions: Vec<Region>) -> Result<Self> {
        let index = RegionIndex::build(&regions)?;
        Ok(Self {
            time,
            regions,
            index,
            calibrate: true,
            counter: Arc::default(),
            climate_model: None,
        })
    }

    /// Add a region to the world
    pub fn add_region(&mut self, region: Region) -> Result<()> {
        ensure!(
            self.index.get(&region.id).is_none(),
            "Duplicate region {}",
            region.id
        );
        self.regions.push(region);
        self.index = RegionIndex::build(&self.regions)?;

        Ok(())
    }

    /// The model time
    pub fn time(&self) -> &ModelTime {
        &self.time
    }

    /// All regions, in index order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Get a region by ID
    pub fn region(&self, id: &RegionID) -> Option<&Region> {
        self.index.get(id).map(|i| &self.regions[i])
    }

    /// The index of regions by ID
    pub fn region_index(&self) -> &RegionIndex {
        &self.index
    }

    /// The IDs of all regions, in index order
    pub fn region_ids(&self) -> Vec<RegionID> {
        self.regions.iter().map(|r| r.id.clone()).collect()
    }

    /// Calculate the model for a period.
    ///
    /// # Arguments
    ///
    /// * `period` - The period to calculate
    /// * `regions_to_calc` - The regions to calculate. If empty, every region is calculated. IDs
    ///   which are not in the model are ignored.
    pub fn calc(&mut self, period: usize, regions_to_calc: &[RegionID]) -> Result<()> {
        self.counter.increment();
        self.time.check_period(period)?;

        let positions = if regions_to_calc.is_empty() {
            (0..self.regions.len()).collect_vec()
        } else {
            regions_to_calc
                .iter()
                .filter_map(|id| {
                    let position = self.index.get(id);
                    if position.is_none() {
                        debug!("Region {id} is not in the model; skipping");
                    }
                    position
                })
                .sorted_unstable()
                .dedup()
                .collect_vec()
        };

        for position in positions {
            let region = &mut self.regions[position];
            region
                .calc(period, self.calibrate)
                .with_context(|| format!("Failed to calculate region {}", region.id))?;
        }

        Ok(())
    }

    /// Prepare for calculating a period
    pub fn init_calc(&mut self, period: usize) -> Result<()> {
        self.time.check_period(period)?;
        for region in &mut self.regions {
            region.init_calc(period);
        }

        Ok(())
    }

    /// Finalise a period once the solver has finished with it.
    ///
    /// Calibrated share weights are carried forward to later periods.
    pub fn post_calc(&mut self, period: usize) -> Result<()> {
        self.time.check_period(period)?;
        for region in &mut self.regions {
            region.post_calc(period, &self.time);
        }
        info!(
            "Finished {}: {} regions calculated {} times in total",
            self.time.year(period),
            self.regions.len(),
            self.counter.count()
        );

        Ok(())
    }

    /// Turn calibration on
    pub fn turn_calibrations_on(&mut self) {
        self.calibrate = true;
    }

    /// Turn calibration off
    pub fn turn_calibrations_off(&mut self) {
        self.calibrate = false;
    }

    /// Whether calibration is on
    pub fn calibration_setting(&self) -> bool {
        self.calibrate
    }

    /// Check whether every calibrated technology in the world matches its calibration output.
    ///
    /// Every region is checked, so all failures are logged when `print_warnings` is set.
    pub fn is_all_calibrated(&self, period: usize, cal_accuracy: f64, print_warnings: bool) -> bool {
        self.regions
            .iter()
            .map(|r| r.is_all_calibrated(period, cal_accuracy, print_warnings))
            .fold(true, |all_ok, ok| all_ok && ok)
    }

    /// Apply a GHG policy's carbon tax to the regions it covers
    pub fn set_tax(&mut self, policy: &GhgPolicy) {
        for region in &mut self.regions {
            if policy.covers(&region.id) {
                region.set_carbon_tax(&policy.tax);
            }
        }
    }

    /// Replace the calc counter with a shared one
    pub fn set_calc_counter(&mut self, counter: Arc<CalcCounter>) {
        self.counter = counter;
    }

    /// The calc counter
    pub fn calc_counter(&self) -> &Arc<CalcCounter> {
        &self.counter
    }

    fn region_mut(&mut self, id: &RegionID) -> Result<&mut Region> {
        let position = self
            .index
            .get(id)
            .with_context(|| format!("Unknown region {id}"))?;
        Ok(&mut self.regions[position])
    }

    /// Set the market price of a good in a region
    pub fn set_market_price(
        &mut self,
        region_id: &RegionID,
        good: &GoodID,
        period: usize,
        price: f64,
    ) -> Result<()> {
        self.time.check_period(period)?;
        ensure!(price.is_finite(), "Invalid price {price} for {good}");
        self.region_mut(region_id)?
            .market
            .prices
            .insert(good, period, price);

        Ok(())
    }

    /// The market price of a good in a region
    pub fn market_price(&self, region_id: &RegionID, good: &GoodID, period: usize) -> Option<f64> {
        self.region(region_id)?.market.prices.get(good, period)
    }

    /// The quantity of a good supplied in a region
    pub fn market_supply(&self, region_id: &RegionID, good: &GoodID, period: usize) -> Option<f64> {
        self.region(region_id)?.market.supplies.get(good, period)
    }

    /// The quantity of a good demanded in a region
    pub fn market_demand(&self, region_id: &RegionID, good: &GoodID, period: usize) -> Option<f64> {
        self.region(region_id)?.market.demands.get(good, period)
    }

    /// Set the climate model which receives the world's emissions
    pub fn set_climate_model(&mut self, climate_model: Box<dyn ClimateModel>) {
        self.climate_model = Some(climate_model);
    }

    /// The climate model, if one has been set
    pub fn climate_model(&self) -> Option<&dyn ClimateModel> {
        self.climate_model.as_deref()
    }

    /// Pass each region's emissions for the period to the climate model and run it.
    ///
    /// Does nothing if there is no climate model.
    pub fn run_climate_model(&mut self, period: usize) -> Result<()> {
        self.time.check_period(period)?;
        let Some(climate_model) = self.climate_model.as_mut() else {
            return Ok(());
        };

        for region in &self.regions {
            climate_model.set_emissions(&region.id, period, region.emissions(period));
        }
        climate_model.run(period)
    }

    /// Visit every region in the world, parent before children
    pub fn accept(&self, visitor: &mut dyn ModelVisitor, period: usize) {
        for region in &self.regions {
            region.accept(visitor, period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, market_prices, model_time, region, sector, world};
    use crate::market::MarketQuantities;
    use crate::region::RegionKind;
    use crate::sector::Sector;
    use crate::subsector::Subsector;
    use crate::technology::Technology;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Counts the entities visited at each level
    #[derive(Default)]
    struct CountingVisitor {
        visited: Vec<String>,
    }

    impl ModelVisitor for CountingVisitor {
        fn visit_region(&mut self, region: &Region, _period: usize) {
            self.visited.push(format!("region {}", region.id));
        }

        fn visit_sector(&mut self, sector: &Sector, _period: usize) {
            self.visited.push(format!("sector {}", sector.id));
        }

        fn visit_subsector(&mut self, subsector: &Subsector, _period: usize) {
            self.visited.push(format!("subsector {}", subsector.id));
        }

        fn visit_technology(&mut self, _: &Subsector, technology: &Technology, _: usize) {
            self.visited.push(format!("technology {}", technology.id));
        }
    }

    #[rstest]
    fn test_new_duplicate_region(region: Region) {
        let time = ModelTime::new(vec![2005, 2010, 2015]).unwrap();
        assert_error!(
            World::new(time, vec![region.clone(), region]),
            "Duplicate region GBR"
        );
    }

    #[rstest]
    fn test_add_region_rebuilds_index(mut world: World, mut region: Region) {
        region.id = "FRA".into();
        world.add_region(region).unwrap();

        let index = world.region_index();
        assert_eq!(index.len(), world.regions().len());
        for (position, region) in world.regions().iter().enumerate() {
            assert_eq!(index.get(&region.id), Some(position));
        }
    }

    #[rstest]
    fn test_calc_counter_incremented_once_per_call(mut world: World) {
        let counter = Arc::new(CalcCounter::default());
        world.set_calc_counter(Arc::clone(&counter));

        world.calc(0, &[]).unwrap();
        world.calc(0, &["GBR".into(), "USA".into()]).unwrap();
        world.calc(0, &["ATLANTIS".into()]).unwrap();
        assert_eq!(counter.count(), 3);
    }

    #[rstest]
    fn test_calc_invalid_period(mut world: World) {
        assert_error!(
            world.calc(3, &[]),
            "Period 3 is out of range (model has 3 periods)"
        );
    }

    #[rstest]
    fn test_calc_unknown_region_changes_nothing(mut world: World) {
        let before = world.regions().to_vec();
        world.calc(0, &["ATLANTIS".into()]).unwrap();
        assert_eq!(world.regions(), before);
    }

    #[rstest]
    fn test_selective_calc_matches_full_calc(mut world: World) {
        let mut full = World::new(world.time().clone(), world.regions().to_vec()).unwrap();
        full.calc(0, &[]).unwrap();

        world.calc(0, &["GBR".into()]).unwrap();
        world.calc(0, &["USA".into(), "USA".into()]).unwrap();
        assert_eq!(world.regions(), full.regions());
    }

    #[rstest]
    fn test_calc_is_idempotent(mut world: World) {
        world.calc(0, &[]).unwrap();
        let first = world.regions().to_vec();
        world.calc(0, &[]).unwrap();
        assert_eq!(world.regions(), first);
    }

    #[rstest]
    fn test_calibration_setting(mut world: World) {
        assert!(world.calibration_setting());
        world.turn_calibrations_off();
        assert!(!world.calibration_setting());
        world.turn_calibrations_on();
        assert!(world.calibration_setting());
    }

    #[rstest]
    fn test_is_all_calibrated(
        model_time: ModelTime,
        mut sector: Sector,
        market_prices: MarketQuantities,
    ) {
        sector.final_demand[0] = 100.0;
        sector.subsectors[0].technologies[0].calibration_output[0] = Some(20.0);
        let mut region = Region::new(
            "GBR".into(),
            "United Kingdom".into(),
            RegionKind::PartialEquilibrium,
            vec![sector],
            &model_time,
        )
        .unwrap();
        region.market.prices = market_prices;
        let mut world = World::new(model_time, vec![region]).unwrap();

        world.turn_calibrations_off();
        world.calc(0, &[]).unwrap();
        assert!(!world.is_all_calibrated(0, 1e-3, true));

        world.turn_calibrations_on();
        world.calc(0, &[]).unwrap();
        assert!(world.is_all_calibrated(0, 1e-3, true));
    }

    #[rstest]
    fn test_set_tax(mut world: World) {
        let time = world.time().clone();
        let policy = GhgPolicy {
            name: "tax".into(),
            regions: Some(["USA".into()].into_iter().collect()),
            tax: crate::period::PeriodVec::new(&time, 20.0),
        };
        world.set_tax(&policy);
        assert_eq!(world.region(&"GBR".into()).unwrap().carbon_tax(0), 0.0);
        assert_eq!(world.region(&"USA".into()).unwrap().carbon_tax(0), 20.0);
    }

    #[rstest]
    fn test_market_surface(mut world: World) {
        let gbr = RegionID::new("GBR");
        let gas = GoodID::new("gas");
        world.set_market_price(&gbr, &gas, 0, 4.0).unwrap();
        assert_eq!(world.market_price(&gbr, &gas, 0), Some(4.0));
        assert!(world.set_market_price(&"FRA".into(), &gas, 0, 4.0).is_err());

        world.calc(0, &[]).unwrap();
        let heat = GoodID::new("heat");
        assert_approx_eq!(
            f64,
            world.market_supply(&gbr, &heat, 0).unwrap(),
            world.market_demand(&gbr, &heat, 0).unwrap()
        );
        assert_eq!(world.market_supply(&"FRA".into(), &heat, 0), None);
    }

    #[rstest]
    fn test_accept_visits_parents_first(world: World) {
        let mut visitor = CountingVisitor::default();
        world.accept(&mut visitor, 0);

        assert_eq!(visitor.visited[0], "region GBR");
        assert_eq!(visitor.visited[1], "sector heat");
        assert_eq!(visitor.visited[2], "subsector boilers");
        assert_eq!(visitor.visited[3], "technology gas_boiler");
        let regions = visitor
            .visited
            .iter()
            .filter(|v| v.starts_with("region"))
            .count();
        assert_eq!(regions, 2);
    }

    #[rstest]
    fn test_run_climate_model(mut world: World) {
        world.calc(0, &[]).unwrap();
        assert!(world.run_climate_model(0).is_ok());

        world.set_climate_model(Box::new(crate::climate::CumulativeEmissions::default()));
        world.run_climate_model(0).unwrap();
        assert!(world.climate_model().is_some());
    }
}
