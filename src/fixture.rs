//! Fixtures for tests
use crate::market::{GoodID, MarketQuantities};
use crate::period::{ModelTime, PeriodVec};
use crate::region::{Region, RegionID, RegionKind};
use crate::sector::Sector;
use crate::subsector::Subsector;
use crate::technology::Technology;
use crate::world::World;
use rstest::fixture;
use std::collections::HashSet;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn model_time() -> ModelTime {
    ModelTime::new(vec![2005, 2010, 2015]).unwrap()
}

#[fixture]
pub fn region_ids() -> HashSet<RegionID> {
    ["GBR".into(), "USA".into()].into_iter().collect()
}

#[fixture]
pub fn market_prices(model_time: ModelTime) -> MarketQuantities {
    let mut prices = MarketQuantities::default();
    for period in model_time.iter_periods() {
        prices.insert(&GoodID::new("gas"), period, 2.0);
        prices.insert(&GoodID::new("oil"), period, 3.0);
        prices.insert(&GoodID::new("electricity"), period, 6.0);
    }
    prices
}

#[fixture]
pub fn technology(model_time: ModelTime) -> Technology {
    Technology::new("gas_boiler".into(), Some("gas".into()), &model_time)
}

/// A technology burning gas, with some emissions
fn gas_technology(id: &str, efficiency: f64, time: &ModelTime) -> Technology {
    let mut technology = Technology::new(id.into(), Some("gas".into()), time);
    technology.efficiency = PeriodVec::new(time, efficiency);
    technology.emissions_coefficient = PeriodVec::new(time, 0.05);
    technology
}

fn boilers(region_id: &RegionID, time: &ModelTime) -> Subsector {
    let mut subsector = Subsector::new("boilers".into(), region_id.clone(), "heat".into(), time);
    subsector.technologies = vec![
        gas_technology("gas_boiler", 1.0, time),
        Technology::new("oil_boiler".into(), Some("oil".into()), time),
    ];
    subsector
}

fn heat_sector(region_id: &RegionID, time: &ModelTime) -> Sector {
    let mut heat_pump = Technology::new("heat_pump".into(), Some("electricity".into()), time);
    heat_pump.efficiency = PeriodVec::new(time, 3.0);
    let mut heat_pumps =
        Subsector::new("heat_pumps".into(), region_id.clone(), "heat".into(), time);
    heat_pumps.technologies.push(heat_pump);

    let mut sector = Sector::new("heat".into(), region_id.clone(), time);
    sector.subsectors = vec![boilers(region_id, time), heat_pumps];
    sector.final_demand = PeriodVec::new(time, 100.0);
    sector
}

fn electricity_sector(region_id: &RegionID, time: &ModelTime) -> Sector {
    let mut gas_power =
        Subsector::new("gas_power".into(), region_id.clone(), "electricity".into(), time);
    gas_power
        .technologies
        .push(gas_technology("gas_turbine", 0.5, time));

    let mut wind_turbine = Technology::new("wind_turbine".into(), None, time);
    wind_turbine.non_energy_cost = PeriodVec::new(time, 5.0);
    let mut wind = Subsector::new("wind".into(), region_id.clone(), "electricity".into(), time);
    wind.technologies.push(wind_turbine);

    let mut sector = Sector::new("electricity".into(), region_id.clone(), time);
    sector.subsectors = vec![gas_power, wind];
    sector
}

fn build_region(id: &str, time: &ModelTime, prices: MarketQuantities) -> Region {
    let id = RegionID::new(id);
    let sectors = vec![electricity_sector(&id, time), heat_sector(&id, time)];
    let mut region = Region::new(
        id,
        "A region".into(),
        RegionKind::PartialEquilibrium,
        sectors,
        time,
    )
    .unwrap();
    region.market.prices = prices;
    region
}

#[fixture]
pub fn subsector(model_time: ModelTime) -> Subsector {
    boilers(&"GBR".into(), &model_time)
}

#[fixture]
pub fn sector(model_time: ModelTime) -> Sector {
    let mut sector = heat_sector(&"GBR".into(), &model_time);
    sector.final_demand = PeriodVec::new(&model_time, 0.0);
    sector
}

#[fixture]
pub fn region(model_time: ModelTime, market_prices: MarketQuantities) -> Region {
    build_region("GBR", &model_time, market_prices)
}

#[fixture]
pub fn world(model_time: ModelTime, market_prices: MarketQuantities) -> World {
    let regions = vec![
        build_region("GBR", &model_time, market_prices.clone()),
        build_region("USA", &model_time, market_prices),
    ];
    World::new(model_time, regions).unwrap()
}
