//! Code for reading final demands and market prices from CSV files.
use super::sector::SectorMap;
use super::*;
use crate::id::IDCollection;
use crate::market::{GoodID, MarketQuantities};
use crate::sector::SectorID;
use serde::Deserialize;

const DEMAND_FILE_NAME: &str = "demand.csv";
const MARKET_PRICES_FILE_NAME: &str = "market_prices.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct DemandRaw {
    region_id: RegionID,
    sector_id: SectorID,
    year: u32,
    demand: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct MarketPriceRaw {
    region_id: RegionID,
    good: GoodID,
    year: u32,
    price: f64,
}

/// Read final demands from `demand.csv` into the sectors.
///
/// Demands carry forward from the last year given. Sectors without a row have no final demand.
pub fn read_demand(model_dir: &Path, sectors: &mut SectorMap, time: &ModelTime) -> Result<()> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let iter = read_csv::<DemandRaw>(&file_path)?;
    read_demand_from_iter(iter, sectors, time).with_context(|| input_err_msg(&file_path))
}

fn read_demand_from_iter<I>(iter: I, sectors: &mut SectorMap, time: &ModelTime) -> Result<()>
where
    I: Iterator<Item = DemandRaw>,
{
    let mut rows = Vec::new();
    for raw in iter {
        ensure!(
            raw.demand.is_finite() && raw.demand >= 0.0,
            "Demand for sector {} in region {} must be a finite number greater than or equal to \
            zero",
            raw.sector_id,
            raw.region_id
        );
        let key = (raw.region_id, raw.sector_id);
        ensure!(
            sectors.contains_key(&key),
            "Demand given for unknown sector {} in region {}",
            key.1,
            key.0
        );
        rows.push((key, period_for_year(time, raw.year)?, raw.demand));
    }

    for (key, rows) in group_rows_by_period(rows)? {
        sectors[&key].final_demand = carry_forward(time, &rows, 0.0)
            .with_context(|| format!("Invalid demand for sector {} in region {}", key.1, key.0))?;
    }

    Ok(())
}

/// Read initial market prices from `market_prices.csv`.
///
/// Prices carry forward from the last year given.
pub fn read_market_prices(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<IndexMap<RegionID, MarketQuantities>> {
    let file_path = model_dir.join(MARKET_PRICES_FILE_NAME);
    let iter = read_csv::<MarketPriceRaw>(&file_path)?;
    read_market_prices_from_iter(iter, region_ids, time).with_context(|| input_err_msg(&file_path))
}

fn read_market_prices_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<IndexMap<RegionID, MarketQuantities>>
where
    I: Iterator<Item = MarketPriceRaw>,
{
    let mut rows = Vec::new();
    for raw in iter {
        let region_id = region_ids.get_id_by_str(&raw.region_id.0)?;
        ensure!(
            raw.price.is_finite() && raw.price >= 0.0,
            "Price for {} in region {region_id} must be a finite number greater than or equal to \
            zero",
            raw.good
        );
        rows.push(((region_id, raw.good), period_for_year(time, raw.year)?, raw.price));
    }

    let mut prices: IndexMap<RegionID, MarketQuantities> = IndexMap::new();
    for ((region_id, good), rows) in group_rows_by_period(rows)? {
        let values = carry_forward(time, &rows, 0.0)
            .with_context(|| format!("Invalid prices for {good} in region {region_id}"))?;
        let region_prices = prices.entry(region_id).or_default();
        for (period, &price) in values.iter().enumerate() {
            region_prices.insert(&good, period, price);
        }
    }

    Ok(prices)
}
