//! Common routines for handling input data.
use crate::id::IDLike;
use crate::model::{Model, ModelParameters};
use crate::period::{ModelTime, PeriodVec};
use crate::region::{Region, RegionID, parse_region_str};
use crate::sector::Sector;
use crate::world::World;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

mod market;
use market::{read_demand, read_market_prices};
mod policy;
use policy::read_carbon_taxes;
mod region;
use region::read_regions;
mod sector;
use sector::{read_sectors, read_subsectors};
mod subsector;
mod technology;
use technology::read_technologies;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    ensure!(!vec.is_empty(), "CSV file {} cannot be empty", file_path.display());

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file, returning an empty iterator if the file is absent
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::Reader::from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?
    }

    Ok(value)
}

/// Read an optional f64, checking that it is between 0 and 1 if present
pub fn deserialise_optional_proportion<'de, D>(deserialiser: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserialiser)?;
    if value.is_some_and(|value| !(0.0..=1.0).contains(&value)) {
        Err(serde::de::Error::custom("Value must be between 0 and 1"))?
    }

    Ok(value)
}

/// Check whether an iterator contains values that are sorted and unique
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}

/// Insert a key-value pair into a map, raising an error if the key already exists
pub fn try_insert<K, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> Result<()>
where
    K: Eq + std::hash::Hash + std::fmt::Debug,
{
    ensure!(!map.contains_key(&key), "Duplicate entry for {key:?}");
    map.insert(key, value);
    Ok(())
}

/// Get the IDs of the regions a row of input data applies to, in sorted order
pub fn parse_row_regions<ID: IDLike>(
    regions: &str,
    region_ids: &HashSet<RegionID>,
    row_id: &ID,
) -> Result<Vec<RegionID>> {
    let regions = parse_region_str(regions, region_ids)
        .with_context(|| format!("Invalid regions for {row_id}"))?;
    Ok(regions.into_iter().sorted().collect())
}

/// Values of a parameter given for some model periods
pub type SparseValues<T> = BTreeMap<usize, T>;

/// Get the period index for a year of input data, which must be a model year
pub fn period_for_year(time: &ModelTime, year: u32) -> Result<usize> {
    time.period_of_year(year)
        .with_context(|| format!("{year} is not a model year"))
}

/// Expand sparse values to every period by carrying each value forward.
///
/// Either no values are given, in which case every period takes `default`, or the first model
/// year must be given.
pub fn carry_forward<T: Clone>(
    time: &ModelTime,
    values: &SparseValues<T>,
    default: T,
) -> Result<PeriodVec<T>> {
    let mut out = PeriodVec::new(time, default);
    if values.is_empty() {
        return Ok(out);
    }
    check_first_year_given(time, values)?;

    for (&period, value) in values {
        out.fill_from(period, value.clone());
    }

    Ok(out)
}

/// Expand sparse values to every period by linear interpolation between the given years.
///
/// Values after the last given year are held constant. Returns the values and whether each
/// period was given explicitly.
pub fn interpolate(
    time: &ModelTime,
    values: &SparseValues<f64>,
    default: f64,
) -> Result<(PeriodVec<f64>, PeriodVec<bool>)> {
    let mut out = carry_forward(time, values, default)?;
    let mut given = PeriodVec::new(time, false);
    for &period in values.keys() {
        given[period] = true;
    }

    for ((&begin, &begin_value), (&end, &end_value)) in values.iter().tuple_windows() {
        let span = f64::from(time.year(end) - time.year(begin));
        for period in begin + 1..end {
            let fraction = f64::from(time.year(period) - time.year(begin)) / span;
            out[period] = begin_value + (end_value - begin_value) * fraction;
        }
    }

    Ok((out, given))
}

/// Values given only for the periods in which they apply
pub fn per_period_only<T: Clone>(time: &ModelTime, values: &SparseValues<T>) -> PeriodVec<Option<T>> {
    let mut out = PeriodVec::new(time, None);
    for (&period, value) in values {
        out[period] = Some(value.clone());
    }
    out
}

/// Rows of per-period input data, grouped by the entity they apply to
pub type PeriodRows<K, R> = IndexMap<K, BTreeMap<usize, R>>;

/// Group rows of per-period input data by entity, checking that no period is given twice
pub fn group_rows_by_period<K, R, I>(rows: I) -> Result<PeriodRows<K, R>>
where
    K: Eq + std::hash::Hash + std::fmt::Debug,
    I: IntoIterator<Item = (K, usize, R)>,
{
    let mut map: PeriodRows<K, R> = IndexMap::new();
    for (key, period, row) in rows {
        ensure!(
            !map.get(&key).is_some_and(|periods| periods.contains_key(&period)),
            "Duplicate entry for {key:?} in the same year"
        );
        map.entry(key).or_default().insert(period, row);
    }

    Ok(map)
}

/// Pick out the periods for which one parameter has a value
pub fn sparse_values<R, T, F>(rows: &BTreeMap<usize, R>, value: F) -> SparseValues<T>
where
    F: Fn(&R) -> Option<T>,
{
    rows.iter()
        .filter_map(|(&period, row)| Some((period, value(row)?)))
        .collect()
}

fn check_first_year_given<T>(time: &ModelTime, values: &SparseValues<T>) -> Result<()> {
    ensure!(
        values.contains_key(&0),
        "Data must be provided for the first model year ({})",
        time.year(0)
    );

    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The model, with market prices, demands and policies loaded, or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let time = ModelTime::new(parameters.years.clone())?;

    let region_records = read_regions(model_dir)?;
    let region_ids: HashSet<_> = region_records.keys().cloned().collect();

    let mut sectors = read_sectors(model_dir, &region_ids, &time)?;
    let mut subsectors = read_subsectors(model_dir, &region_ids, &sectors, &time)?;
    let technologies = read_technologies(model_dir, &region_ids, &subsectors, &time)?;
    read_demand(model_dir, &mut sectors, &time)?;
    let mut prices = read_market_prices(model_dir, &region_ids, &time)?;
    let policies = read_carbon_taxes(model_dir, &region_ids, &time)?;

    // Assemble the tree from the leaves up
    for ((region_id, sector_id, subsector_id, _), technology) in technologies {
        subsectors[&(region_id, sector_id, subsector_id)]
            .technologies
            .push(technology);
    }
    for ((region_id, sector_id, _), subsector) in subsectors {
        sectors[&(region_id, sector_id)].subsectors.push(subsector);
    }

    let mut sectors_by_region: IndexMap<RegionID, Vec<Sector>> = IndexMap::new();
    for ((region_id, _), sector) in sectors {
        sectors_by_region.entry(region_id).or_default().push(sector);
    }

    let mut regions = Vec::with_capacity(region_records.len());
    for (region_id, record) in region_records {
        let region_sectors = sectors_by_region
            .shift_remove(&region_id)
            .unwrap_or_default();
        let mut region = Region::new(
            region_id.clone(),
            record.description,
            record.kind,
            region_sectors,
            &time,
        )?;
        if let Some(region_prices) = prices.shift_remove(&region_id) {
            region.market.prices = region_prices;
        }
        regions.push(region);
    }

    let world = World::new(time, regions)?;
    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        world,
        policies,
    })
}
