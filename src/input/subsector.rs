//! Code for reading subsector parameters from a CSV file.
use super::sector::SubsectorMap;
use super::*;
use crate::sector::SectorID;
use crate::subsector::{Subsector, SubsectorID};
use crate::technology::DEFAULT_LOGIT_EXPONENT;
use serde::Deserialize;

const SUBSECTOR_PARAMETERS_FILE_NAME: &str = "subsector_parameters.csv";

#[derive(Debug, Deserialize, PartialEq, Clone)]
struct SubsectorParameterRaw {
    subsector_id: SubsectorID,
    sector_id: SectorID,
    regions: String,
    year: u32,
    share_weight: Option<f64>,
    logit_exponent: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    capacity_limit: Option<f64>,
    #[serde(default, deserialize_with = "deserialise_optional_proportion")]
    fixed_share: Option<f64>,
}

impl SubsectorParameterRaw {
    fn validate(&self) -> Result<()> {
        if let Some(share_weight) = self.share_weight {
            ensure!(
                share_weight.is_finite() && share_weight >= 0.0,
                "share_weight must be a finite number greater than or equal to zero"
            );
        }
        if let Some(exponent) = self.logit_exponent {
            ensure!(
                exponent.is_finite() && exponent <= 0.0,
                "logit_exponent must be a finite number less than or equal to zero"
            );
        }

        Ok(())
    }
}

/// Read `subsector_parameters.csv` and apply its values to the subsectors.
///
/// The file is optional. Share weights are interpolated between the years given, logit exponents
/// and capacity limits carry forward and fixed shares apply only in the years given.
pub fn read_subsector_parameters(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    subsectors: &mut SubsectorMap,
    time: &ModelTime,
) -> Result<()> {
    let file_path = model_dir.join(SUBSECTOR_PARAMETERS_FILE_NAME);
    let iter = read_csv_optional::<SubsectorParameterRaw>(&file_path)?;
    read_subsector_parameters_from_iter(iter, region_ids, subsectors, time)
        .with_context(|| input_err_msg(&file_path))
}

fn read_subsector_parameters_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    subsectors: &mut SubsectorMap,
    time: &ModelTime,
) -> Result<()>
where
    I: Iterator<Item = SubsectorParameterRaw>,
{
    let mut rows = Vec::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid parameters for subsector {}", raw.subsector_id))?;
        let period = period_for_year(time, raw.year)?;
        for region_id in parse_row_regions(&raw.regions, region_ids, &raw.subsector_id)? {
            let key = (region_id, raw.sector_id.clone(), raw.subsector_id.clone());
            ensure!(
                subsectors.contains_key(&key),
                "Parameters given for unknown subsector {} of sector {} in region {}",
                key.2,
                key.1,
                key.0
            );
            rows.push((key, period, raw.clone()));
        }
    }

    for (key, rows) in group_rows_by_period(rows)? {
        let subsector = &mut subsectors[&key];
        let context = || format!("Invalid parameters for subsector {}", subsector_name(&key));

        let (share_weight, anchor) =
            interpolate(time, &sparse_values(&rows, |row| row.share_weight), 1.0)
                .with_context(context)?;
        subsector.base_share_weight = share_weight;
        subsector.share_weight_anchor = anchor;
        subsector.logit_exponent = carry_forward(
            time,
            &sparse_values(&rows, |row| row.logit_exponent),
            DEFAULT_LOGIT_EXPONENT,
        )
        .with_context(context)?;
        subsector.capacity_limit = carry_forward(
            time,
            &sparse_values(&rows, |row| row.capacity_limit),
            1.0,
        )
        .with_context(context)?;
        subsector.fixed_share = per_period_only(time, &sparse_values(&rows, |row| row.fixed_share));
        check_fixed_shares_within_limits(subsector, time).with_context(context)?;
    }

    Ok(())
}

/// Check that no fixed share is larger than the subsector's capacity limit for the same year
fn check_fixed_shares_within_limits(subsector: &Subsector, time: &ModelTime) -> Result<()> {
    for period in time.iter_periods() {
        let Some(fixed_share) = subsector.fixed_share[period] else {
            continue;
        };
        let limit = subsector.capacity_limit[period];
        ensure!(
            fixed_share <= limit,
            "fixed_share of {fixed_share} exceeds capacity_limit of {limit} in {}",
            time.year(period)
        );
    }

    Ok(())
}

fn subsector_name((region_id, sector_id, subsector_id): &(RegionID, SectorID, SubsectorID)) -> String {
    format!("{subsector_id} of sector {sector_id} in region {region_id}")
}
