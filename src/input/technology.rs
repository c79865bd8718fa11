//! Code for reading technologies and their parameters from CSV files.
use super::sector::SubsectorMap;
use super::*;
use crate::market::GoodID;
use crate::sector::SectorID;
use crate::subsector::SubsectorID;
use crate::technology::{DEFAULT_LOGIT_EXPONENT, Technology, TechnologyID};
use serde::Deserialize;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const TECHNOLOGY_PARAMETERS_FILE_NAME: &str = "technology_parameters.csv";

/// Identifies a technology: region, sector, subsector and technology ID
pub type TechnologyKey = (RegionID, SectorID, SubsectorID, TechnologyID);

/// Technologies, keyed by where they sit in the model tree
pub type TechnologyMap = IndexMap<TechnologyKey, Technology>;

#[derive(Debug, Deserialize, PartialEq)]
struct TechnologyRaw {
    id: TechnologyID,
    subsector_id: SubsectorID,
    sector_id: SectorID,
    regions: String,
    fuel: Option<GoodID>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
struct TechnologyParameterRaw {
    technology_id: TechnologyID,
    subsector_id: SubsectorID,
    sector_id: SectorID,
    regions: String,
    year: u32,
    share_weight: Option<f64>,
    logit_exponent: Option<f64>,
    non_energy_cost: Option<f64>,
    efficiency: Option<f64>,
    emissions_coefficient: Option<f64>,
    fixed_output: Option<f64>,
    calibration_output: Option<f64>,
}

/// Check that an optional value is finite and not negative
fn check_non_negative(value: Option<f64>, name: &str) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value >= 0.0,
            "{name} must be a finite number greater than or equal to zero"
        );
    }

    Ok(())
}

impl TechnologyParameterRaw {
    fn validate(&self) -> Result<()> {
        check_non_negative(self.share_weight, "share_weight")?;
        check_non_negative(self.non_energy_cost, "non_energy_cost")?;
        check_non_negative(self.emissions_coefficient, "emissions_coefficient")?;
        check_non_negative(self.fixed_output, "fixed_output")?;
        check_non_negative(self.calibration_output, "calibration_output")?;
        if let Some(exponent) = self.logit_exponent {
            ensure!(
                exponent.is_finite() && exponent <= 0.0,
                "logit_exponent must be a finite number less than or equal to zero"
            );
        }
        if let Some(efficiency) = self.efficiency {
            ensure!(
                efficiency.is_finite() && efficiency > 0.0,
                "efficiency must be a finite number greater than zero"
            );
        }
        ensure!(
            self.fixed_output.is_none() || self.calibration_output.is_none(),
            "A technology cannot have both a fixed output and a calibration output in the same year"
        );

        Ok(())
    }
}

/// Read technologies from `technologies.csv` and their parameters from
/// `technology_parameters.csv`.
///
/// Every technology must belong to a known subsector in each of its regions.
pub fn read_technologies(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    subsectors: &SubsectorMap,
    time: &ModelTime,
) -> Result<TechnologyMap> {
    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let iter = read_csv::<TechnologyRaw>(&file_path)?;
    let mut technologies = read_technologies_from_iter(iter, region_ids, subsectors, time)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TECHNOLOGY_PARAMETERS_FILE_NAME);
    let iter = read_csv_optional::<TechnologyParameterRaw>(&file_path)?;
    read_technology_parameters_from_iter(iter, region_ids, &mut technologies, time)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(technologies)
}

fn read_technologies_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    subsectors: &SubsectorMap,
    time: &ModelTime,
) -> Result<TechnologyMap>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut technologies = TechnologyMap::new();
    for raw in iter {
        for region_id in parse_row_regions(&raw.regions, region_ids, &raw.id)? {
            let subsector_key = (
                region_id.clone(),
                raw.sector_id.clone(),
                raw.subsector_id.clone(),
            );
            ensure!(
                subsectors.contains_key(&subsector_key),
                "Technology {} refers to subsector {} of sector {}, which is not present in region \
                {region_id}",
                raw.id,
                raw.subsector_id,
                raw.sector_id
            );
            let technology = Technology::new(raw.id.clone(), raw.fuel.clone(), time);
            try_insert(
                &mut technologies,
                (
                    region_id,
                    raw.sector_id.clone(),
                    raw.subsector_id.clone(),
                    raw.id.clone(),
                ),
                technology,
            )?;
        }
    }

    Ok(technologies)
}

fn read_technology_parameters_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    technologies: &mut TechnologyMap,
    time: &ModelTime,
) -> Result<()>
where
    I: Iterator<Item = TechnologyParameterRaw>,
{
    let mut rows = Vec::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid parameters for technology {}", raw.technology_id))?;
        let period = period_for_year(time, raw.year)?;
        for region_id in parse_row_regions(&raw.regions, region_ids, &raw.technology_id)? {
            let key = (
                region_id,
                raw.sector_id.clone(),
                raw.subsector_id.clone(),
                raw.technology_id.clone(),
            );
            ensure!(
                technologies.contains_key(&key),
                "Parameters given for unknown technology {}",
                technology_name(&key)
            );
            rows.push((key, period, raw.clone()));
        }
    }

    for (key, rows) in group_rows_by_period(rows)? {
        let technology = &mut technologies[&key];
        let context = || format!("Invalid parameters for technology {}", technology_name(&key));

        let (share_weight, anchor) =
            interpolate(time, &sparse_values(&rows, |row| row.share_weight), 1.0)
                .with_context(context)?;
        technology.share_weight = share_weight;
        technology.share_weight_anchor = anchor;
        technology.logit_exponent = carry_forward(
            time,
            &sparse_values(&rows, |row| row.logit_exponent),
            DEFAULT_LOGIT_EXPONENT,
        )
        .with_context(context)?;
        technology.non_energy_cost = carry_forward(
            time,
            &sparse_values(&rows, |row| row.non_energy_cost),
            0.0,
        )
        .with_context(context)?;
        technology.efficiency =
            carry_forward(time, &sparse_values(&rows, |row| row.efficiency), 1.0)
                .with_context(context)?;
        technology.emissions_coefficient = carry_forward(
            time,
            &sparse_values(&rows, |row| row.emissions_coefficient),
            0.0,
        )
        .with_context(context)?;
        technology.fixed_output =
            per_period_only(time, &sparse_values(&rows, |row| row.fixed_output));
        technology.calibration_output =
            per_period_only(time, &sparse_values(&rows, |row| row.calibration_output));
    }

    Ok(())
}

fn technology_name((region_id, sector_id, subsector_id, technology_id): &TechnologyKey) -> String {
    format!(
        "{technology_id} in subsector {subsector_id} of sector {sector_id} in region {region_id}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_time, region_ids};
    use crate::subsector::Subsector;
    use itertools::Itertools;
    use rstest::{fixture, rstest};

    fn key(region_id: &str) -> TechnologyKey {
        (
            region_id.into(),
            "heat".into(),
            "boilers".into(),
            "gas_boiler".into(),
        )
    }

    #[fixture]
    fn subsectors(model_time: ModelTime) -> SubsectorMap {
        let subsector = Subsector::new("boilers".into(), "GBR".into(), "heat".into(), &model_time);
        SubsectorMap::from([(("GBR".into(), "heat".into(), "boilers".into()), subsector)])
    }

    fn technology_raw(regions: &str) -> TechnologyRaw {
        TechnologyRaw {
            id: "gas_boiler".into(),
            subsector_id: "boilers".into(),
            sector_id: "heat".into(),
            regions: regions.into(),
            fuel: Some("gas".into()),
        }
    }

    fn raw(year: u32) -> TechnologyParameterRaw {
        TechnologyParameterRaw {
            technology_id: "gas_boiler".into(),
            subsector_id: "boilers".into(),
            sector_id: "heat".into(),
            regions: "GBR".into(),
            year,
            share_weight: None,
            logit_exponent: None,
            non_energy_cost: None,
            efficiency: None,
            emissions_coefficient: None,
            fixed_output: None,
            calibration_output: None,
        }
    }

    #[fixture]
    fn technologies(
        region_ids: HashSet<RegionID>,
        subsectors: SubsectorMap,
        model_time: ModelTime,
    ) -> TechnologyMap {
        read_technologies_from_iter(
            [technology_raw("GBR")].into_iter(),
            &region_ids,
            &subsectors,
            &model_time,
        )
        .unwrap()
    }

    #[rstest]
    fn test_read_technologies_from_iter(technologies: TechnologyMap) {
        let technology = &technologies[&key("GBR")];
        assert_eq!(technology.fuel, Some("gas".into()));
    }

    #[rstest]
    fn test_read_technologies_from_iter_unknown_subsector(
        region_ids: HashSet<RegionID>,
        subsectors: SubsectorMap,
        model_time: ModelTime,
    ) {
        assert_error!(
            read_technologies_from_iter(
                [technology_raw("USA")].into_iter(),
                &region_ids,
                &subsectors,
                &model_time,
            ),
            "Technology gas_boiler refers to subsector boilers of sector heat, which is not \
            present in region USA"
        );
    }

    #[rstest]
    fn test_read_technology_parameters(
        region_ids: HashSet<RegionID>,
        mut technologies: TechnologyMap,
        model_time: ModelTime,
    ) {
        let rows = [
            TechnologyParameterRaw {
                efficiency: Some(0.9),
                non_energy_cost: Some(1.0),
                calibration_output: Some(20.0),
                ..raw(2005)
            },
            TechnologyParameterRaw {
                efficiency: Some(0.95),
                fixed_output: Some(5.0),
                ..raw(2015)
            },
        ];
        read_technology_parameters_from_iter(
            rows.into_iter(),
            &region_ids,
            &mut technologies,
            &model_time,
        )
        .unwrap();

        let technology = &technologies[&key("GBR")];
        assert_eq!(
            technology.efficiency.iter().copied().collect_vec(),
            [0.9, 0.9, 0.95]
        );
        assert_eq!(technology.non_energy_cost.iter().copied().collect_vec(), [1.0; 3]);
        assert_eq!(
            technology.calibration_output.iter().copied().collect_vec(),
            [Some(20.0), None, None]
        );
        assert_eq!(
            technology.fixed_output.iter().copied().collect_vec(),
            [None, None, Some(5.0)]
        );
        assert!(!technology.share_weight_anchor.iter().any(|&anchor| anchor));
    }

    #[rstest]
    #[case(TechnologyParameterRaw { efficiency: Some(0.0), ..raw(2005) })]
    #[case(TechnologyParameterRaw { non_energy_cost: Some(-1.0), ..raw(2005) })]
    #[case(TechnologyParameterRaw { fixed_output: Some(1.0), calibration_output: Some(1.0), ..raw(2005) })]
    fn test_read_technology_parameters_invalid(
        region_ids: HashSet<RegionID>,
        mut technologies: TechnologyMap,
        model_time: ModelTime,
        #[case] row: TechnologyParameterRaw,
    ) {
        assert_error!(
            read_technology_parameters_from_iter(
                [row].into_iter(),
                &region_ids,
                &mut technologies,
                &model_time,
            ),
            "Invalid parameters for technology gas_boiler"
        );
    }
}
