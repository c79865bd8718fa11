//! Code for reading sectors and subsectors from CSV files.
use super::subsector::read_subsector_parameters;
use super::*;
use crate::sector::SectorID;
use crate::subsector::{Subsector, SubsectorID};
use serde::Deserialize;

const SECTORS_FILE_NAME: &str = "sectors.csv";
const SUBSECTORS_FILE_NAME: &str = "subsectors.csv";

/// Sectors, keyed by region and sector ID
pub type SectorMap = IndexMap<(RegionID, SectorID), Sector>;

/// Subsectors, keyed by region, sector and subsector ID
pub type SubsectorMap = IndexMap<(RegionID, SectorID, SubsectorID), Subsector>;

#[derive(Debug, Deserialize, PartialEq)]
struct SectorRaw {
    id: SectorID,
    regions: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct SubsectorRaw {
    id: SubsectorID,
    sector_id: SectorID,
    regions: String,
}

/// Read sectors from `sectors.csv`.
///
/// Each row describes a sector present in one or more regions. A sector produces the good with
/// the same name.
pub fn read_sectors(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<SectorMap> {
    let file_path = model_dir.join(SECTORS_FILE_NAME);
    let iter = read_csv::<SectorRaw>(&file_path)?;
    read_sectors_from_iter(iter, region_ids, time).with_context(|| input_err_msg(&file_path))
}

fn read_sectors_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<SectorMap>
where
    I: Iterator<Item = SectorRaw>,
{
    let mut sectors = SectorMap::new();
    for raw in iter {
        for region_id in parse_row_regions(&raw.regions, region_ids, &raw.id)? {
            let sector = Sector::new(raw.id.clone(), region_id.clone(), time);
            try_insert(&mut sectors, (region_id, raw.id.clone()), sector)?;
        }
    }

    Ok(sectors)
}

/// Read subsectors from `subsectors.csv`, along with their parameters.
///
/// Every subsector must belong to a sector present in each of its regions.
pub fn read_subsectors(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    sectors: &SectorMap,
    time: &ModelTime,
) -> Result<SubsectorMap> {
    let file_path = model_dir.join(SUBSECTORS_FILE_NAME);
    let iter = read_csv::<SubsectorRaw>(&file_path)?;
    let mut subsectors = read_subsectors_from_iter(iter, region_ids, sectors, time)
        .with_context(|| input_err_msg(&file_path))?;
    read_subsector_parameters(model_dir, region_ids, &mut subsectors, time)?;

    Ok(subsectors)
}

fn read_subsectors_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    sectors: &SectorMap,
    time: &ModelTime,
) -> Result<SubsectorMap>
where
    I: Iterator<Item = SubsectorRaw>,
{
    let mut subsectors = SubsectorMap::new();
    for raw in iter {
        for region_id in parse_row_regions(&raw.regions, region_ids, &raw.id)? {
            ensure!(
                sectors.contains_key(&(region_id.clone(), raw.sector_id.clone())),
                "Subsector {} refers to sector {}, which is not present in region {region_id}",
                raw.id,
                raw.sector_id
            );
            let subsector = Subsector::new(
                raw.id.clone(),
                region_id.clone(),
                raw.sector_id.clone(),
                time,
            );
            try_insert(
                &mut subsectors,
                (region_id, raw.sector_id.clone(), raw.id.clone()),
                subsector,
            )?;
        }
    }

    Ok(subsectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_time, region_ids};
    use rstest::rstest;

    fn sector_raw(id: &str, regions: &str) -> SectorRaw {
        SectorRaw {
            id: id.into(),
            regions: regions.into(),
        }
    }

    fn subsector_raw(id: &str, sector_id: &str, regions: &str) -> SubsectorRaw {
        SubsectorRaw {
            id: id.into(),
            sector_id: sector_id.into(),
            regions: regions.into(),
        }
    }

    #[rstest]
    fn test_read_sectors_from_iter(region_ids: HashSet<RegionID>, model_time: ModelTime) {
        let sectors = read_sectors_from_iter(
            [sector_raw("heat", "all"), sector_raw("electricity", "GBR")].into_iter(),
            &region_ids,
            &model_time,
        )
        .unwrap();
        assert_eq!(sectors.len(), 3);
        let electricity = &sectors[&(RegionID::new("GBR"), SectorID::new("electricity"))];
        assert_eq!(&*electricity.good.0, "electricity");
        assert!(!sectors.contains_key(&(RegionID::new("USA"), SectorID::new("electricity"))));
    }

    #[rstest]
    fn test_read_sectors_from_iter_duplicate(
        region_ids: HashSet<RegionID>,
        model_time: ModelTime,
    ) {
        assert!(
            read_sectors_from_iter(
                [sector_raw("heat", "GBR"), sector_raw("heat", "all")].into_iter(),
                &region_ids,
                &model_time,
            )
            .is_err()
        );
    }

    #[rstest]
    fn test_read_subsectors_from_iter(region_ids: HashSet<RegionID>, model_time: ModelTime) {
        let sectors = read_sectors_from_iter(
            [sector_raw("heat", "GBR")].into_iter(),
            &region_ids,
            &model_time,
        )
        .unwrap();

        let subsectors = read_subsectors_from_iter(
            [subsector_raw("boilers", "heat", "GBR")].into_iter(),
            &region_ids,
            &sectors,
            &model_time,
        )
        .unwrap();
        let key = (
            RegionID::new("GBR"),
            SectorID::new("heat"),
            SubsectorID::new("boilers"),
        );
        assert_eq!(subsectors[&key].sector_id, SectorID::new("heat"));

        assert_error!(
            read_subsectors_from_iter(
                [subsector_raw("boilers", "heat", "USA")].into_iter(),
                &region_ids,
                &sectors,
                &model_time,
            ),
            "Subsector boilers refers to sector heat, which is not present in region USA"
        );
    }
}
