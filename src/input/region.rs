//! Code for reading region-related information from CSV files.
use super::*;
use crate::region::RegionKind;
use serde::Deserialize;

const REGIONS_FILE_NAME: &str = "regions.csv";

/// A region as described in `regions.csv`, before its sectors are attached
#[derive(Debug, Deserialize, PartialEq)]
pub struct RegionRecord {
    /// A unique identifier for the region
    pub id: RegionID,
    /// A text description of the region
    pub description: String,
    /// The kind of economy modelled
    pub kind: RegionKind,
}

/// Reads regions from a CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of region records, in file order, or an error
pub fn read_regions(model_dir: &Path) -> Result<IndexMap<RegionID, RegionRecord>> {
    let file_path = model_dir.join(REGIONS_FILE_NAME);
    read_regions_from_iter(read_csv(&file_path)?).with_context(|| input_err_msg(&file_path))
}

fn read_regions_from_iter<I>(iter: I) -> Result<IndexMap<RegionID, RegionRecord>>
where
    I: Iterator<Item = RegionRecord>,
{
    let mut regions = IndexMap::new();
    for record in iter {
        ensure!(
            !record.id.0.is_empty(),
            "Region IDs cannot be empty"
        );
        ensure!(
            !record.id.0.eq_ignore_ascii_case("all"),
            "\"all\" is not a valid region ID"
        );
        let id = record.id.clone();
        ensure!(
            regions.insert(id.clone(), record).is_none(),
            "Duplicate region ID {id}"
        );
    }

    Ok(regions)
}
