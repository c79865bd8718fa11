//! The module responsible for writing output data to disk.
use crate::calibration::is_within_accuracy;
use crate::market::GoodID;
use crate::region::{Region, RegionID};
use crate::sector::SectorID;
use crate::subsector::{Subsector, SubsectorID};
use crate::technology::{Technology, TechnologyID};
use crate::visitor::ModelVisitor;
use crate::world::World;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "equishare_results";

/// The output file name for technology shares
const SHARES_FILE_NAME: &str = "shares.csv";

/// The output file name for market prices, supplies and demands
const MARKETS_FILE_NAME: &str = "markets.csv";

/// The output file name for calibration results
const CALIBRATION_FILE_NAME: &str = "calibration.csv";

/// The output file name for share weights used in each calculation
const SHARE_WEIGHTS_FILE_NAME: &str = "debug_share_weights.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Returns
///
/// `true` if an existing directory was overwritten, `false` otherwise
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Empty folder
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass \
            the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the shares CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ShareRow {
    year: u32,
    region_id: RegionID,
    sector_id: SectorID,
    subsector_id: SubsectorID,
    technology_id: TechnologyID,
    share: f64,
    output: f64,
    price: f64,
}

/// Represents a row in the markets CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct MarketRow {
    year: u32,
    region_id: RegionID,
    good: GoodID,
    price: Option<f64>,
    supply: f64,
    demand: f64,
}

/// Represents a row in the calibration CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CalibrationRow {
    year: u32,
    region_id: RegionID,
    sector_id: SectorID,
    subsector_id: SubsectorID,
    target: f64,
    output: f64,
    calibrated: bool,
}

/// Represents a row in the share weights debug CSV file.
///
/// Rows without a technology ID are for the subsector itself.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ShareWeightRow {
    year: u32,
    region_id: RegionID,
    sector_id: SectorID,
    subsector_id: SubsectorID,
    technology_id: Option<TechnologyID>,
    share_weight: f64,
}

/// Collects output rows while walking the model tree for one period
#[derive(Default)]
struct PeriodReport {
    year: u32,
    calibration_accuracy: f64,
    shares: Vec<ShareRow>,
    markets: Vec<MarketRow>,
    calibration: Vec<CalibrationRow>,
    share_weights: Vec<ShareWeightRow>,
}

impl ModelVisitor for PeriodReport {
    fn visit_region(&mut self, region: &Region, period: usize) {
        // Goods appear once, in the order they were first seen
        let mut goods: IndexMap<&GoodID, MarketRow> = IndexMap::new();
        let market = &region.market;
        let quantities = [&market.prices, &market.supplies, &market.demands];
        for quantity in quantities {
            for (good, _) in quantity.iter_period(period) {
                goods.entry(good).or_insert_with(|| MarketRow {
                    year: self.year,
                    region_id: region.id.clone(),
                    good: good.clone(),
                    price: market.prices.get(good, period),
                    supply: market.supplies.get(good, period).unwrap_or_default(),
                    demand: market.demands.get(good, period).unwrap_or_default(),
                });
            }
        }
        self.markets.extend(goods.into_values());
    }

    fn visit_subsector(&mut self, subsector: &Subsector, period: usize) {
        self.share_weights.push(ShareWeightRow {
            year: self.year,
            region_id: subsector.region_id.clone(),
            sector_id: subsector.sector_id.clone(),
            subsector_id: subsector.id.clone(),
            technology_id: None,
            share_weight: subsector.share_weight(period),
        });

        if let Some(target) = subsector.calibration_target(period) {
            let output = subsector.output(period);
            self.calibration.push(CalibrationRow {
                year: self.year,
                region_id: subsector.region_id.clone(),
                sector_id: subsector.sector_id.clone(),
                subsector_id: subsector.id.clone(),
                target,
                output,
                calibrated: is_within_accuracy(output, target, self.calibration_accuracy),
            });
        }
    }

    fn visit_technology(&mut self, subsector: &Subsector, technology: &Technology, period: usize) {
        self.shares.push(ShareRow {
            year: self.year,
            region_id: subsector.region_id.clone(),
            sector_id: subsector.sector_id.clone(),
            subsector_id: subsector.id.clone(),
            technology_id: technology.id.clone(),
            share: technology.share(period),
            output: technology.output(period),
            price: technology.cost(period),
        });
        self.share_weights.push(ShareWeightRow {
            year: self.year,
            region_id: subsector.region_id.clone(),
            sector_id: subsector.sector_id.clone(),
            subsector_id: subsector.id.clone(),
            technology_id: Some(technology.id.clone()),
            share_weight: technology.calibrated_share_weight(period),
        });
    }
}

/// An object for writing model results to file
pub struct DataWriter {
    shares_writer: csv::Writer<File>,
    markets_writer: csv::Writer<File>,
    calibration_writer: csv::Writer<File>,
    share_weights_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let share_weights_writer = if save_debug_info {
            Some(new_writer(SHARE_WEIGHTS_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            shares_writer: new_writer(SHARES_FILE_NAME)?,
            markets_writer: new_writer(MARKETS_FILE_NAME)?,
            calibration_writer: new_writer(CALIBRATION_FILE_NAME)?,
            share_weights_writer,
        })
    }

    /// Write the results of a period for every region in the world
    pub fn write_period(
        &mut self,
        world: &World,
        period: usize,
        calibration_accuracy: f64,
    ) -> Result<()> {
        let mut report = PeriodReport {
            year: world.time().year(period),
            calibration_accuracy,
            ..Default::default()
        };
        world.accept(&mut report, period);

        for row in report.shares {
            self.shares_writer.serialize(row)?;
        }
        for row in report.markets {
            self.markets_writer.serialize(row)?;
        }
        for row in report.calibration {
            self.calibration_writer.serialize(row)?;
        }
        if let Some(wtr) = &mut self.share_weights_writer {
            for row in report.share_weights {
                wtr.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.shares_writer.flush()?;
        self.markets_writer.flush()?;
        self.calibration_writer.flush()?;
        if let Some(wtr) = &mut self.share_weights_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::world;
    use itertools::Itertools;
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
        csv::Reader::from_path(path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_period(mut world: World) {
        world.calc(0, &[]).unwrap();

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_period(&world, 0, 1e-3).unwrap();
            writer.flush().unwrap();
        }

        let shares: Vec<ShareRow> = read_rows(&dir.path().join(SHARES_FILE_NAME));
        // Five technologies in each of two regions
        assert_eq!(shares.len(), 10);
        assert!(shares.iter().all(|row| row.year == 2005));
        let gbr_heat_output: f64 = shares
            .iter()
            .filter(|row| &*row.region_id.0 == "GBR" && &*row.sector_id.0 == "heat")
            .map(|row| row.output)
            .sum();
        float_cmp::assert_approx_eq!(f64, gbr_heat_output, 100.0, epsilon = 1e-9);

        let markets: Vec<MarketRow> = read_rows(&dir.path().join(MARKETS_FILE_NAME));
        let gbr_heat = markets
            .iter()
            .find(|row| &*row.region_id.0 == "GBR" && &*row.good.0 == "heat")
            .unwrap();
        assert_eq!(gbr_heat.price, None);
        assert_eq!(gbr_heat.demand, 100.0);

        // No calibration data in the fixture
        let calibration: Vec<CalibrationRow> = read_rows(&dir.path().join(CALIBRATION_FILE_NAME));
        assert!(calibration.is_empty());
        assert!(!dir.path().join(SHARE_WEIGHTS_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_period_debug(mut world: World) {
        world.calc(0, &[]).unwrap();

        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer.write_period(&world, 0, 1e-3).unwrap();
            writer.flush().unwrap();
        }

        let rows: Vec<ShareWeightRow> = read_rows(&dir.path().join(SHARE_WEIGHTS_FILE_NAME));
        // Four subsectors and five technologies in each of two regions
        assert_eq!(rows.len(), 18);
        assert_eq!(rows.iter().filter(|row| row.technology_id.is_none()).count(), 8);
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Empty directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Non-empty directory
        fs::write(output_dir.join("file.txt"), "").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();
        assert_eq!(
            get_output_dir(&model_dir).unwrap(),
            PathBuf::from("equishare_results/my_model")
        );
    }
}
