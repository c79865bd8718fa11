//! Functionality for running the model period by period.
use crate::climate::CumulativeEmissions;
use crate::model::Model;
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Run the model, calculating every region for each period in turn.
///
/// Market prices are those given in the input data, so every region is calculated once per
/// period. Calibrated share weights from each period are carried forward to the next.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. share weights) to output files
pub fn run(model: &mut Model, output_path: &Path, debug_model: bool) -> Result<()> {
    write_metadata(output_path, &model.model_path).context("Failed to save metadata")?;
    let mut writer = DataWriter::create(output_path, debug_model)?;

    let parameters = model.parameters.clone();
    let world = &mut model.world;
    world.set_climate_model(Box::new(CumulativeEmissions::default()));
    for policy in &model.policies {
        world.set_tax(policy);
    }
    if parameters.calibrations {
        world.turn_calibrations_on();
    } else {
        world.turn_calibrations_off();
    }

    for period in world.time().iter_periods() {
        let year = world.time().year(period);
        info!("Calculating {year}");

        world.init_calc(period)?;
        world
            .calc(period, &[])
            .with_context(|| format!("Failed to calculate {year}"))?;

        if parameters.calibrations
            && parameters.check_calibration
            && !world.is_all_calibrated(period, parameters.calibration_accuracy, true)
        {
            warn!("Model is not calibrated in {year}");
        }

        world.run_climate_model(period)?;
        writer.write_period(world, period, parameters.calibration_accuracy)?;
        world.post_calc(period)?;
    }

    writer.flush()?;

    Ok(())
}
