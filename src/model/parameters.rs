//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{input_err_msg, is_sorted_and_unique, read_toml};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_calibrations, bool, true);
define_param_default!(default_calibration_accuracy, f64, 1e-3);
define_param_default!(default_check_calibration, bool, true);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ModelParameters {
    /// The year of each model period
    pub years: Vec<u32>,
    /// Whether share weights are recalibrated to match calibration outputs
    #[serde(default = "default_calibrations")]
    pub calibrations: bool,
    /// The relative tolerance within which calibrated outputs must match their targets
    #[serde(default = "default_calibration_accuracy")]
    pub calibration_accuracy: f64,
    /// Whether to check and report calibration after each period
    #[serde(default = "default_check_calibration")]
    pub check_calibration: bool,
}

/// Check that the `years` parameter is valid
fn check_years(years: &[u32]) -> Result<()> {
    ensure!(!years.is_empty(), "`years` is empty");

    ensure!(
        is_sorted_and_unique(years),
        "`years` must be composed of unique values in order"
    );

    Ok(())
}

/// Check that the `calibration_accuracy` parameter is valid
fn check_calibration_accuracy(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "calibration_accuracy must be a finite number greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_years(&self.years)?;
        check_calibration_accuracy(self.calibration_accuracy)?;

        Ok(())
    }
}
