//! The model: its parameters, the world of regions and the policies applied to it.
use crate::input::load_model;
use crate::policy::GhgPolicy;
use crate::world::World;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::ModelParameters;

/// A model loaded from a model directory
#[derive(Debug)]
pub struct Model {
    /// Path to the model directory
    pub model_path: PathBuf,
    /// Parameters from the model file
    pub parameters: ModelParameters,
    /// Every region in the model, with their sectors and markets
    pub world: World,
    /// Carbon tax policies
    pub policies: Vec<GhgPolicy>,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        load_model(model_dir)
    }

    /// The years of the model's periods
    pub fn iter_years(&self) -> impl Iterator<Item = u32> + '_ {
        self.world.time().years().iter().copied()
    }
}
