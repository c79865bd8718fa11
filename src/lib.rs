//! A multi-region equilibrium core for energy-economy models.
//!
//! For each model period, every region allocates the production of each good between competing
//! subsectors and technologies with a capacity-limited nested logit, reconciled with calibration
//! data. An outer solver drives [`world::World::calc`], optionally for a subset of regions.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod calibration;
pub mod cli;
pub mod climate;
pub mod graph;
pub mod id;
pub mod input;
pub mod log;
pub mod market;
pub mod model;
pub mod output;
pub mod period;
pub mod policy;
pub mod region;
pub mod sector;
pub mod settings;
pub mod share;
pub mod simulation;
pub mod subsector;
pub mod technology;
pub mod visitor;
pub mod world;

#[cfg(test)]
mod fixture;

/// Get the directory holding the program's configuration files
pub fn get_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        panic!("Could not get path to config directory");
    };
    config_dir.push("equishare");
    config_dir
}
