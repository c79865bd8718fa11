//! Calibration of share weights and fixed supplies against historical output data.
//!
//! When calibration is enabled, options which have a calibration target for the period have their
//! share weights adjusted until the logit reproduces the target. Recalibration always starts from
//! the base (input) share weights, so calculating the same period twice gives identical results.
use crate::period::{ModelTime, PeriodVec};
use crate::share::{Allocation, ShareOption, allocate_shares};
use anyhow::Result;

/// The maximum number of rescaling passes used when recalibrating share weights
pub const MAX_RECALIBRATION_ITERATIONS: usize = 100;

/// Absolute tolerance on shares for recalibration to be considered converged
pub const RECALIBRATION_TOLERANCE: f64 = 1e-12;

/// Whether a calculated output matches a calibration target.
///
/// The tolerance is relative to the target, unless the target is zero, in which case it is
/// absolute.
pub fn is_within_accuracy(output: f64, target: f64, accuracy: f64) -> bool {
    if target > 0.0 {
        (output - target).abs() <= accuracy * target
    } else {
        output.abs() <= accuracy
    }
}

/// Adjust the share weights of `options` so that options with a target share obtain it.
///
/// Each share weight is repeatedly multiplied by the ratio of target share to calculated share and
/// the allocation is rerun. Options with a fixed share or without a target keep their share
/// weights. Targets which cannot be met (e.g. because they exceed the option's capacity limit) are
/// left unmet; this is reported later by the calibration consistency check.
///
/// # Arguments
///
/// * `options` - The options to allocate between. Share weights are updated in place.
/// * `targets` - The target share for each option, if any
///
/// # Returns
///
/// The allocation obtained with the recalibrated share weights.
pub fn recalibrate_share_weights(
    options: &mut [ShareOption],
    targets: &[Option<f64>],
) -> Result<Allocation> {
    assert_eq!(options.len(), targets.len());

    let mut allocation = allocate_shares(options)?;
    for _ in 0..MAX_RECALIBRATION_ITERATIONS {
        let mut adjusted = false;
        for ((opt, target), share) in options.iter_mut().zip(targets).zip(&allocation.shares) {
            let Some(target) = *target else {
                continue;
            };
            if opt.fixed_share.is_some() || (share - target).abs() <= RECALIBRATION_TOLERANCE {
                continue;
            }

            if target <= 0.0 {
                opt.share_weight = 0.0;
            } else if *share > 0.0 {
                opt.share_weight *= target / share;
            } else if opt.share_weight <= 0.0 {
                // Bring a previously excluded option back into the choice
                opt.share_weight = 1.0;
            } else {
                // Out-competed by a free option; nothing a share weight can do
                continue;
            }
            adjusted = true;
        }

        if !adjusted {
            break;
        }
        allocation = allocate_shares(options)?;
    }

    Ok(allocation)
}

/// The factor by which fixed supplies must be scaled so that total output matches a target.
///
/// Only applies when every option is either fixed or calibrated. The calibrated options take
/// `calibrated` of the target and the fixed options share the rest. If there is no fixed supply,
/// the factor is one.
pub fn fixed_supply_scale_factor(target: f64, calibrated: f64, fixed: f64) -> f64 {
    if fixed <= 0.0 {
        return 1.0;
    }

    (target - calibrated).max(0.0) / fixed
}

/// Linearly interpolate `values` for the periods strictly between `begin` and `end`.
///
/// The interpolation runs from `begin_value` to the value at `end`, using the spacing of the model
/// years. The values at `begin` and `end` are left unchanged.
pub fn interpolate_share_weights(
    values: &mut PeriodVec<f64>,
    time: &ModelTime,
    begin: usize,
    begin_value: f64,
    end: usize,
) {
    assert!(begin < end && end < values.len());

    let end_value = values[end];
    let begin_year = time.year(begin);
    let span = f64::from(time.year(end) - begin_year);
    for period in begin + 1..end {
        let fraction = f64::from(time.year(period) - begin_year) / span;
        values[period] = begin_value + (end_value - begin_value) * fraction;
    }
}

/// Carry a calibrated share weight forward to later periods.
///
/// The base share weights for periods between `period` and the next anchor period are linearly
/// interpolated (by year) from `calibrated` to the anchor's value. If there is no later anchor,
/// `calibrated` is used for every later period.
pub fn propagate_calibrated_share_weight<F>(
    base: &mut PeriodVec<f64>,
    time: &ModelTime,
    period: usize,
    calibrated: f64,
    is_anchor: F,
) where
    F: Fn(usize) -> bool,
{
    match (period + 1..base.len()).find(|p| is_anchor(*p)) {
        Some(anchor) => interpolate_share_weights(base, time, period, calibrated, anchor),
        None => base.fill_from(period + 1, calibrated),
    }
}
