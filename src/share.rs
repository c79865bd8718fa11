//! The discrete-choice engine used to allocate market shares between competing options.
//!
//! The same algorithm is used at every level of the nesting: a sector allocates its output between
//! subsectors and each subsector allocates its output between technologies. Options compete with a
//! logit formula on price, weighted by a calibratable share weight. Some options may have an
//! externally imposed (fixed) share and any option may have a capacity limit, which caps the share
//! it can take.
use anyhow::{Result, bail, ensure};

/// The maximum number of passes of the capacity-limit transform.
///
/// Each pass limits at least one more option, so this is only reached for degenerate input.
pub const MAX_CAPACITY_LIMIT_ITERATIONS: usize = 100;

/// Tolerance used when checking that shares sum to one
pub const SHARE_TOLERANCE: f64 = 1e-9;

/// The inputs for one option taking part in a share allocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareOption {
    /// Calibratable bias for the option. Zero removes the option from the choice.
    pub share_weight: f64,
    /// The price (or cost) of the option
    pub price: f64,
    /// Sensitivity of share to price. Negative values mean cheaper options are preferred.
    pub logit_exponent: f64,
    /// The maximum share the option may take
    pub capacity_limit: f64,
    /// An externally imposed share, which bypasses the logit
    pub fixed_share: Option<f64>,
}

impl ShareOption {
    /// Create a new option with no capacity limit and no fixed share
    pub fn new(share_weight: f64, price: f64, logit_exponent: f64) -> Self {
        Self {
            share_weight,
            price,
            logit_exponent,
            capacity_limit: 1.0,
            fixed_share: None,
        }
    }

    /// Set the capacity limit for the option
    pub fn with_capacity_limit(mut self, capacity_limit: f64) -> Self {
        self.capacity_limit = capacity_limit;
        self
    }

    /// Give the option a fixed share
    pub fn with_fixed_share(mut self, fixed_share: f64) -> Self {
        self.fixed_share = Some(fixed_share);
        self
    }
}

/// The weight of an option in the logit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogitWeight {
    /// The option does not take part in the choice
    Excluded,
    /// The option costs nothing, so it is infinitely preferred to any priced option. The value is
    /// its share weight.
    Free(f64),
    /// An ordinary logit weight
    Priced(f64),
}

/// Documented fallbacks for share allocations where no option is eligible for the logit
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AllocationFallback {
    /// The fixed shares were scaled up so that they sum to one
    #[display("fixed shares scaled to fill the market")]
    ScaledFixedShares,
    /// The market was split equally between the choice options
    #[display("market split equally between options")]
    EqualSplit,
}

/// The result of a share allocation
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// The share for each option, in the same order as the input
    pub shares: Vec<f64>,
    /// Whether the capacity limit was binding for each option
    pub capacity_limited: Vec<bool>,
    /// The fallback used, if the input was degenerate
    pub fallback: Option<AllocationFallback>,
}

/// Calculate the logit weight for an option.
///
/// The weight is `share_weight * price^logit_exponent`. A non-positive price with a negative
/// exponent would give an infinite weight, so such options are marked as free instead.
pub fn logit_weight(share_weight: f64, price: f64, logit_exponent: f64) -> LogitWeight {
    if share_weight.is_nan() || share_weight <= 0.0 || !price.is_finite() {
        return LogitWeight::Excluded;
    }

    if price <= 0.0 {
        return if logit_exponent < 0.0 {
            LogitWeight::Free(share_weight)
        } else if logit_exponent > 0.0 {
            LogitWeight::Excluded
        } else {
            LogitWeight::Priced(share_weight)
        };
    }

    let weight = share_weight * price.powf(logit_exponent);
    if weight.is_finite() {
        LogitWeight::Priced(weight)
    } else {
        // Overflow from a tiny price
        LogitWeight::Free(share_weight)
    }
}

/// The weights used for the choice, one per option, split into free and priced options.
///
/// Options which are excluded or have a fixed share have no weight in either group. Free options
/// take the pool first and priced options compete for whatever the free options cannot take.
struct ChoiceWeights {
    free: Vec<Option<f64>>,
    priced: Vec<Option<f64>>,
}

impl ChoiceWeights {
    fn new(options: &[ShareOption]) -> Self {
        let (free, priced) = options
            .iter()
            .map(|opt| {
                if opt.fixed_share.is_some() {
                    return (None, None);
                }
                match logit_weight(opt.share_weight, opt.price, opt.logit_exponent) {
                    LogitWeight::Free(w) => (Some(w), None),
                    LogitWeight::Priced(w) if w > 0.0 => (None, Some(w)),
                    _ => (None, None),
                }
            })
            .unzip();

        Self { free, priced }
    }

    /// Give every option without a fixed share an equal weight
    fn equal(options: &[ShareOption]) -> Self {
        Self {
            free: vec![None; options.len()],
            priced: options
                .iter()
                .map(|opt| opt.fixed_share.is_none().then_some(1.0))
                .collect(),
        }
    }

    fn total(&self) -> f64 {
        self.free.iter().chain(&self.priced).flatten().sum()
    }
}

/// Normalise weights so that they sum to `pool`.
///
/// Options with no weight get a share of zero. If the total weight is zero, all shares are zero.
pub fn normalise_shares(weights: &[Option<f64>], pool: f64) -> Vec<f64> {
    let total: f64 = weights.iter().flatten().sum();
    weights
        .iter()
        .map(|weight| match weight {
            Some(w) if total > 0.0 => pool * w / total,
            _ => 0.0,
        })
        .collect()
}

/// Distribute `pool` between the weighted options, respecting capacity limits.
///
/// Options whose share would exceed their capacity limit are given exactly their limit and the
/// excess is redistributed between the remaining options in proportion to their weights. This is
/// repeated until no unlimited option exceeds its limit.
///
/// # Returns
///
/// The shares and whether each option was capacity limited, or an error if the capacity of the
/// options is insufficient to take up the pool or the transform did not converge.
pub fn limit_shares(
    weights: &[Option<f64>],
    capacity_limits: &[f64],
    pool: f64,
) -> Result<(Vec<f64>, Vec<bool>)> {
    let (shares, limited, unallocated) = distribute_within_limits(weights, capacity_limits, pool)?;
    ensure!(
        unallocated <= SHARE_TOLERANCE,
        "Capacity limits leave a share of {unallocated} unallocated"
    );

    Ok((shares, limited))
}

/// The capacity-limit transform, also returning the part of `pool` the options could not take
fn distribute_within_limits(
    weights: &[Option<f64>],
    capacity_limits: &[f64],
    pool: f64,
) -> Result<(Vec<f64>, Vec<bool>, f64)> {
    assert_eq!(weights.len(), capacity_limits.len());

    let mut shares = vec![0.0; weights.len()];
    let mut limited = vec![false; weights.len()];
    for _ in 0..MAX_CAPACITY_LIMIT_ITERATIONS {
        let limited_total: f64 = shares
            .iter()
            .zip(&limited)
            .filter(|(_, limited)| **limited)
            .map(|(share, _)| share)
            .sum();
        let remaining = (pool - limited_total).max(0.0);

        // Weights of the options still free to take a larger share
        let unlimited: Vec<_> = weights
            .iter()
            .zip(&limited)
            .map(|(weight, limited)| if *limited { None } else { *weight })
            .collect();
        if unlimited.iter().flatten().sum::<f64>() <= 0.0 {
            return Ok((shares, limited, remaining));
        }

        let provisional = normalise_shares(&unlimited, remaining);
        let mut any_newly_limited = false;
        for (i, share) in provisional.into_iter().enumerate() {
            if unlimited[i].is_none() {
                continue;
            }

            if share > capacity_limits[i] {
                shares[i] = capacity_limits[i];
                limited[i] = true;
                any_newly_limited = true;
            } else {
                shares[i] = share;
            }
        }

        if !any_newly_limited {
            return Ok((shares, limited, 0.0));
        }
    }

    bail!(
        "Capacity-limit transform did not converge after {MAX_CAPACITY_LIMIT_ITERATIONS} \
        iterations"
    )
}

/// Allocate shares between a group of sibling options.
///
/// Fixed-share options keep their share and the rest of the market is shared out between the
/// other options with a capacity-limited logit. The shares returned sum to one unless the group
/// is empty.
///
/// Free options (see [`logit_weight`]) take the pool first. Whatever their capacity limits stop
/// them taking is shared between the priced options.
///
/// If no option is eligible for the logit (e.g. all share weights are zero), the fixed shares are
/// scaled up to fill the market or, if there are none, the market is split equally. The fallback
/// used is reported in [`Allocation::fallback`].
pub fn allocate_shares(options: &[ShareOption]) -> Result<Allocation> {
    let mut shares = vec![0.0; options.len()];
    let mut capacity_limited = vec![false; options.len()];
    if options.is_empty() {
        return Ok(Allocation {
            shares,
            capacity_limited,
            fallback: None,
        });
    }

    let mut fixed_total = 0.0;
    for (share, opt) in shares.iter_mut().zip(options) {
        ensure!(
            (0.0..=1.0).contains(&opt.capacity_limit),
            "Capacity limit {} is not between 0 and 1",
            opt.capacity_limit
        );
        if let Some(fixed_share) = opt.fixed_share {
            ensure!(
                (0.0..=1.0).contains(&fixed_share),
                "Fixed share {fixed_share} is not between 0 and 1"
            );
            ensure!(
                fixed_share <= opt.capacity_limit + SHARE_TOLERANCE,
                "Fixed share {fixed_share} exceeds capacity limit {}",
                opt.capacity_limit
            );
            *share = fixed_share;
            fixed_total += fixed_share;
        }
    }
    ensure!(
        fixed_total <= 1.0 + SHARE_TOLERANCE,
        "Fixed shares sum to {fixed_total}, which is greater than one"
    );
    let pool = (1.0 - fixed_total).max(0.0);

    let mut weights = ChoiceWeights::new(options);
    let mut fallback = None;
    if pool > SHARE_TOLERANCE && weights.total() <= 0.0 {
        if fixed_total > 0.0 {
            for share in &mut shares {
                *share /= fixed_total;
            }

            return Ok(Allocation {
                shares,
                capacity_limited,
                fallback: Some(AllocationFallback::ScaledFixedShares),
            });
        }

        ensure!(
            options.iter().any(|opt| opt.fixed_share.is_none()),
            "No option is available to supply the market"
        );
        weights = ChoiceWeights::equal(options);
        fallback = Some(AllocationFallback::EqualSplit);
    }

    let capacity_limits: Vec<_> = options.iter().map(|opt| opt.capacity_limit).collect();
    let (free_shares, free_limited, unallocated) =
        distribute_within_limits(&weights.free, &capacity_limits, pool)?;
    let (priced_shares, priced_limited) = if unallocated > SHARE_TOLERANCE {
        limit_shares(&weights.priced, &capacity_limits, unallocated)?
    } else {
        (vec![0.0; options.len()], vec![false; options.len()])
    };
    for (i, (free, priced)) in weights.free.iter().zip(&weights.priced).enumerate() {
        if free.is_some() {
            shares[i] = free_shares[i];
            capacity_limited[i] = free_limited[i];
        } else if priced.is_some() {
            shares[i] = priced_shares[i];
            capacity_limited[i] = priced_limited[i];
        }
    }

    debug_assert!((shares.iter().sum::<f64>() - 1.0).abs() <= SHARE_TOLERANCE);

    Ok(Allocation {
        shares,
        capacity_limited,
        fallback,
    })
}
