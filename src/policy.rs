//! Greenhouse gas policies, which impose a carbon tax on technologies.
use crate::period::PeriodVec;
use crate::region::RegionID;
use std::collections::HashSet;

/// A carbon tax applied to some or all regions
#[derive(Debug, Clone, PartialEq)]
pub struct GhgPolicy {
    /// The name of the policy
    pub name: String,
    /// The regions covered by the policy, or `None` for all regions
    pub regions: Option<HashSet<RegionID>>,
    /// The tax per unit of emissions, for each period
    pub tax: PeriodVec<f64>,
}

impl GhgPolicy {
    /// Whether the policy applies to the given region
    pub fn covers(&self, region_id: &RegionID) -> bool {
        self.regions
            .as_ref()
            .is_none_or(|regions| regions.contains(region_id))
    }
}
