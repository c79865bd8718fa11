//! Code for reading greenhouse gas policies from a CSV file.
use super::*;
use crate::policy::GhgPolicy;
use serde::Deserialize;

const CARBON_TAX_FILE_NAME: &str = "carbon_tax.csv";

#[derive(Debug, Deserialize, PartialEq, Clone)]
struct CarbonTaxRaw {
    policy: String,
    regions: String,
    year: u32,
    tax: f64,
}

/// Read carbon tax policies from `carbon_tax.csv`, if the file exists.
///
/// Taxes carry forward from the last year given. Each region may be covered by at most one
/// policy.
pub fn read_carbon_taxes(
    model_dir: &Path,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<Vec<GhgPolicy>> {
    let file_path = model_dir.join(CARBON_TAX_FILE_NAME);
    let iter = read_csv_optional::<CarbonTaxRaw>(&file_path)?;
    read_carbon_taxes_from_iter(iter, region_ids, time).with_context(|| input_err_msg(&file_path))
}

fn read_carbon_taxes_from_iter<I>(
    iter: I,
    region_ids: &HashSet<RegionID>,
    time: &ModelTime,
) -> Result<Vec<GhgPolicy>>
where
    I: Iterator<Item = CarbonTaxRaw>,
{
    let mut regions_by_policy: IndexMap<String, String> = IndexMap::new();
    let mut rows = Vec::new();
    for raw in iter {
        ensure!(
            raw.tax.is_finite(),
            "Carbon tax for policy {} must be a finite number",
            raw.policy
        );
        let regions = regions_by_policy
            .entry(raw.policy.clone())
            .or_insert_with(|| raw.regions.clone());
        ensure!(
            *regions == raw.regions,
            "Policy {} must apply to the same regions in every year",
            raw.policy
        );
        rows.push((raw.policy, period_for_year(time, raw.year)?, raw.tax));
    }

    let mut covered = HashSet::new();
    let mut policies = Vec::new();
    for (name, rows) in group_rows_by_period(rows)? {
        let regions_str = &regions_by_policy[&name];
        let regions = if regions_str.trim().eq_ignore_ascii_case("all") {
            None
        } else {
            Some(parse_region_str(regions_str, region_ids)?)
        };

        let policy_regions = regions.as_ref().unwrap_or(region_ids);
        for region_id in policy_regions {
            ensure!(
                covered.insert(region_id.clone()),
                "Region {region_id} is covered by more than one carbon tax policy"
            );
        }

        let tax = carry_forward(time, &rows, 0.0)
            .with_context(|| format!("Invalid carbon tax for policy {name}"))?;
        policies.push(GhgPolicy { name, regions, tax });
    }

    Ok(policies)
}
