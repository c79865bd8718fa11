//! Integration tests which load the demo model and drive its world directly.
use equishare::calibration::is_within_accuracy;
use equishare::market::GoodID;
use equishare::model::Model;
use equishare::region::RegionID;
use equishare::world::World;
use float_cmp::assert_approx_eq;
use std::path::PathBuf;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

fn load_world() -> World {
    let model = Model::from_path(get_model_dir()).unwrap();
    let mut world = model.world;
    for policy in &model.policies {
        world.set_tax(policy);
    }
    world
}

/// Output of a technology in the GBR heat sector
fn gbr_heat_output(world: &World, technology_id: &str) -> f64 {
    let region = world.region(&"GBR".into()).unwrap();
    let heat = region
        .sectors()
        .iter()
        .find(|sector| &*sector.id.0 == "heat")
        .unwrap();
    heat.subsectors
        .iter()
        .flat_map(|subsector| &subsector.technologies)
        .find(|technology| &*technology.id.0 == technology_id)
        .unwrap()
        .output(0)
}

#[test]
fn test_model_from_path() {
    let model = Model::from_path(get_model_dir()).unwrap();
    assert_eq!(model.iter_years().collect::<Vec<_>>(), [2005, 2010, 2020]);
    assert_eq!(model.world.regions().len(), 2);
    assert_eq!(model.policies.len(), 1);
}

#[test]
fn test_selective_calc_matches_full_calc() {
    let mut full = load_world();
    full.calc(0, &[]).unwrap();

    let mut selective = load_world();
    selective
        .calc(0, &["USA".into(), "GBR".into(), "GBR".into()])
        .unwrap();

    for region in full.regions() {
        assert_eq!(Some(region), selective.region(&region.id));
    }
}

#[test]
fn test_calc_is_idempotent() {
    let mut world = load_world();
    world.calc(0, &[]).unwrap();
    let first: Vec<_> = world.regions().to_vec();
    world.calc(0, &[]).unwrap();
    assert_eq!(world.regions(), first.as_slice());
    assert_eq!(world.calc_counter().count(), 2);
}

#[test]
fn test_unknown_region_is_ignored() {
    let mut world = load_world();
    let before: Vec<_> = world.regions().to_vec();
    world.calc(0, &[RegionID::new("FRA")]).unwrap();
    assert_eq!(world.regions(), before.as_slice());
    assert_eq!(world.market_price(&"FRA".into(), &GoodID::new("gas"), 0), None);
}

#[test]
fn test_calibration_converges() {
    let mut world = load_world();
    world.turn_calibrations_on();
    world.calc(0, &[]).unwrap();

    assert!(world.is_all_calibrated(0, 1e-3, true));
    assert!(is_within_accuracy(gbr_heat_output(&world, "gas_boiler"), 45.0, 1e-3));
    assert!(is_within_accuracy(gbr_heat_output(&world, "oil_boiler"), 15.0, 1e-3));

    // Heat demand is still met in full
    let heat = GoodID::new("heat");
    assert_approx_eq!(
        f64,
        world.market_supply(&"GBR".into(), &heat, 0).unwrap(),
        80.0,
        epsilon = 1e-9
    );

    // Without calibration the costs decide
    world.turn_calibrations_off();
    world.calc(0, &[]).unwrap();
    assert!(!is_within_accuracy(gbr_heat_output(&world, "gas_boiler"), 45.0, 1e-3));
}

#[test]
fn test_post_calc_without_calibration_keeps_share_weights() {
    let mut world = load_world();
    world.turn_calibrations_off();
    world.calc(0, &[]).unwrap();
    let before: Vec<_> = world.regions().to_vec();

    world.post_calc(0).unwrap();
    assert_eq!(world.regions(), before.as_slice());

    // Interpolated by year between 2005 and 2020
    let region = world.region(&"GBR".into()).unwrap();
    let heat_pumps = region
        .sectors()
        .iter()
        .flat_map(|sector| &sector.subsectors)
        .find(|subsector| &*subsector.id.0 == "heat_pumps")
        .unwrap();
    assert_approx_eq!(f64, heat_pumps.base_share_weight[1], 0.5 + 0.5 / 3.0);
}
