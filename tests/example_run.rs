//! Integration tests for the `example run` command.
use equishare::cli::RunOpts;
use equishare::cli::example::handle_example_run_command;
use equishare::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command, with debug output enabled.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("EQUISHARE_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        debug_model: true,
        ..Default::default()
    };
    handle_example_run_command("simple", &opts, Some(Settings::default())).unwrap();
    assert!(tempdir.path().join("debug_share_weights.csv").is_file());
}
