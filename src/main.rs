use equishare::cli::run_cli;
use equishare::log::is_logger_initialised;
use human_panic::setup_panic;
use log::error;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        std::process::exit(1);
    }
}
