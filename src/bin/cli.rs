// src/bin/cli.rs
use riseqr::cli;

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("Warning: could not install error reporter: {e}");
    }
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
