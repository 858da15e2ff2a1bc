use clap::Parser;
use shreddit::*;
use std::{
    path::Path,
    process::{self, ExitCode},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

fn main() -> Result<ExitCode, ConfigError> {
    let args = Args::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    // A second Ctrl-C quits without waiting for the current request.
    if let Err(err) = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
    }) {
        eprintln!("Could not install the Ctrl-C handler: {err}");
    }

    let outcome = run(&args, Path::new("."), interrupted)?;
    outcome.report();
    Ok(ExitCode::from(outcome.exit_code()))
}
