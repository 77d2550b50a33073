//! `mlcast-validate`: validate MLCast datasets against published
//! specifications from the command line.

pub mod config;
pub mod render;
pub mod runner;

pub use config::RuntimeConfig;
pub use render::ReportRenderer;
pub use runner::validate_location;

use compliance::ValidatorError;
use zarr_loader::LoadError;

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const FAILURES: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const LOAD: u8 = 3;
    pub const CATALOG: u8 = 4;
}

/// Exit code for an error that ended the run before a report existed.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<LoadError>().is_some() {
        return exit::LOAD;
    }
    match err.downcast_ref::<ValidatorError>() {
        Some(e) if e.is_usage() => exit::USAGE,
        Some(ValidatorError::Load(_)) => exit::LOAD,
        Some(_) => exit::CATALOG,
        None => exit::USAGE,
    }
}
