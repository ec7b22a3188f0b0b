pub mod cli;
pub mod executor;
pub mod logging;
pub mod manifest;
pub mod progress;
pub mod schema;

pub use executor::{CommandError, InstallError, InstallReport, Installer};
pub use manifest::{ManifestError, PackageEntry, PackageManifest};
pub use schema::{SchemaEngine, SchemaError, Validator};

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
