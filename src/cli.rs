use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::executor::{DEFAULT_FETCH_TOOL, Installer};
use crate::logging;
use crate::manifest::{DEFAULT_MANIFEST, PackageManifest};

#[derive(Debug, Parser)]
#[command(
    name = "gofile",
    version,
    about = "A utility to install go packages from a gofile"
)]
pub struct Cli {
    /// Path to gofile
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "GOFILE_FILENAME",
        default_value = DEFAULT_MANIFEST
    )]
    filename: PathBuf,
    /// Enable or disable debug mode
    #[arg(long, global = true, env = "GOFILE_DEBUG")]
    debug: bool,
    /// Program run as `<tool> get [-v] <url>` for each package
    #[arg(
        long,
        global = true,
        env = "GOFILE_FETCH_TOOL",
        default_value = DEFAULT_FETCH_TOOL
    )]
    fetch_tool: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install gofile packages
    Install,
    /// Validate the gofile and print its packages as JSON
    Validate {
        /// Emit compact JSON instead of pretty output
        #[arg(long)]
        raw: bool,
    },
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}: {err}", style("ERROR").red().for_stderr());
            1
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    tracing::debug!(debug = cli.debug, filename = %cli.filename.display(), "loading gofile");
    let manifest = PackageManifest::decode_from_source(&cli.filename, cli.debug)?;

    match cli.command {
        Commands::Install => {
            let report = Installer::for_manifest(&manifest)
                .with_fetch_tool(cli.fetch_tool)
                .install(&manifest)?;
            tracing::info!(installed = report.installed.len(), "install finished");
        }
        Commands::Validate { raw } => {
            if raw {
                println!("{}", serde_json::to_string(manifest.packages())?);
            } else {
                println!("{}", serde_json::to_string_pretty(manifest.packages())?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, execute};
    use clap::Parser;
    use std::path::{Path, PathBuf};

    fn write_gofile(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("gofile.yml");
        std::fs::write(&path, contents).expect("gofile should be written");
        path
    }

    #[test]
    fn defaults_to_gofile_yml() {
        let cli = Cli::try_parse_from(["gofile", "install"]).expect("should parse");
        assert_eq!(cli.filename, PathBuf::from("gofile.yml"));
        assert!(!cli.debug);
        assert_eq!(cli.fetch_tool, "go");
        assert!(matches!(cli.command, Commands::Install));
    }

    #[test]
    fn accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gofile", "validate", "--raw", "-f", "other.yml", "--debug"])
            .expect("should parse");
        assert_eq!(cli.filename, PathBuf::from("other.yml"));
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Validate { raw: true }));
    }

    #[test]
    fn install_runs_fetch_tool_for_each_package() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = write_gofile(dir.path(), "- url: github.com/a/a\n- url: github.com/b/b\n");
        let path = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["gofile", "install", "-f", path, "--fetch-tool", "true"])
            .expect("should parse");
        execute(cli).expect("install should succeed");
    }

    #[test]
    fn install_surfaces_fetch_failure() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = write_gofile(dir.path(), "- url: github.com/a/a\n");
        let path = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["gofile", "install", "-f", path, "--fetch-tool", "false"])
            .expect("should parse");
        let err = execute(cli).expect_err("install should fail");
        assert!(err.to_string().contains("github.com/a/a"));
    }

    #[test]
    fn validate_reports_schema_violations() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = write_gofile(dir.path(), "- url:\n");
        let path = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["gofile", "validate", "-f", path]).expect("should parse");
        let err = execute(cli).expect_err("validation should fail");
        assert_eq!(
            err.to_string(),
            "0.url: Invalid type. Expected: string, given: null"
        );
    }

    #[test]
    fn missing_gofile_names_path() {
        let cli = Cli::try_parse_from(["gofile", "validate", "-f", "missing.yml"])
            .expect("should parse");
        let err = execute(cli).expect_err("missing file should fail");
        assert!(err.to_string().starts_with("open missing.yml: "));
    }
}
