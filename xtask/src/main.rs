use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "products_lambda";
const LAMBDA_TARGET: &str = "x86_64-unknown-linux-gnu";
const ARTIFACT_NAME: &str = "products.zip";

#[derive(Parser)]
#[command(name = "xtask", about = "Task runner for the products API workspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the products_core and products_lambda test suites
    Test,
    /// Run a CI job
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the products Lambda and zip it as a `bootstrap` artifact
    ServerlessPackage {
        /// Target triple of the Lambda runtime
        #[arg(long, default_value = LAMBDA_TARGET)]
        target: String,
        /// Build without `--release`
        #[arg(long)]
        debug: bool,
        /// Directory receiving `products.zip`
        #[arg(long, env = "PRODUCTS_DIST_DIR", default_value = "dist")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// fmt, clippy and tests
    Check,
    /// Release build of the Lambda artifact
    Package,
    /// check, then package
    All,
}

fn run_cargo(args: &[&str]) {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo");
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_tests() {
    run_cargo(&["test", "-p", "products_core"]);
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);
}

fn ci_check() {
    run_cargo(&["fmt", "--all", "--", "--check"]);
    run_cargo(&["clippy", "--all-targets", "--", "-D", "warnings"]);
    run_tests();
}

fn package_products_lambda(target: &str, debug: bool, output_dir: &Path) -> PathBuf {
    let mut args = vec!["build", "-p", LAMBDA_PACKAGE, "--bin", LAMBDA_PACKAGE];
    args.extend(["--target", target]);
    if !debug {
        args.push("--release");
    }
    run_cargo(&args);

    let profile_dir = if debug { "debug" } else { "release" };
    let binary_path = Path::new("target")
        .join(target)
        .join(profile_dir)
        .join(binary_name(LAMBDA_PACKAGE, target));
    fs::create_dir_all(output_dir).expect("failed to create lambda dist directory");

    let zip_path = output_dir.join(ARTIFACT_NAME);
    package_lambda_zip(&binary_path, &zip_path);
    eprintln!("packaged {}", zip_path.display());
    zip_path
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

/// Lambda custom runtimes execute a file named `bootstrap` at the zip root.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).unwrap_or_else(|error| {
        panic!("expected lambda binary at '{}': {error}", binary_path.display())
    });
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

fn main() {
    match Cli::parse().command {
        Commands::Test => run_tests(),
        Commands::Ci { job } => {
            if matches!(job, CiJob::Check | CiJob::All) {
                ci_check();
            }
            if matches!(job, CiJob::Package | CiJob::All) {
                package_products_lambda(LAMBDA_TARGET, false, Path::new("dist"));
            }
        }
        Commands::ServerlessPackage {
            target,
            debug,
            output_dir,
        } => {
            package_products_lambda(&target, debug, &output_dir);
        }
    }
}
