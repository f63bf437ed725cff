use std::env;
use std::process::Command;

/// Run a command and return its trimmed stdout, if it succeeded
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn report_build_profile() {
    println!(
        "cargo:rustc-env=BUILD_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}

fn report_repository_version() {
    let version = env::var("CI_BUILD_REF")
        .ok()
        .filter(|val| !val.is_empty())
        .or_else(|| command_output("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| command_output("git", &["rev-parse", "--short", "HEAD"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=REPO_VERSION={}", version);
}

fn report_build_timestamp() {
    let timestamp = chrono::Utc::now().to_rfc3339();
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);
}

fn report_rust_version() {
    let rust_version =
        command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=RUST_VERSION={}", rust_version);
}

fn report_target_info() {
    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");
    println!("cargo:rerun-if-env-changed=CI_BUILD_REF");

    report_build_profile();
    report_repository_version();
    report_build_timestamp();
    report_rust_version();
    report_target_info();
}
