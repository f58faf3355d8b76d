//! Build script for Dietrack
//!
//! Bumps the build counter and embeds build metadata into the binary.

use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let build_number_path = Path::new("build_number.txt");

    let previous: u64 = fs::read_to_string(build_number_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build_number = previous + 1;

    fs::write(build_number_path, build_number.to_string())
        .expect("Failed to write build number file");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=DIETRACK_BUILD_NUMBER={}", build_number);
    println!("cargo:rustc-env=DIETRACK_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:warning=Dietrack Build #{} at {}", build_number, timestamp);
}
