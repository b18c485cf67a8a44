extern crate chrono;

// Build script for the Parkwatch CLI crate.
//
// Stamps the binary with its build time and git revision for `parkwatch version`.

fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    println!("cargo:rustc-env=CLI_TARGET={}-{}", target_arch, target_os);

    println!(
        "cargo:rustc-env=CLI_BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let commit_hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=CLI_GIT_COMMIT={}", commit_hash);
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
