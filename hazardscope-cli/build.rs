// Injects HAZARDSCOPE_VERSION from `git describe`, falling back to the
// package version when git or tags are unavailable.

use std::process::Command;

fn main() {
    let pkg = env!("CARGO_PKG_VERSION");
    let version = describe().map_or_else(|| pkg.to_string(), |d| version_from_describe(pkg, &d));

    println!("cargo:rustc-env=HAZARDSCOPE_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string())
}

/// "v0.3.0" and "v0.3.0-4-gabc123" map to "0.3.0"; a bare hash gets the
/// package version prepended.
fn version_from_describe(pkg: &str, described: &str) -> String {
    match described.strip_prefix('v') {
        Some(tagged) => tagged.split('-').next().unwrap_or(tagged).to_string(),
        None => format!("{}-{}", pkg, described),
    }
}
