use std::process::Command;

fn main() {
    // Prefer the git tag when building from a checkout, else the crate version.
    let version = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            let s = String::from_utf8(o.stdout).ok()?;
            let s = s.trim();
            Some(s.strip_prefix('v').unwrap_or(s).to_string())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").into());

    println!("cargo:rustc-env=GIT_VERSION={version}");
}
