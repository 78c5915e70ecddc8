use std::{env, fs, process};

/// The `VERSION` file is what release tooling reads; it must agree with Cargo.toml.
fn check_version_file() -> Result<(), String> {
    let recorded = fs::read_to_string("VERSION")
        .map_err(|e| format!("cannot read VERSION ({}); create it with the package version", e))?;
    let package = env::var("CARGO_PKG_VERSION").map_err(|e| e.to_string())?;

    match recorded.trim() {
        v if v == package => Ok(()),
        v => Err(format!(
            "VERSION says {:?} but Cargo.toml says {:?}; bump both together",
            v, package
        )),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-changed=build.rs");

    if let Err(msg) = check_version_file() {
        eprintln!("split-kit build: {}", msg);
        process::exit(1);
    }
}
