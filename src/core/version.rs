//! Build metadata shared across the library and the CLI.
//! Includes the generated version.rs from the build script, providing a
//! single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Crate version from Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Version line used by `taskgate --version`
pub fn long_version() -> String {
    format!("{} ({} built {})", version(), git_hash(), build_time())
}
