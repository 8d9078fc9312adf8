//! This build script validates the default configuration file (`default_config.toml`)

#![allow(dead_code, reason = "Some items may be unused in this build script context")]
#![allow(unused_imports, reason = "Some items may be unused in this build script context")]

use ohno::IntoAppError;
use std::process;

type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[path = "src/config/store_config.rs"]
mod store_config;

fn main() {
    println!("cargo:rerun-if-changed=default_config.toml");
    println!("cargo:rerun-if-changed=src/config");

    if let Err(e) = store_config::StoreConfig::from_toml(store_config::DEFAULT_CONFIG_TOML) {
        eprintln!("unable to load default_config.toml: {e:?}");
        process::exit(1);
    }
}
