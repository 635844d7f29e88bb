//! Fuzz target: `NodeConfig` decoding and validation
//!
//! Feeds arbitrary bytes through the postcard decoder and, for anything
//! that decodes, through `NodeConfig::validate` and controller
//! construction.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - `PowerModeController::new` succeeds exactly when `validate` does
//!
//! cargo fuzz run fuzz_config_decode

#![no_main]

use envnode::{NodeConfig, PowerModeController};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = postcard::from_bytes::<NodeConfig>(data) else {
        return;
    };
    let valid = config.validate().is_ok();
    let built = PowerModeController::new(config).is_ok();
    assert_eq!(valid, built, "controller construction must mirror validate()");
});
