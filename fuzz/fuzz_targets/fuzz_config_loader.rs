#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    if let Ok(cfg) = dispenser_config::load_toml(data) {
        if cfg.validate().is_ok() && cfg.reporter.enabled {
            assert!(cfg.reporter.path.starts_with('/'));
            assert!(cfg.reporter.url().starts_with("http://"));
        }
    }
});
