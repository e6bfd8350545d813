pub mod search_root;

/// Environment variable that turns on `[VERBOSE]` diagnostics
pub const VERBOSE_ENV: &str = "FWGATE_VERBOSE";

pub fn verbose_enabled() -> bool {
    std::env::var(VERBOSE_ENV).is_ok()
}
