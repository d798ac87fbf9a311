/// Crate-level constants
pub const APP_NAME: &str = "Dramatis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
/// Pipeline internals log at debug; everything else at info.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_dramatis() {
        assert_eq!(APP_NAME, "Dramatis");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_filter_enables_crate_debug() {
        assert!(default_log_filter().contains("dramatis=debug"));
    }
}
