use crate::config::Settings;

/// Load settings, falling back to defaults when the config can't be used.
///
/// The fallback reason is returned so it can be logged once logging is up.
pub fn load_settings() -> (Settings, Option<String>) {
    let loaded = Settings::load()
        .map_err(|e| format!("failed to load config: {e}"))
        .and_then(|s| match s.validate() {
            Ok(()) => Ok(s),
            Err(msg) => Err(format!("invalid config: {msg}")),
        });

    match loaded {
        Ok(s) => (s, None),
        Err(reason) => {
            // Config is optional; failures should not prevent the app from starting.
            eprintln!("encore: {reason}, using defaults");
            (Settings::default(), Some(reason))
        }
    }
}
