use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Where and how log events are written
///
/// Output always goes to stderr; stdout belongs to the program's own output
/// (the CLI prints JSON there).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, `flatstore=debug`
    Development,
    /// JSON lines, `flatstore=info`
    Production,
    /// Installs nothing; tests call `init_test_capture` instead
    Test,
}

impl Profile {
    fn default_directive(&self) -> &'static str {
        match self {
            Profile::Development => "flatstore=debug",
            Profile::Production | Profile::Test => "flatstore=info",
        }
    }

    /// `RUST_LOG` when set and valid, the profile default otherwise
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the process-wide subscriber for `profile`
///
/// Only the first call has any effect. A subscriber installed earlier by
/// someone else is left in place.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(profile.filter())
            .with_writer(std::io::stderr);
        // try_init: an already installed global subscriber wins
        let _ = match profile {
            Profile::Development => builder.try_init(),
            Profile::Production => builder.json().try_init(),
            Profile::Test => Ok(()),
        };
    });
}
