//! Application-level configuration loaded from the environment.

use std::{env, time::Duration};

use tracing::{info, warn};

/// Environment variable holding the active-window length in seconds.
const ROUND_DURATION_ENV: &str = "ROUND_DURATION";
/// Environment variable holding the pre-round cooldown length in seconds.
const COOLDOWN_DURATION_ENV: &str = "COOLDOWN_DURATION";
/// Environment variable holding the secret that signs session tokens.
const TOKEN_SECRET_ENV: &str = "JWT_SECRET";

/// Active-window length used when the environment does not say otherwise.
const DEFAULT_ROUND_DURATION: Duration = Duration::from_secs(60);
/// Cooldown length used when the environment does not say otherwise.
const DEFAULT_COOLDOWN_DURATION: Duration = Duration::from_secs(30);
/// Signing secret installed when [`TOKEN_SECRET_ENV`] is absent. Fine for
/// local play, useless for anything reachable from the internet.
const DEV_TOKEN_SECRET: &str = "guss-dev-secret-change-me";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    round_duration: Duration,
    cooldown_duration: Duration,
    token_secret: String,
}

impl AppConfig {
    /// Load the configuration from the environment, falling back to defaults
    /// for anything absent or unparsable.
    pub fn load() -> Self {
        let round_duration = duration_from_env(ROUND_DURATION_ENV, DEFAULT_ROUND_DURATION);
        let cooldown_duration = duration_from_env(COOLDOWN_DURATION_ENV, DEFAULT_COOLDOWN_DURATION);

        let token_secret = match env::var(TOKEN_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!(
                    var = TOKEN_SECRET_ENV,
                    "signing secret not set; using the built-in development secret"
                );
                DEV_TOKEN_SECRET.to_owned()
            }
        };

        info!(
            round_secs = round_duration.as_secs(),
            cooldown_secs = cooldown_duration.as_secs(),
            "loaded runtime configuration"
        );

        Self {
            round_duration,
            cooldown_duration,
            token_secret,
        }
    }

    /// Build a configuration with explicit values.
    pub fn new(
        round_duration: Duration,
        cooldown_duration: Duration,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            round_duration,
            cooldown_duration,
            token_secret: token_secret.into(),
        }
    }

    /// How long a round accepts taps.
    pub fn round_duration(&self) -> Duration {
        self.round_duration
    }

    /// How long a freshly created round waits before opening.
    pub fn cooldown_duration(&self) -> Duration {
        self.cooldown_duration
    }

    /// Key material for signing and verifying session tokens.
    pub fn token_secret(&self) -> &[u8] {
        self.token_secret.as_bytes()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            round_duration: DEFAULT_ROUND_DURATION,
            cooldown_duration: DEFAULT_COOLDOWN_DURATION,
            token_secret: DEV_TOKEN_SECRET.to_owned(),
        }
    }
}

/// Read a whole-seconds duration from `var`, warning when a set value cannot
/// be parsed.
fn duration_from_env(var: &'static str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(raw) => match parse_seconds(&raw) {
            Some(value) => value,
            None => {
                warn!(
                    var,
                    value = %raw,
                    "unparsable duration; falling back to default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}
