use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub sweep_interval: Duration,
    pub busy_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "ecostay.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            sweep_interval: Duration::from_secs(
                env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs: &u64| *secs > 0)
                    .unwrap_or(1800),
            ),
            busy_timeout: Duration::from_millis(
                env::var("DB_BUSY_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_interval_must_be_positive() {
        env::set_var("SWEEP_INTERVAL_SECS", "0");
        assert_eq!(AppConfig::from_env().sweep_interval, Duration::from_secs(1800));

        env::set_var("SWEEP_INTERVAL_SECS", "-5");
        assert_eq!(AppConfig::from_env().sweep_interval, Duration::from_secs(1800));

        env::set_var("SWEEP_INTERVAL_SECS", "60");
        assert_eq!(AppConfig::from_env().sweep_interval, Duration::from_secs(60));

        env::remove_var("SWEEP_INTERVAL_SECS");
    }
}
