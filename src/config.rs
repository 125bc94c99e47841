use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::services::reminder::ReminderPolicy;

const DEFAULT_REFRESH_SECS: u64 = 60;
const DEFAULT_HORIZON_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_SNOOZE_SECS: u64 = 10 * 60;

/// Runtime settings read from `TASKGENIUS_*` environment variables.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub refresh_interval: Duration,
    pub reminder_horizon: Duration,
    pub snooze: Duration,
}

impl AppConfig {
    /// Read the process environment. Only `TASKGENIUS_API_URL` is required.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same parsing as [`AppConfig::from_env`] against an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("TASKGENIUS_API_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("TASKGENIUS_API_URL is not set".to_string()))?;
        let api_token = lookup("TASKGENIUS_TOKEN").filter(|v| !v.is_empty());

        let refresh_interval = secs(&lookup, "TASKGENIUS_REFRESH_SECS", DEFAULT_REFRESH_SECS)?;
        let reminder_horizon = secs(&lookup, "TASKGENIUS_REMINDER_HORIZON_SECS", DEFAULT_HORIZON_SECS)?;
        let snooze = secs(&lookup, "TASKGENIUS_SNOOZE_SECS", DEFAULT_SNOOZE_SECS)?;

        if refresh_interval.is_zero() {
            return Err(AppError::Config("TASKGENIUS_REFRESH_SECS must be positive".to_string()));
        }
        // A zero horizon would silently disable every reminder.
        if reminder_horizon.is_zero() {
            return Err(AppError::Config(
                "TASKGENIUS_REMINDER_HORIZON_SECS must be positive".to_string(),
            ));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_token,
            refresh_interval,
            reminder_horizon,
            snooze,
        })
    }

    /// Horizon and snooze for the reminder scheduler.
    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            horizon: self.reminder_horizon,
            snooze: self.snooze,
        }
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::Config(format!("{} must be a number of seconds, got {:?}", key, raw))),
    }
}
