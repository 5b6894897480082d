use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::AdapterError;

#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl RetryConfig {
    pub const fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

pub fn call_with_retry<F, T>(f: F, config: &RetryConfig) -> Result<T, AdapterError>
where
    F: FnMut() -> Result<T, AdapterError>,
{
    call_with_retry_using(f, config, thread::sleep)
}

/// The delay before attempt N+1 is `base_delay * N`, growing linearly. The
/// sleep function is injectable so tests can run without waiting.
pub fn call_with_retry_using<F, T, S>(
    mut f: F,
    config: &RetryConfig,
    mut sleep: S,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Result<T, AdapterError>,
    S: FnMut(Duration),
{
    let mut last_error: Option<AdapterError> = None;

    for attempt in 1..=config.max_attempts {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    "request failed (attempt {}/{}): {}",
                    attempt, config.max_attempts, err
                );
                if attempt < config.max_attempts {
                    sleep(config.base_delay * attempt as u32);
                }
                last_error = Some(err);
            }
        }
    }

    let err = last_error.unwrap_or(AdapterError::EmptyResponse);
    Err(AdapterError::retry_exhausted(config.max_attempts, err))
}
