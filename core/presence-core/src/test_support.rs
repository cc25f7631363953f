//! Shared helpers for unit tests that touch process environment variables.

use std::env;
use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serializes every test in the crate that reads or writes the environment.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restores the prior value of `key` on drop. Hold [`env_lock`] first.
pub struct EnvGuard {
    key: &'static str,
    prior: Option<String>,
}

impl EnvGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let prior = env::var(key).ok();
        env::set_var(key, value);
        Self { key, prior }
    }

    pub fn unset(key: &'static str) -> Self {
        let prior = env::var(key).ok();
        env::remove_var(key);
        Self { key, prior }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        if let Some(value) = &self.prior {
            env::set_var(self.key, value);
        } else {
            env::remove_var(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_prior_value() {
        let _lock = env_lock();
        let key = "EDITOR_PRESENCE_TEST_SUPPORT";
        {
            let _outer = EnvGuard::set(key, "outer");
            {
                let _inner = EnvGuard::set(key, "inner");
                assert_eq!(env::var(key).as_deref(), Ok("inner"));
            }
            assert_eq!(env::var(key).as_deref(), Ok("outer"));
        }
        assert!(env::var(key).is_err());
    }
}
