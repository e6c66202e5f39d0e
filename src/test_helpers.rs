//! Shared test utilities for serialising environment mutation.

use std::env;
use std::ffi::OsString;

use tokio::sync::{Mutex, MutexGuard};

/// Serialises every test that touches the process environment.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets an environment variable while holding a global mutex.
    pub async fn set_var(key: &str, value: &str) -> Self {
        let guard = ENV_LOCK.lock().await;
        let previous = vec![(key.to_owned(), env::var_os(key))];
        // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
        unsafe { env::set_var(key, value) };
        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
