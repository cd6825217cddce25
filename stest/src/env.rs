//! Scoped changes to the process environment.
//!
//! Test bodies running in parallel should use
//! [`TestContext::with_environment`](crate::TestContext::with_environment),
//! which only affects the commands that context spawns. The function here
//! mutates the real process environment and is meant for single-threaded
//! callers.

use std::ffi::OsString;

/// Restores the recorded variables when dropped.
#[must_use = "the environment is restored as soon as the guard is dropped"]
struct EnvironmentGuard {
    previous: Vec<(String, Option<OsString>)>,
}

impl EnvironmentGuard {
    /// Record the current values of `vars` and apply the new ones.
    fn set<K, V>(vars: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let previous = vars
            .iter()
            .map(|(key, _)| (key.as_ref().to_string(), std::env::var_os(key.as_ref())))
            .collect();

        for (key, value) in vars {
            std::env::set_var(key.as_ref(), value.as_ref());
        }

        Self { previous }
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        // Reverse order so a key listed twice ends up with its original value.
        for (key, value) in self.previous.iter().rev() {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Run `f` with `vars` set, restoring the previous values on every exit path.
pub fn with_environment<K, V, T>(vars: &[(K, V)], f: impl FnOnce() -> T) -> T
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let _guard = EnvironmentGuard::set(vars);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_values_restored_after_scope() {
        std::env::set_var("STEST_ENV_EXISTING", "before");
        std::env::remove_var("STEST_ENV_NEW");

        let seen = with_environment(
            &[("STEST_ENV_EXISTING", "during"), ("STEST_ENV_NEW", "added")],
            || {
                (
                    std::env::var("STEST_ENV_EXISTING").unwrap(),
                    std::env::var("STEST_ENV_NEW").unwrap(),
                )
            },
        );

        assert_eq!(seen.0, "during");
        assert_eq!(seen.1, "added");
        assert_eq!(std::env::var("STEST_ENV_EXISTING").unwrap(), "before");
        assert!(std::env::var_os("STEST_ENV_NEW").is_none());

        std::env::remove_var("STEST_ENV_EXISTING");
    }

    #[test]
    #[serial]
    fn test_values_restored_after_panic() {
        std::env::remove_var("STEST_ENV_PANIC");

        let result = std::panic::catch_unwind(|| {
            with_environment(&[("STEST_ENV_PANIC", "set")], || {
                panic!("body failed");
            })
        });

        assert!(result.is_err());
        assert!(std::env::var_os("STEST_ENV_PANIC").is_none());
    }

    #[test]
    #[serial]
    fn test_duplicate_keys_restore_original() {
        std::env::set_var("STEST_ENV_DUP", "original");

        with_environment(&[("STEST_ENV_DUP", "a"), ("STEST_ENV_DUP", "b")], || {
            assert_eq!(std::env::var("STEST_ENV_DUP").unwrap(), "b");
        });

        assert_eq!(std::env::var("STEST_ENV_DUP").unwrap(), "original");
        std::env::remove_var("STEST_ENV_DUP");
    }
}
