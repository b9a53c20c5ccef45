//! Utility functions and macros shared across the crate

use crate::errors::DomLiteError;
use regex::Regex;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Wraps argument in Arc<Mutex<T>> for thread-safe shared ownership
#[inline(always)]
pub(crate) fn arcify<T>(arg: T) -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(arg))
}

/// Locks a mutex, recovering the guard if a previous holder panicked
#[inline(always)]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Macro to create a static LazyLock
macro_rules! make_static {
    ($expr:expr) => {{ LazyLock::new(|| $expr) }};
}

/// Macro to define a lazily compiled regex alongside its source text
macro_rules! define_regex {
    ($name:ident, $name_text:ident, $text:expr) => {
        static $name_text: &str = $text;

        static $name: LazyLock<std::option::Option<regex::Regex>> =
            make_static!({ Regex::new($text).ok() });
    };
}

pub(crate) fn safe_static_regex(
    regex: Option<regex::Regex>,
    backup: &str,
) -> Result<Regex, DomLiteError> {
    regex.map(Ok).unwrap_or_else(|| {
        Regex::new(backup)
            .map_err(|_| DomLiteError::RegexError("Failed to compile regex".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    define_regex!(DIGITS, DIGITS_TEXT, r"\d+");

    #[test]
    fn static_regex_compiles_once_and_matches() {
        let regex = safe_static_regex(DIGITS.clone(), DIGITS_TEXT).unwrap();
        assert!(regex.is_match("abc123"));
        assert!(!regex.is_match("abc"));
    }

    #[test]
    fn lock_recovers_from_poison() {
        let shared = arcify(1);
        let cloned = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(shared.is_poisoned());
        *lock(&shared) += 1;
        assert_eq!(*lock(&shared), 2);
    }
}
