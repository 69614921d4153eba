//! Identifier generation with explicit collision handling.
//!
//! # Responsibility
//! - Abstract random id generation behind `IdGenerator`.
//! - Allocate ids that are unique against an existing collection.
//!
//! # Invariants
//! - `allocate_unique` never returns an id the `taken` predicate accepts.
//! - Allocation gives up after `IdPolicy::max_attempts` instead of looping.
//! - `SequenceIdGenerator` only exists for tests and the `test-util` feature.

use log::warn;
use rand::distributions::Alphanumeric;
use rand::Rng;

#[cfg(any(test, feature = "test-util"))]
pub use sequence::SequenceIdGenerator;

/// Default note id length (62^8 possible values).
pub const DEFAULT_NOTE_ID_LENGTH: usize = 8;
/// Default user id length.
pub const DEFAULT_USER_ID_LENGTH: usize = 10;
/// Default number of generation attempts before reporting a conflict.
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 8;

/// Source of candidate identifiers.
pub trait IdGenerator {
    /// Returns one candidate id of `length` URL-safe characters.
    fn generate(&self, length: usize) -> String;
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn generate(&self, length: usize) -> String {
        (**self).generate(length)
    }
}

/// Thread-local CSPRNG drawing from `[A-Za-z0-9]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self, length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }
}

/// Length and retry budget for one id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPolicy {
    pub length: usize,
    pub max_attempts: u32,
}

impl IdPolicy {
    pub fn notes() -> Self {
        Self {
            length: DEFAULT_NOTE_ID_LENGTH,
            max_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }

    pub fn users() -> Self {
        Self {
            length: DEFAULT_USER_ID_LENGTH,
            max_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
mod sequence {
    use super::IdGenerator;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted generator that replays a fixed list of ids.
    ///
    /// Once the script runs out, the last id is repeated forever, which makes
    /// collision exhaustion easy to provoke. An empty script yields `id{n}`.
    #[derive(Debug, Default)]
    pub struct SequenceIdGenerator {
        inner: Mutex<SequenceState>,
    }

    #[derive(Debug, Default)]
    struct SequenceState {
        script: VecDeque<String>,
        last: Option<String>,
        counter: u64,
    }

    impl SequenceIdGenerator {
        pub fn new<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                inner: Mutex::new(SequenceState {
                    script: ids.into_iter().map(Into::into).collect(),
                    ..SequenceState::default()
                }),
            }
        }
    }

    impl IdGenerator for SequenceIdGenerator {
        fn generate(&self, _length: usize) -> String {
            let mut state = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(id) = state.script.pop_front() {
                state.last = Some(id.clone());
                return id;
            }
            if let Some(id) = state.last.clone() {
                return id;
            }
            state.counter += 1;
            format!("id{}", state.counter)
        }
    }
}

/// Draws candidates until one is free, or returns `None` after the budget.
pub fn allocate_unique(
    generator: &dyn IdGenerator,
    policy: IdPolicy,
    namespace: &'static str,
    taken: impl Fn(&str) -> bool,
) -> Option<String> {
    for attempt in 1..=policy.max_attempts {
        let candidate = generator.generate(policy.length);
        if candidate.is_empty() || taken(&candidate) {
            warn!(
                "event=id_collision module=ids status=retry namespace={} attempt={}",
                namespace, attempt
            );
            continue;
        }
        return Some(candidate);
    }
    None
}
