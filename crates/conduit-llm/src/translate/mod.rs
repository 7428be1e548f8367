//! Translator chains for requests, responses, and streamed chunks
//!
//! A translator declares whether it applies to a canonical value and how
//! to rewrite it. Chains dispatch first-match-wins in registration order:
//! exactly one translator touches a value, and no match is a silent
//! pass-through rather than an error.

pub mod builtin;

use std::fmt;
use std::sync::Arc;

/// Rewrites one kind of canonical value for a backend's quirks
///
/// Implementations must be pure functions of their input.
pub trait Translator<T>: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether this translator applies to `value`
    fn can_handle(&self, value: &T) -> bool;

    /// Produce the rewritten value
    fn translate(&self, value: T) -> T;
}

type Predicate<T> = dyn Fn(&T) -> bool + Send + Sync;
type Transform<T> = dyn Fn(T) -> T + Send + Sync;

/// Translator built from a predicate and a transform closure
pub struct FnTranslator<T> {
    name: String,
    predicate: Box<Predicate<T>>,
    transform: Box<Transform<T>>,
}

impl<T> FnTranslator<T> {
    /// Pair a predicate with a transform
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        transform: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            transform: Box::new(transform),
        }
    }
}

impl<T> Translator<T> for FnTranslator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_handle(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn translate(&self, value: T) -> T {
        (self.transform)(value)
    }
}

impl<T> fmt::Debug for FnTranslator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTranslator").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Translator that never applies
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTranslator;

impl<T> Translator<T> for NoopTranslator {
    fn name(&self) -> &str {
        "noop"
    }

    fn can_handle(&self, _value: &T) -> bool {
        false
    }

    fn translate(&self, value: T) -> T {
        value
    }
}

/// Ordered translators for one axis
pub struct Chain<T> {
    translators: Vec<Arc<dyn Translator<T>>>,
    fallback: NoopTranslator,
}

impl<T> Chain<T> {
    /// Empty chain: every value passes through unchanged
    pub fn new() -> Self {
        Self {
            translators: Vec::new(),
            fallback: NoopTranslator,
        }
    }

    /// Append a translator; earlier registrations take priority
    pub fn push(&mut self, translator: Arc<dyn Translator<T>>) {
        self.translators.push(translator);
    }

    /// Number of registered translators
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    /// Whether no translator is registered
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// Names of the registered translators, in priority order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.translators.iter().map(|t| t.name())
    }

    /// Rewrite `value` with the first translator that applies
    pub fn dispatch(&self, value: T) -> T {
        match self.translators.iter().find(|t| t.can_handle(&value)) {
            Some(translator) => {
                tracing::trace!(translator = translator.name(), "translator applied");
                translator.translate(value)
            }
            None => self.fallback.translate(value),
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
