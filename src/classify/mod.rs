//! Path-based asset typing.
//!
//! Turns a source-relative path into a canonical virtual path, a semantic
//! [`AssetType`] and a format string. Evaluation order:
//!
//! 1. denylists ([`is_denied`]): hidden, build and VCS files are not assets
//! 2. built-in table of specific types
//! 3. registered [`TypeGuesser`] hooks, first `Some` wins
//! 4. generic text types (`lua`, `txt`, `xml`, `yml`, `yaml`)
//! 5. [`AssetType::Unknown`] with the raw extension as format
//!
//! Misnamed files (`foo.png.png`, `model.obj.txt`) still classify, but raise
//! a diagnostic the first time the classifier sees that path.

mod extension;
mod rules;

pub use extension::Ambiguity;
pub use rules::is_denied;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::asset::AssetType;
use crate::hooks::{HookId, ObserverList};
use crate::overlay::Diagnostic;
use crate::utils::path::{file_name, split_extension};

use extension::Matcher;
use rules::{BUILTIN, GENERIC, Rule, canonical_path};

/// Result of classifying a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Canonical virtual path, usually without the type's extension.
    pub path: String,
    pub kind: AssetType,
    pub format: String,
}

/// External classifier consulted when no built-in rule matches.
pub type TypeGuesser = dyn Fn(&str) -> Option<Classification> + Send + Sync;

/// Path classifier with extension hooks and once-per-path diagnostics.
#[derive(Default)]
pub struct TypeClassifier {
    guessers: ObserverList<TypeGuesser>,
    warned: Mutex<FxHashSet<String>>,
}

impl TypeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type guesser. Guessers run in registration order.
    pub fn add_guesser(&self, guesser: Arc<TypeGuesser>) -> HookId {
        self.guessers.add(guesser)
    }

    pub fn remove_guesser(&self, id: HookId) -> bool {
        self.guessers.remove(id)
    }

    /// Classify `path`, or `None` if it is not an asset.
    ///
    /// An ambiguity diagnostic goes to `report` at most once per path over
    /// the lifetime of this classifier.
    pub fn classify(&self, path: &str, report: &mut dyn FnMut(Diagnostic)) -> Option<Classification> {
        if is_denied(path) {
            return None;
        }

        let (classification, ambiguity) = self.guess(path);
        if let Some(ambiguity) = ambiguity
            && self.warned.lock().insert(path.to_string())
        {
            report(Diagnostic::ambiguous(path, ambiguity));
        }
        Some(classification)
    }

    /// Run the rule chain without denylists or diagnostic bookkeeping.
    pub fn guess(&self, path: &str) -> (Classification, Option<Ambiguity>) {
        let name = file_name(path);
        let Some(raw_format) = split_extension(name).1 else {
            return (unknown(path, ""), None);
        };

        let directory = &path[..path.len() - name.len()];
        let stem = split_extension(name).0;
        let mut matcher = Matcher::new(name);

        if let Some(rule) = first_match(&BUILTIN, directory, stem, &mut matcher) {
            return (resolve(path, raw_format, rule), matcher.ambiguity());
        }

        for guesser in self.guessers.snapshot() {
            if let Some(found) = guesser(path) {
                return (found, matcher.ambiguity());
            }
        }

        if let Some(rule) = first_match(&GENERIC, directory, stem, &mut matcher) {
            return (resolve(path, raw_format, rule), matcher.ambiguity());
        }

        (unknown(path, raw_format), matcher.ambiguity())
    }
}

fn first_match<'r>(
    rules: &'r [Rule],
    directory: &str,
    stem: &str,
    matcher: &mut Matcher<'_>,
) -> Option<&'r Rule> {
    rules.iter().find(|rule| rule.matches(directory, stem, matcher))
}

fn resolve(path: &str, raw_format: &str, rule: &Rule) -> Classification {
    Classification {
        path: canonical_path(path, rule),
        kind: rule.kind.clone(),
        format: rule.format.unwrap_or(raw_format).to_string(),
    }
}

fn unknown(path: &str, format: &str) -> Classification {
    Classification {
        path: path.to_string(),
        kind: AssetType::Unknown,
        format: format.to_string(),
    }
}
