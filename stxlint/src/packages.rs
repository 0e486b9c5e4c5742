//! Import-availability probing for conditionally gated rules.
//!
//! FM rules only make sense when the mm-based plotting stack is installed in
//! the user's Python environment, so rule gating asks a [`PackageProbe`]
//! instead of assuming. The probe is injectable: production code shells out
//! to the interpreter, tests substitute a [`StaticProbe`].

use rustc_hash::{FxHashMap, FxHashSet};
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Capability to answer "is this Python package importable?".
pub trait PackageProbe: Send + Sync {
    /// Returns true if `import name` would succeed.
    fn is_available(&self, name: &str) -> bool;
}

/// Default probe: runs `python -c "import <name>"` once per package and
/// caches the result until [`InterpreterProbe::reset`] is called.
#[derive(Debug, Default)]
pub struct InterpreterProbe {
    cache: Mutex<FxHashMap<String, bool>>,
}

impl InterpreterProbe {
    /// Creates a probe with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide probe instance.
    pub fn global() -> &'static Self {
        static PROBE: OnceLock<InterpreterProbe> = OnceLock::new();
        PROBE.get_or_init(Self::new)
    }

    /// Clears the cache so the next query re-runs the interpreter.
    pub fn reset(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn try_import(name: &str) -> bool {
        // Module names come from the rule catalog, not user input.
        let script = format!("import {name}");
        for python in ["python3", "python"] {
            match Command::new(python)
                .args(["-c", &script])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) => return status.success(),
                Err(_) => continue, // interpreter not on PATH, try the next
            }
        }
        false
    }
}

impl PackageProbe for InterpreterProbe {
    fn is_available(&self, name: &str) -> bool {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(known) = cache.get(name) {
            return *known;
        }
        let available = Self::try_import(name);
        cache.insert(name.to_owned(), available);
        available
    }
}

/// Test probe with a fixed set of available packages.
#[derive(Debug, Default)]
pub struct StaticProbe {
    available: FxHashSet<String>,
}

impl StaticProbe {
    /// Creates a probe that reports exactly `names` as importable.
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        Self {
            available: names.iter().map(|n| (*n).to_owned()).collect(),
        }
    }
}

impl PackageProbe for StaticProbe {
    fn is_available(&self, name: &str) -> bool {
        self.available.contains(name)
    }
}

/// Which suggestion variant to show, based on what the user has installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionContext {
    /// Both scitex and figrecipe are available.
    Both,
    /// Only scitex is available.
    Stx,
    /// Only figrecipe is available.
    Fr,
}

/// Availability snapshot for the packages the catalog gates on.
#[derive(Debug, Clone, Copy)]
pub struct PackageContext {
    /// `import scitex` succeeds.
    pub scitex: bool,
    /// `import figrecipe` or `import scitex.plt` succeeds.
    pub figrecipe: bool,
}

impl PackageContext {
    /// Queries the probe for the gated packages.
    pub fn detect(probe: &dyn PackageProbe) -> Self {
        Self {
            scitex: probe.is_available("scitex"),
            figrecipe: probe.is_available("figrecipe") || probe.is_available("scitex.plt"),
        }
    }

    /// Suggestion variant matching the availability snapshot.
    #[must_use]
    pub fn suggestion_context(self) -> SuggestionContext {
        if self.figrecipe && self.scitex {
            SuggestionContext::Both
        } else if self.scitex {
            SuggestionContext::Stx
        } else {
            SuggestionContext::Fr
        }
    }
}
