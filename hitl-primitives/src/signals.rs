//! Signal contracts shared between upstream extractors and the engine.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_SIGNAL_NAME_LEN: usize = 96;

/// Single extracted observation about a call or an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Boolean flag such as `objection_detected`.
    Flag(bool),
    /// Bounded scalar, either in `[0, 1]` or `[0, 100]` depending on the signal.
    Number(f64),
    /// Categorical label such as a sentiment class.
    Label(String),
}

impl SignalValue {
    /// Returns a short name for the variant, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Number(_) => "number",
            Self::Label(_) => "label",
        }
    }

    /// Returns the numeric payload, if any.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the label payload, if any.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }

    /// Returns the flag payload, if any.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl From<bool> for SignalValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        Self::Label(value.to_owned())
    }
}

impl From<String> for SignalValue {
    fn from(value: String) -> Self {
        Self::Label(value)
    }
}

/// Mapping from signal name to value produced once per decision cycle.
///
/// Iteration order is the lexical order of signal names so that anything
/// derived from a set is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, SignalValue>", into = "BTreeMap<String, SignalValue>")]
pub struct SignalSet {
    values: BTreeMap<String, SignalValue>,
}

impl SignalSet {
    /// Creates an empty signal set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a signal, replacing any previous value under the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignalName`] when the name is blank or too long.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SignalValue>) -> Result<()> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidSignalName {
                name,
                reason: "signal name cannot be empty".into(),
            });
        }
        if trimmed.len() > MAX_SIGNAL_NAME_LEN {
            return Err(Error::InvalidSignalName {
                name,
                reason: format!("signal name length must be <= {MAX_SIGNAL_NAME_LEN}"),
            });
        }
        self.values.insert(trimmed.to_owned(), value.into());
        Ok(())
    }

    /// Adds a signal and returns the updated set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignalName`] when the name is blank or too long.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SignalValue>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Returns the value recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.values.get(name)
    }

    /// Returns `true` when no signal was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of signals in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates over signals in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SignalValue> {
        self.values.iter()
    }
}

impl TryFrom<BTreeMap<String, SignalValue>> for SignalSet {
    type Error = Error;

    fn try_from(values: BTreeMap<String, SignalValue>) -> Result<Self> {
        values
            .into_iter()
            .try_fold(Self::new(), |set, (name, value)| set.with(name, value))
    }
}

impl From<SignalSet> for BTreeMap<String, SignalValue> {
    fn from(set: SignalSet) -> Self {
        set.values
    }
}

impl<'a> IntoIterator for &'a SignalSet {
    type Item = (&'a String, &'a SignalValue);
    type IntoIter = btree_map::Iter<'a, String, SignalValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
