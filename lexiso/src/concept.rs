//! Concept references and the read-only dictionary used to label them.

use core::fmt;
use core::hash::BuildHasher;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

/// Stable identifier of an ontology concept (a SOLOR/SNOMED concept UUID).
///
/// Concept nodes carry one as their asserted concept, role nodes carry one as
/// their role type. Two references are the same concept iff their UUIDs are
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConceptRef(Uuid);

impl ConceptRef {
    /// Wrap a concept UUID.
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build a reference from a raw 128-bit value. Mostly handy in tests.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The underlying UUID.
    pub const fn uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ConceptRef {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ConceptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Read-only terminology lookup: concept reference to a human-readable
/// description.
///
/// Only display code consults a dictionary. Solvers and the merge builder
/// work on identifiers alone.
pub trait ConceptDictionary {
    /// Describe `concept`, or `None` when the dictionary does not know it.
    fn describe(&self, concept: ConceptRef) -> Option<Cow<'_, str>>;
}

/// The empty dictionary: every concept is shown by its UUID.
impl ConceptDictionary for () {
    fn describe(&self, _concept: ConceptRef) -> Option<Cow<'_, str>> {
        None
    }
}

impl<S: BuildHasher> ConceptDictionary for HashMap<ConceptRef, String, S> {
    fn describe(&self, concept: ConceptRef) -> Option<Cow<'_, str>> {
        self.get(&concept).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl ConceptDictionary for BTreeMap<ConceptRef, String> {
    fn describe(&self, concept: ConceptRef) -> Option<Cow<'_, str>> {
        self.get(&concept).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl<D: ConceptDictionary + ?Sized> ConceptDictionary for &D {
    fn describe(&self, concept: ConceptRef) -> Option<Cow<'_, str>> {
        (**self).describe(concept)
    }
}

/// Write the dictionary description of `concept`, falling back to its UUID.
pub(crate) fn write_concept<D: ConceptDictionary + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    dictionary: &D,
    concept: ConceptRef,
) -> fmt::Result {
    match dictionary.describe(concept) {
        Some(label) => f.write_str(&label),
        None => write!(f, "{concept}"),
    }
}
