//! An immutable set of integer-valued feature switches (spec §3, §4.5).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Anything that can be viewed as an `i64` switch value.
///
/// Plain integers implement this directly; callers with a richer "switch"
/// type (e.g. an enum with an associated integer) can implement it too, so
/// membership queries accept either form (spec §3: "Members may be supplied
/// as plain ints or as objects exposing an integer view").
pub trait IntoSwitch {
    /// Return the integer value this switch represents.
    fn into_switch(self) -> i64;
}

impl IntoSwitch for i64 {
    fn into_switch(self) -> i64 {
        self
    }
}

impl IntoSwitch for i32 {
    fn into_switch(self) -> i64 {
        i64::from(self)
    }
}

impl IntoSwitch for &i64 {
    fn into_switch(self) -> i64 {
        *self
    }
}

impl IntoSwitch for &i32 {
    fn into_switch(self) -> i64 {
        i64::from(*self)
    }
}

/// An immutable set of integer feature switches.
///
/// Equality is set equality over the integer values; registration order
/// and duplicate entries are irrelevant (spec §3, §8).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchSet {
    members: BTreeSet<i64>,
}

impl SwitchSet {
    /// Build an empty switch set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a switch set from an iterator of switch-like values.
    pub fn from_iter<I, S>(switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoSwitch,
    {
        Self {
            members: switches.into_iter().map(IntoSwitch::into_switch).collect(),
        }
    }

    /// Whether `switch` is a member of this set.
    #[must_use]
    pub fn contains(&self, switch: impl IntoSwitch) -> bool {
        self.members.contains(&switch.into_switch())
    }

    /// Whether any of `self`'s switches is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of distinct integer switches in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Iterate the switch values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.members.iter().copied()
    }
}

impl std::iter::FromIterator<i64> for SwitchSet {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_accepts_int_or_ref() {
        let set = SwitchSet::from_iter([1i64, 2, 3]);
        assert!(set.contains(2));
        assert!(set.contains(&2i64));
        assert!(!set.contains(4));
    }

    #[test]
    fn duplicate_members_collapse() {
        let set = SwitchSet::from_iter([1i64, 2, 1]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn equality_is_set_equality_ignoring_order() {
        let a = SwitchSet::from_iter([1i64, 2, 3]);
        let b = SwitchSet::from_iter([3i64, 1, 2]);
        assert_eq!(a, b);
    }
}
