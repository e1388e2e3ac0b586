// src/proposal/selection.rs

//! Which proposed operations the user currently intends to apply.
//! Membership is keyed by the operation's transient index, never by payload
//! equality, so edits cannot desync it.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: BTreeSet<usize>,
}

impl SelectionSet {
    /// All operations selected — the default state of a fresh proposal.
    pub fn all(count: usize) -> Self {
        Self {
            selected: (0..count).collect(),
        }
    }

    /// Flip membership; returns whether the index is selected afterwards.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.selected.remove(&index) {
            false
        } else {
            self.selected.insert(index);
            true
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected indices in ascending order — the execution order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_restores_membership() {
        let original = SelectionSet::all(3);
        let mut set = original.clone();
        set.toggle(1);
        assert!(!set.contains(1));
        set.toggle(1);
        assert_eq!(set, original);
    }

    #[test]
    fn defaults_to_everything_selected() {
        let set = SelectionSet::all(2);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![0, 1]);
    }
}
