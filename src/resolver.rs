//! Monotone, generalize-only type resolution for a single column.

use std::{fmt, hash::Hash};

use crate::hierarchy::TypeHierarchy;

/// Tracks the most specific type that fits every value observed so far.
///
/// The first value is classified top-down: starting at the root, the resolver
/// descends into the first child (in registration order) whose predicate
/// matches until no child does. Every later value only tests the current
/// node; on a mismatch the resolver walks up to the first ancestor that
/// accepts the value. It never descends again, so the reported type can only
/// become more general over time.
pub struct TypeResolver<'h, T, V> {
    hierarchy: &'h TypeHierarchy<T, V>,
    current: usize,
    has_type: bool,
}

impl<'h, T, V> TypeResolver<'h, T, V>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(hierarchy: &'h TypeHierarchy<T, V>) -> Self {
        Self {
            hierarchy,
            current: hierarchy.root_position(),
            has_type: false,
        }
    }

    pub fn accept(&mut self, value: &V) {
        if !self.has_type {
            self.current = self.classify(value);
            self.has_type = true;
            return;
        }
        if self.hierarchy.test_at(self.current, value) {
            return;
        }
        while let Some(parent) = self.hierarchy.parent_of(self.current) {
            self.current = parent;
            if self.hierarchy.test_at(parent, value) {
                return;
            }
        }
    }

    /// The root's type until a value has been observed.
    pub fn most_specific_type(&self) -> &'h T {
        self.hierarchy.type_at(self.current)
    }

    pub fn has_type(&self) -> bool {
        self.has_type
    }

    pub fn reached_top(&self) -> bool {
        self.current == self.hierarchy.root_position()
    }

    fn classify(&self, value: &V) -> usize {
        let mut position = self.hierarchy.root_position();
        while let Some(&child) = self
            .hierarchy
            .children_of(position)
            .iter()
            .find(|&&child| self.hierarchy.test_at(child, value))
        {
            position = child;
        }
        position
    }
}

impl<T: fmt::Debug, V> fmt::Debug for TypeResolver<'_, T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeResolver")
            .field("current", self.hierarchy.type_at(self.current))
            .field("has_type", &self.has_type)
            .finish()
    }
}
