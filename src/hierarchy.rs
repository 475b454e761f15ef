//! Tree of type identities used for per-column type inference.
//!
//! A [`TypeHierarchy`] is a fixed tree whose root is the most general type.
//! Every node carries a [`TypeTester`] whose predicate answers "can this raw
//! value be represented by this node's type or by one of its descendants".
//! Nodes live in an arena addressed by index; each keeps its parent index and
//! its children in registration order, which is the order the resolver tries
//! them in.
//!
//! Hierarchies are immutable once built and cheap to clone: predicates are
//! reference counted.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    hash::Hash,
    sync::Arc,
};

use crate::{
    error::{Result, UnifyError},
    resolver::TypeResolver,
};

pub type Predicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// A type identity paired with its membership predicate.
pub struct TypeTester<T, V> {
    column_type: T,
    predicate: Predicate<V>,
}

impl<T, V> TypeTester<T, V> {
    pub fn new<F>(column_type: T, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self {
            column_type,
            predicate: Arc::new(predicate),
        }
    }

    /// Tester that accepts every value, the usual choice for the root.
    pub fn accept_all(column_type: T) -> Self {
        Self {
            column_type,
            predicate: Arc::new(|_: &V| true),
        }
    }

    pub fn column_type(&self) -> &T {
        &self.column_type
    }

    pub fn test(&self, value: &V) -> bool {
        (self.predicate)(value)
    }
}

impl<T: Clone, V> Clone for TypeTester<T, V> {
    fn clone(&self) -> Self {
        Self {
            column_type: self.column_type.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T: fmt::Debug, V> fmt::Debug for TypeTester<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTester")
            .field("column_type", &self.column_type)
            .finish_non_exhaustive()
    }
}

struct TypeNode<T, V> {
    tester: TypeTester<T, V>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl<T: Clone, V> Clone for TypeNode<T, V> {
    fn clone(&self) -> Self {
        Self {
            tester: self.tester.clone(),
            parent: self.parent,
            children: self.children.clone(),
        }
    }
}

pub struct TypeHierarchy<T, V> {
    nodes: Vec<TypeNode<T, V>>,
    positions: HashMap<T, usize>,
}

const ROOT: usize = 0;

impl<T, V> TypeHierarchy<T, V>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    pub fn builder(root: TypeTester<T, V>) -> TypeHierarchyBuilder<T, V> {
        TypeHierarchyBuilder::new(root)
    }

    pub fn root_type(&self) -> &T {
        self.nodes[ROOT].tester.column_type()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Types in registration order, root first.
    pub fn types(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes.iter().map(|node| node.tester.column_type())
    }

    pub fn supports_type(&self, column_type: &T) -> bool {
        self.positions.contains_key(column_type)
    }

    pub fn parent_type(&self, column_type: &T) -> Option<&T> {
        let position = *self.positions.get(column_type)?;
        self.nodes[position]
            .parent
            .map(|parent| self.nodes[parent].tester.column_type())
    }

    /// Returns true when `descendant` lies in the subtree rooted at `ancestor`
    /// (a type is considered its own descendant).
    pub fn is_descendant(&self, descendant: &T, ancestor: &T) -> bool {
        let (Some(&from), Some(&target)) =
            (self.positions.get(descendant), self.positions.get(ancestor))
        else {
            return false;
        };
        let mut current = Some(from);
        while let Some(position) = current {
            if position == target {
                return true;
            }
            current = self.nodes[position].parent;
        }
        false
    }

    pub fn create_resolver(&self) -> TypeResolver<'_, T, V> {
        TypeResolver::new(self)
    }

    /// Rebuilds the same tree over type identities instead of raw values.
    ///
    /// The predicate of every node accepts exactly the types of its own
    /// subtree, so a resolver over the returned hierarchy generalizes already
    /// resolved types the same way the original generalizes raw values.
    pub fn create_type_focused_hierarchy(&self) -> TypeHierarchy<T, T>
    where
        T: Send + Sync + 'static,
    {
        let nodes = (0..self.nodes.len())
            .map(|position| {
                let subtree: HashSet<T> = self
                    .subtree(position)
                    .into_iter()
                    .map(|member| self.nodes[member].tester.column_type().clone())
                    .collect();
                let node = &self.nodes[position];
                TypeNode {
                    tester: TypeTester::new(node.tester.column_type().clone(), move |t: &T| {
                        subtree.contains(t)
                    }),
                    parent: node.parent,
                    children: node.children.clone(),
                }
            })
            .collect();
        TypeHierarchy {
            nodes,
            positions: self.positions.clone(),
        }
    }

    fn subtree(&self, position: usize) -> Vec<usize> {
        let mut members = Vec::new();
        let mut pending = vec![position];
        while let Some(next) = pending.pop() {
            members.push(next);
            pending.extend(self.nodes[next].children.iter().copied());
        }
        members
    }
}

// Arena accessors used by the resolver.
impl<T, V> TypeHierarchy<T, V> {
    pub(crate) fn root_position(&self) -> usize {
        ROOT
    }

    pub(crate) fn parent_of(&self, position: usize) -> Option<usize> {
        self.nodes[position].parent
    }

    pub(crate) fn children_of(&self, position: usize) -> &[usize] {
        &self.nodes[position].children
    }

    pub(crate) fn test_at(&self, position: usize, value: &V) -> bool {
        self.nodes[position].tester.test(value)
    }

    pub(crate) fn type_at(&self, position: usize) -> &T {
        self.nodes[position].tester.column_type()
    }
}

impl<T: Clone, V> Clone for TypeHierarchy<T, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            positions: self.positions.clone(),
        }
    }
}

impl<T: fmt::Debug, V> fmt::Debug for TypeHierarchy<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for node in &self.nodes {
            list.entry(&(
                node.tester.column_type(),
                node.parent
                    .map(|parent| self.nodes[parent].tester.column_type()),
            ));
        }
        list.finish()
    }
}

pub struct TypeHierarchyBuilder<T, V> {
    nodes: Vec<TypeNode<T, V>>,
    positions: HashMap<T, usize>,
}

impl<T, V> TypeHierarchyBuilder<T, V>
where
    T: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(root: TypeTester<T, V>) -> Self {
        let mut positions = HashMap::new();
        positions.insert(root.column_type().clone(), ROOT);
        Self {
            nodes: vec![TypeNode {
                tester: root,
                parent: None,
                children: Vec::new(),
            }],
            positions,
        }
    }

    /// Registers `tester` as the last child of `parent`.
    pub fn add_type(mut self, parent: &T, tester: TypeTester<T, V>) -> Result<Self> {
        let child = tester.column_type().clone();
        if self.positions.contains_key(&child) {
            return Err(UnifyError::DuplicateType(format!("{child:?}")));
        }
        let parent_position =
            *self
                .positions
                .get(parent)
                .ok_or_else(|| UnifyError::UnknownParentType {
                    parent: format!("{parent:?}"),
                    child: format!("{child:?}"),
                })?;
        let position = self.nodes.len();
        self.nodes.push(TypeNode {
            tester,
            parent: Some(parent_position),
            children: Vec::new(),
        });
        self.nodes[parent_position].children.push(position);
        self.positions.insert(child, position);
        Ok(self)
    }

    pub fn build(self) -> TypeHierarchy<T, V> {
        TypeHierarchy {
            nodes: self.nodes,
            positions: self.positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Shape {
        Any,
        Number,
        Whole,
        Text,
    }

    fn shapes() -> TypeHierarchy<Shape, String> {
        TypeHierarchy::builder(TypeTester::accept_all(Shape::Any))
            .add_type(
                &Shape::Any,
                TypeTester::new(Shape::Number, |v: &String| v.parse::<f64>().is_ok()),
            )
            .and_then(|b| {
                b.add_type(
                    &Shape::Number,
                    TypeTester::new(Shape::Whole, |v: &String| v.parse::<i64>().is_ok()),
                )
            })
            .and_then(|b| {
                b.add_type(
                    &Shape::Any,
                    TypeTester::new(Shape::Text, |v: &String| {
                        v.chars().all(|c| c.is_alphabetic())
                    }),
                )
            })
            .expect("valid hierarchy")
            .build()
    }

    #[test]
    fn rejects_duplicate_types() {
        let err = TypeHierarchy::builder(TypeTester::<Shape, String>::accept_all(Shape::Any))
            .add_type(&Shape::Any, TypeTester::accept_all(Shape::Any))
            .err()
            .expect("duplicate must fail");
        assert!(matches!(err, UnifyError::DuplicateType(_)));
    }

    #[test]
    fn rejects_unknown_parent() {
        let err = TypeHierarchy::builder(TypeTester::<Shape, String>::accept_all(Shape::Any))
            .add_type(&Shape::Number, TypeTester::accept_all(Shape::Whole))
            .err()
            .expect("unknown parent must fail");
        assert!(matches!(
            err,
            UnifyError::UnknownParentType { ref parent, .. } if parent == "Number"
        ));
    }

    #[test]
    fn exposes_structure() {
        let hierarchy = shapes();
        assert_eq!(hierarchy.len(), 4);
        assert_eq!(hierarchy.root_type(), &Shape::Any);
        assert_eq!(hierarchy.parent_type(&Shape::Whole), Some(&Shape::Number));
        assert_eq!(hierarchy.parent_type(&Shape::Any), None);
        assert!(hierarchy.is_descendant(&Shape::Whole, &Shape::Any));
        assert!(!hierarchy.is_descendant(&Shape::Text, &Shape::Number));
        assert_eq!(
            hierarchy.types().copied().collect::<Vec<_>>(),
            vec![Shape::Any, Shape::Number, Shape::Whole, Shape::Text]
        );
    }

    #[test]
    fn type_focused_hierarchy_tests_subtree_membership() {
        let focused = shapes().create_type_focused_hierarchy();
        let number = focused.positions[&Shape::Number];
        assert!(focused.test_at(number, &Shape::Whole));
        assert!(focused.test_at(number, &Shape::Number));
        assert!(!focused.test_at(number, &Shape::Text));
        assert!(focused.test_at(focused.root_position(), &Shape::Text));
    }

    #[test]
    fn type_focused_resolver_generalizes_types() {
        let focused = shapes().create_type_focused_hierarchy();
        let mut resolver = focused.create_resolver();
        resolver.accept(&Shape::Whole);
        assert_eq!(resolver.most_specific_type(), &Shape::Whole);
        resolver.accept(&Shape::Number);
        assert_eq!(resolver.most_specific_type(), &Shape::Number);
        resolver.accept(&Shape::Text);
        assert_eq!(resolver.most_specific_type(), &Shape::Any);
    }
}
