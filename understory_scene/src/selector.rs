// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node selectors for [`Scene::find`](crate::Scene::find).
//!
//! A pattern is a comma-separated list of clauses; a node matches when any
//! clause matches:
//!
//! - `#foo` matches the node whose `id` is `foo`,
//! - `.bar` matches nodes with `bar` among their whitespace-separated names,
//! - a bare word matches the node type (`Stage`, `Layer`, `Group`, `Shape`)
//!   or the shape class (`Rect`, `Circle`, ...).

use core::fmt;

use smallvec::SmallVec;

use crate::node::NodeRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Clause<'a> {
    Id(&'a str),
    Name(&'a str),
    Type(&'a str),
}

impl Clause<'_> {
    fn matches(&self, node: NodeRef<'_>) -> bool {
        match *self {
            Self::Id(id) => node.id() == Some(id),
            Self::Name(name) => node.has_name(name),
            Self::Type(ty) => node.kind().type_name() == ty || node.class_name() == ty,
        }
    }
}

/// A string pattern or a predicate over nodes.
///
/// ## Example
///
/// ```rust
/// use understory_scene::{NodeRef, Selector};
///
/// let by_pattern = Selector::from("#header, .primary");
/// let pred = |n: NodeRef<'_>| n.index() == 0;
/// let by_predicate = Selector::from(&pred as &dyn Fn(NodeRef<'_>) -> bool);
/// # let _ = (by_pattern, by_predicate);
/// ```
#[derive(Clone)]
pub enum Selector<'a> {
    /// Parsed clauses, matched with logical OR.
    Pattern(Pattern<'a>),
    /// Arbitrary predicate.
    Predicate(&'a dyn Fn(NodeRef<'_>) -> bool),
}

/// Parsed form of a selector string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern<'a> {
    clauses: SmallVec<[Clause<'a>; 2]>,
}

impl<'a> Pattern<'a> {
    /// Parse a comma-separated selector string.
    ///
    /// Clauses are trimmed and empty clauses are ignored.
    pub fn parse(selector: &'a str) -> Self {
        let clauses = selector
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| {
                if let Some(id) = clause.strip_prefix('#') {
                    Clause::Id(id)
                } else if let Some(name) = clause.strip_prefix('.') {
                    Clause::Name(name)
                } else {
                    if clause.starts_with(|c: char| c.is_ascii_lowercase()) {
                        log::warn!(
                            "selector clause {clause:?} starts with a lowercase letter; \
                             type names are capitalized, use \"#{clause}\" to match an id"
                        );
                    }
                    Clause::Type(clause)
                }
            })
            .collect();
        Self { clauses }
    }

    /// Returns true if the pattern has no clauses and therefore matches nothing.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn matches(&self, node: NodeRef<'_>) -> bool {
        self.clauses.iter().any(|clause| clause.matches(node))
    }
}

impl Selector<'_> {
    /// Returns true if `node` satisfies the selector.
    pub fn matches(&self, node: NodeRef<'_>) -> bool {
        match self {
            Self::Pattern(pattern) => pattern.matches(node),
            Self::Predicate(pred) => pred(node),
        }
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(selector: &'a str) -> Self {
        Self::Pattern(Pattern::parse(selector))
    }
}

impl<'a> From<&'a dyn Fn(NodeRef<'_>) -> bool> for Selector<'a> {
    fn from(pred: &'a dyn Fn(NodeRef<'_>) -> bool) -> Self {
        Self::Predicate(pred)
    }
}

impl fmt::Debug for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Self::Predicate(_) => f.debug_tuple("Predicate").finish_non_exhaustive(),
        }
    }
}
