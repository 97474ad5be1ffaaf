//! Load-spec resolution.
//!
//! A depth-first walk turns the spec tree into the list of leaf selectors
//! below each node, in declaration order. Every leaf yields two selectors:
//! - combined: all bindings from the root of the walk down to the leaf
//! - isolated: only bindings introduced inside the subtree being resolved
//!
//! A `GroupVisitor` sees every (dimension, group) branch after its subtree
//! has been resolved; the aggregation binder hooks in there.

use crate::spec::{ResolvedSelector, SpecNode};

use std::convert::Infallible;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub combined: Vec<ResolvedSelector>,
    pub isolated: Vec<ResolvedSelector>,
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.combined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}

pub trait GroupVisitor {
    type Error;

    /// Called once per branch, post-order.
    ///
    /// `resolved_group` holds the bindings down to and including
    /// `dimension = group`; `subtree` is that branch's resolution with the
    /// isolated selectors already prefixed by `dimension = group`.
    fn visit_group(
        &mut self,
        dimension: &str,
        group: &str,
        resolved_group: &ResolvedSelector,
        subtree: &Resolution,
    ) -> Result<(), Self::Error>;
}

struct NoVisit;

impl GroupVisitor for NoVisit {
    type Error = Infallible;

    fn visit_group(
        &mut self,
        _: &str,
        _: &str,
        _: &ResolvedSelector,
        _: &Resolution,
    ) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Resolve a whole spec from the empty selector.
pub fn resolve(node: &SpecNode) -> Resolution {
    match resolve_with(node, &ResolvedSelector::new(), &mut NoVisit) {
        Ok(resolution) => resolution,
        Err(never) => match never {},
    }
}

pub fn resolve_with<V: GroupVisitor>(
    node: &SpecNode,
    resolved: &ResolvedSelector,
    visitor: &mut V,
) -> Result<Resolution, V::Error> {
    let (dimension, branches) = match node {
        SpecNode::Filter(filter) => {
            return Ok(Resolution {
                combined: vec![resolved.with_filter(filter)],
                isolated: vec![ResolvedSelector::from_filter(filter)],
            });
        }
        SpecNode::Group {
            dimension,
            branches,
        } => (dimension, branches),
    };

    let mut out = Resolution::default();
    for (group, child) in branches {
        let resolved_group = resolved.bind(dimension, group);
        let mut subtree = resolve_with(child, &resolved_group, visitor)?;
        subtree.isolated = subtree
            .isolated
            .iter()
            .map(|sel| sel.prefixed(dimension, group))
            .collect();

        visitor.visit_group(dimension, group, &resolved_group, &subtree)?;

        out.combined.extend(subtree.combined);
        out.isolated.extend(subtree.isolated);
    }
    Ok(out)
}

/// Leaves that have no `aggregate_on` group anywhere above them.
pub fn unaggregated_leaves(node: &SpecNode, aggregate_on: &str) -> Vec<ResolvedSelector> {
    fn walk(
        node: &SpecNode,
        aggregate_on: &str,
        resolved: &ResolvedSelector,
        covered: bool,
        out: &mut Vec<ResolvedSelector>,
    ) {
        match node {
            SpecNode::Filter(filter) => {
                if !covered {
                    out.push(resolved.with_filter(filter));
                }
            }
            SpecNode::Group {
                dimension,
                branches,
            } => {
                let covered = covered || dimension == aggregate_on;
                for (group, child) in branches {
                    walk(child, aggregate_on, &resolved.bind(dimension, group), covered, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(node, aggregate_on, &ResolvedSelector::new(), false, &mut out);
    out
}
