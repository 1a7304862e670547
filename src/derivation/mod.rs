use fnv::FnvHashSet;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use crate::grammars::mcfg::{Grammar, RuleId, SymbolId};

pub mod binding;
pub mod labelling;

/// A derivation tree: either a symbol that is not expanded (any further),
/// or a symbol expanded with one of its rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Derivation {
    Leaf(SymbolId),
    /// the children follow the right-hand side of the rule
    Node(SymbolId, RuleId, Vec<Derivation>),
}

/// Errors raised when a derivation refers to rule annotations the grammar
/// does not have. These abort the run for the whole grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no binding annotation for rule {0}")]
    MissingBinding(String),
    #[error("no surface annotation for rule {0}")]
    MissingSurface(String),
    #[error("rule {rule} matches successor {successor}, which is not a verb")]
    NotAVerb { rule: String, successor: usize },
}

impl Derivation {
    pub fn symbol(&self) -> SymbolId {
        match *self {
            Derivation::Leaf(symbol) | Derivation::Node(symbol, _, _) => symbol,
        }
    }

    /// The length of the longest path from the root to a leaf.
    pub fn height(&self) -> usize {
        match *self {
            Derivation::Leaf(_) => 0,
            Derivation::Node(_, _, ref children) => {
                1 + children.iter().map(Derivation::height).max().unwrap_or(0)
            }
        }
    }

    /// The symbols at the leaves, from left to right.
    pub fn leaves(&self) -> Vec<SymbolId> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<SymbolId>) {
        match *self {
            Derivation::Leaf(symbol) => leaves.push(symbol),
            Derivation::Node(_, _, ref children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// Bracketed notation with the symbol names of `grammar`.
    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> DerivationDisplay<'a> {
        DerivationDisplay { tree: self, grammar }
    }
}

pub struct DerivationDisplay<'a> {
    tree: &'a Derivation,
    grammar: &'a Grammar,
}

impl<'a> Display for DerivationDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self.tree {
            Derivation::Leaf(symbol) => write!(f, "{}", self.grammar.name(symbol)),
            Derivation::Node(symbol, _, ref children) => {
                write!(f, "{}(", self.grammar.name(symbol))?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child.display(self.grammar))?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Grammar {
    /// Enumerates the derivations of `goal` with a height of at most `depth`.
    ///
    /// Each round keeps the trees found so far and adds every tree that
    /// results from expanding any of the new trees' leaves by one rule.
    /// With `filter_empty`, trees with a leaf that has no constants are
    /// dropped from the result.
    pub fn generate(&self, goal: SymbolId, depth: usize, filter_empty: bool) -> Vec<Derivation> {
        let mut seen = FnvHashSet::default();
        let mut options = vec![Derivation::Leaf(goal)];
        seen.insert(Derivation::Leaf(goal));
        let mut frontier = options.clone();

        for round in 0..depth {
            let mut expanded = Vec::new();
            for tree in &frontier {
                for option in self.expand_tree(tree) {
                    if seen.insert(option.clone()) {
                        expanded.push(option);
                    }
                }
            }
            debug!(
                "round {} from {}: {} new derivations",
                round + 1,
                self.name(goal),
                expanded.len()
            );
            if expanded.is_empty() {
                break;
            }
            options.extend(expanded.iter().cloned());
            frontier = expanded;
        }

        if filter_empty {
            options.retain(|tree| self.is_realizable(tree));
        }
        options
    }

    /// Whether every leaf of `tree` has at least one constant.
    pub fn is_realizable(&self, tree: &Derivation) -> bool {
        match *tree {
            Derivation::Leaf(symbol) => !self.constants(symbol).is_empty(),
            Derivation::Node(_, _, ref children) => children.iter().all(|c| self.is_realizable(c)),
        }
    }

    /// All trees that differ from `tree` by expanding at least one leaf.
    fn expand_tree(&self, tree: &Derivation) -> Vec<Derivation> {
        match *tree {
            Derivation::Leaf(symbol) => self
                .applicable(symbol)
                .iter()
                .map(|&rule| {
                    let children = self.rule(rule).rhs.iter().map(|&s| Derivation::Leaf(s)).collect();
                    Derivation::Node(symbol, rule, children)
                })
                .collect(),
            Derivation::Node(symbol, rule, ref children) => {
                if children.is_empty() {
                    return Vec::new();
                }
                children
                    .iter()
                    .map(|child| {
                        let mut options = self.expand_tree(child);
                        options.push(child.clone());
                        options.into_iter()
                    })
                    .multi_cartesian_product()
                    .map(|children| Derivation::Node(symbol, rule, children))
                    .filter(|option| option != tree)
                    .collect()
            }
        }
    }
}
