use serde::Serialize;

use crate::derivation::labelling::LabelledTree;
use crate::derivation::ResolutionError;
use crate::grammars::mcfg::{Constant, Grammar, Var};

pub mod choices;

/// One piece of output: component `component` of the constant chosen for
/// leaf slot `slot`, together with the noun and verb ids of the tree nodes
/// above (and at) that leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub nouns: Vec<usize>,
    pub verbs: Vec<usize>,
    pub slot: usize,
    pub component: usize,
}

/// How one output component is assembled from leaf slots.
pub type SpanRealization = Vec<Span>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RealizedSpan {
    pub nouns: Vec<usize>,
    pub verbs: Vec<usize>,
    pub surface: String,
}

/// A `SpanRealization` with concrete strings filled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Realized(pub Vec<RealizedSpan>);

impl Realized {
    pub fn surfaces(&self) -> Vec<&str> {
        self.0.iter().map(|span| span.surface.as_str()).collect()
    }

    /// The space-joined surface strings.
    pub fn sentence(&self) -> String {
        self.surfaces()
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Computes, bottom-up, how each component of `tree` is assembled from its
/// leaves. Leaves claim consecutive slots starting at `offset`; the first
/// unclaimed slot is returned along with one recipe per component.
pub fn realize_structure(
    grammar: &Grammar,
    tree: &LabelledTree,
    offset: usize,
) -> Result<(usize, Vec<SpanRealization>), ResolutionError> {
    realize_below(grammar, tree, offset, &[], &[])
}

fn realize_below(
    grammar: &Grammar,
    tree: &LabelledTree,
    offset: usize,
    nouns: &[usize],
    verbs: &[usize],
) -> Result<(usize, Vec<SpanRealization>), ResolutionError> {
    let label = tree.label();
    let nouns: Vec<usize> = nouns.iter().cloned().chain(label.noun).collect();
    let verbs: Vec<usize> = verbs.iter().cloned().chain(label.verb).collect();

    match *tree {
        LabelledTree::Leaf(_) => {
            let components = (0..grammar.arity(label.symbol))
                .map(|component| {
                    vec![Span {
                        nouns: nouns.clone(),
                        verbs: verbs.clone(),
                        slot: offset,
                        component,
                    }]
                })
                .collect();
            Ok((offset + 1, components))
        }
        LabelledTree::Node(_, rule, ref children) => {
            let surface = grammar
                .surface(rule)
                .ok_or_else(|| ResolutionError::MissingSurface(grammar.rule_string(rule)))?;

            let mut offset = offset;
            let mut branches = Vec::with_capacity(children.len());
            for child in children {
                let (next, branch) = realize_below(grammar, child, offset, &nouns, &verbs)?;
                offset = next;
                branches.push(branch);
            }

            let components = surface
                .composition
                .iter()
                .map(|recipe| {
                    recipe
                        .iter()
                        .flat_map(|&Var(i, j)| branches[i][j].iter().cloned())
                        .collect()
                })
                .collect();
            Ok((offset, components))
        }
    }
}

/// Fills the strings of the chosen constants (one per leaf slot) into `recipe`.
pub fn realize_content(leaves: &[&Constant], recipe: &SpanRealization) -> Realized {
    Realized(
        recipe
            .iter()
            .map(|span| RealizedSpan {
                nouns: span.nouns.clone(),
                verbs: span.verbs.clone(),
                surface: leaves[span.slot][span.component].clone(),
            })
            .collect(),
    )
}
