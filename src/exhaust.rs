use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::derivation::binding::{resolve, BindingMap};
use crate::derivation::labelling::{label, Counter};
use crate::derivation::{Derivation, ResolutionError};
use crate::grammars::mcfg::{Classes, Grammar, SymbolId};
use crate::realization::choices::{get_choices, sample_choices};
use crate::realization::{realize_structure, Realized, RealizedSpan, SpanRealization};

/// Derivations by depth, each with its binding map and realizations.
pub type Exhaustion = BTreeMap<usize, BTreeMap<Derivation, (BindingMap, Vec<Realized>)>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustOptions {
    pub min_depth: usize,
    pub max_depth: usize,
    /// draw at most this many realizations per derivation instead of
    /// enumerating all of them
    pub sample: Option<usize>,
}

impl Default for ExhaustOptions {
    fn default() -> Self {
        ExhaustOptions {
            min_depth: 0,
            max_depth: 1,
            sample: None,
        }
    }
}

/// Realizes every realizable derivation of `goal` with a depth in
/// `[min_depth, max_depth)`.
///
/// The depth of a derivation counts the rule levels below the rule applied
/// to `goal`, i.e. it is one less than the height of the tree. Each tree is
/// labelled with fresh counters and realized by the concatenation of all
/// of its root's components.
pub fn exhaust<R>(
    grammar: &Grammar,
    goal: SymbolId,
    classes: &Classes,
    options: &ExhaustOptions,
    rng: &mut R,
) -> Result<Exhaustion, ResolutionError>
where
    R: Rng + ?Sized,
{
    let mut exhaustion: Exhaustion = (options.min_depth..options.max_depth)
        .map(|depth| (depth, BTreeMap::new()))
        .collect();

    for tree in grammar.generate(goal, options.max_depth, true) {
        let depth = match tree.height() {
            0 => continue,
            height => height - 1,
        };
        if depth < options.min_depth {
            continue;
        }

        let labelled = label(&tree, &classes.nouns, &classes.verbs, &mut Counter::new(), &mut Counter::new());
        let bindings = resolve(grammar, &labelled, None)?;
        let (_, components) = realize_structure(grammar, &labelled, 0)?;
        let recipe: SpanRealization = components.into_iter().flatten().collect();
        let leaves = labelled.leaves();

        let realizations: Vec<Realized> = match options.sample {
            Some(n) => sample_choices(grammar, &leaves, &recipe, n, &classes.exclude, &mut *rng).collect(),
            None => get_choices(grammar, &leaves, &recipe, &classes.exclude).collect(),
        };
        debug!(
            "depth {}: {} with {} realizations",
            depth,
            tree.display(grammar),
            realizations.len()
        );

        if let Some(trees) = exhaustion.get_mut(&depth) {
            trees.insert(tree, (bindings, realizations));
        }
    }
    Ok(exhaustion)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Surface {
    pub sentence: String,
    pub spans: Vec<RealizedSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub matching: BindingMap,
    pub surfaces: Vec<Surface>,
}

/// Derivations by depth, keyed by their bracketed notation.
pub type Report = BTreeMap<usize, BTreeMap<String, Entry>>;

/// Names the symbols of an `Exhaustion`, for serialisation.
pub fn report(grammar: &Grammar, exhaustion: &Exhaustion) -> Report {
    exhaustion
        .iter()
        .map(|(&depth, trees)| {
            let entries = trees
                .iter()
                .map(|(tree, &(ref matching, ref realizations))| {
                    let surfaces = realizations
                        .iter()
                        .map(|realized| Surface {
                            sentence: realized.sentence(),
                            spans: realized.0.clone(),
                        })
                        .collect();
                    let entry = Entry {
                        matching: matching.clone(),
                        surfaces,
                    };
                    (tree.display(grammar).to_string(), entry)
                })
                .collect();
            (depth, entries)
        })
        .collect()
}
