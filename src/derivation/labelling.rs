use fnv::FnvHashSet;
use serde::Serialize;

use crate::derivation::Derivation;
use crate::grammars::mcfg::{RuleId, SymbolId};

/// Hands out consecutive ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    next: usize,
}

impl Counter {
    pub fn new() -> Self {
        Counter::starting_at(0)
    }

    pub fn starting_at(next: usize) -> Self {
        Counter { next }
    }

    pub fn next_id(&mut self) -> usize {
        self.next += 1;
        self.next - 1
    }
}

/// A symbol occurrence together with its noun id or verb id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Label {
    pub symbol: SymbolId,
    pub noun: Option<usize>,
    pub verb: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelledTree {
    Leaf(Label),
    Node(Label, RuleId, Vec<LabelledTree>),
}

impl LabelledTree {
    pub fn label(&self) -> &Label {
        match *self {
            LabelledTree::Leaf(ref label) | LabelledTree::Node(ref label, _, _) => label,
        }
    }

    /// The symbols at the leaves, from left to right.
    pub fn leaves(&self) -> Vec<SymbolId> {
        match *self {
            LabelledTree::Leaf(ref label) => vec![label.symbol],
            LabelledTree::Node(_, _, ref children) => {
                children.iter().flat_map(LabelledTree::leaves).collect()
            }
        }
    }
}

/// Numbers the occurrences of noun and verb symbols in `tree` in pre-order.
/// Symbols in both classes count as nouns.
pub fn label(
    tree: &Derivation,
    nouns: &FnvHashSet<SymbolId>,
    verbs: &FnvHashSet<SymbolId>,
    noun_counter: &mut Counter,
    verb_counter: &mut Counter,
) -> LabelledTree {
    let symbol = tree.symbol();
    let top = if nouns.contains(&symbol) {
        Label { symbol, noun: Some(noun_counter.next_id()), verb: None }
    } else if verbs.contains(&symbol) {
        Label { symbol, noun: None, verb: Some(verb_counter.next_id()) }
    } else {
        Label { symbol, noun: None, verb: None }
    };

    match *tree {
        Derivation::Leaf(_) => LabelledTree::Leaf(top),
        Derivation::Node(_, rule, ref children) => LabelledTree::Node(
            top,
            rule,
            children
                .iter()
                .map(|child| label(child, nouns, verbs, noun_counter, verb_counter))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::mcfg::Grammar;

    fn relative_clause() -> (Grammar, Derivation, FnvHashSet<SymbolId>, FnvHashSet<SymbolId>) {
        let mut grammar = Grammar::new();
        let s = grammar.symbol("S", 1).unwrap();
        let np = grammar.symbol("NP", 1).unwrap();
        let die = grammar.symbol("DIE", 1).unwrap();
        let rel = grammar.symbol("REL", 1).unwrap();
        let v = grammar.symbol("V", 1).unwrap();
        let s_rule = grammar.add_rule(s, vec![np, v]).unwrap();
        let np_rule = grammar.add_rule(np, vec![np, die, np, rel]).unwrap();

        let tree = Derivation::Node(
            s,
            s_rule,
            vec![
                Derivation::Node(
                    np,
                    np_rule,
                    vec![
                        Derivation::Leaf(np),
                        Derivation::Leaf(die),
                        Derivation::Leaf(np),
                        Derivation::Leaf(rel),
                    ],
                ),
                Derivation::Leaf(v),
            ],
        );
        let nouns = vec![np].into_iter().collect();
        let verbs = vec![rel, v].into_iter().collect();
        (grammar, tree, nouns, verbs)
    }

    fn ids(tree: &LabelledTree, out: &mut Vec<(Option<usize>, Option<usize>)>) {
        out.push((tree.label().noun, tree.label().verb));
        if let LabelledTree::Node(_, _, ref children) = *tree {
            for child in children {
                ids(child, out);
            }
        }
    }

    #[test]
    fn test_label_pre_order() {
        let (_, tree, nouns, verbs) = relative_clause();
        let labelled = label(&tree, &nouns, &verbs, &mut Counter::new(), &mut Counter::new());

        let mut found = Vec::new();
        ids(&labelled, &mut found);
        assert_eq!(
            vec![
                (None, None),
                (Some(0), None),
                (Some(1), None),
                (None, None),
                (Some(2), None),
                (None, Some(0)),
                (None, Some(1)),
            ],
            found
        );
    }

    #[test]
    fn test_label_offsets() {
        let (_, tree, nouns, verbs) = relative_clause();
        let first = label(&tree, &nouns, &verbs, &mut Counter::starting_at(10), &mut Counter::starting_at(20));
        let second = label(&tree, &nouns, &verbs, &mut Counter::starting_at(10), &mut Counter::starting_at(20));
        assert_eq!(first, second);
        assert_eq!(Some(10), {
            match first {
                LabelledTree::Node(_, _, ref children) => children[0].label().noun,
                LabelledTree::Leaf(_) => None,
            }
        });
    }

    #[test]
    fn test_leaves() {
        let (grammar, tree, nouns, verbs) = relative_clause();
        let labelled = label(&tree, &nouns, &verbs, &mut Counter::new(), &mut Counter::new());
        let names: Vec<&str> = labelled.leaves().into_iter().map(|s| grammar.name(s)).collect();
        assert_eq!(vec!["NP", "DIE", "NP", "REL", "V"], names);
        assert_eq!(tree.leaves(), labelled.leaves());
    }
}
