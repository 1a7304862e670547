use std::collections::BTreeMap;

use crate::derivation::labelling::LabelledTree;
use crate::derivation::ResolutionError;
use crate::grammars::mcfg::{Grammar, Inherit};

/// Maps each verb id to the noun id filling its controlled role.
pub type BindingMap = BTreeMap<usize, Option<usize>>;

/// Resolves the binding of every verb in `tree`, given the value `tree`
/// inherits from its context.
///
/// `matches` decides what a verb reads. `inherit` only decides what is
/// threaded into a successor; `UseResolvedHere` threads the value of the
/// rule's first match, or the inherited value if the rule has none.
pub fn resolve(
    grammar: &Grammar,
    tree: &LabelledTree,
    inherited: Option<usize>,
) -> Result<BindingMap, ResolutionError> {
    let mut bindings = BindingMap::new();
    resolve_into(grammar, tree, inherited, &mut bindings)?;
    Ok(bindings)
}

fn resolve_into(
    grammar: &Grammar,
    tree: &LabelledTree,
    inherited: Option<usize>,
    bindings: &mut BindingMap,
) -> Result<(), ResolutionError> {
    let (rule, children) = match *tree {
        LabelledTree::Leaf(_) => return Ok(()),
        LabelledTree::Node(_, rule, ref children) => (rule, children),
    };
    let annotation = grammar
        .binding(rule)
        .ok_or_else(|| ResolutionError::MissingBinding(grammar.rule_string(rule)))?;
    let top = |i: usize| children[i].label().noun;

    let mut introduced = None;
    for (&k, &v) in &annotation.matches {
        let verb = children[k].label().verb.ok_or_else(|| ResolutionError::NotAVerb {
            rule: grammar.rule_string(rule),
            successor: k,
        })?;
        let value = match v {
            Some(v) => top(v),
            None => inherited,
        };
        bindings.insert(verb, value);
        introduced.get_or_insert(value);
    }
    let introduced = introduced.unwrap_or(inherited);

    for (child, inherit) in children.iter().zip(&annotation.inherit) {
        let context = match *inherit {
            Inherit::KeepInherited => inherited,
            Inherit::UseResolvedHere => introduced,
            Inherit::UseSibling(j) => top(j),
        };
        resolve_into(grammar, child, context, bindings)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::labelling::{label, Counter};
    use crate::derivation::Derivation;
    use crate::grammars::mcfg::{BindingSpec, Classes, RuleId, SurfaceSpec, SymbolId};
    use fnv::FnvHashSet;

    struct Control {
        grammar: Grammar,
        classes: Classes,
        ctrl: RuleId,
        su_embed: RuleId,
        obj_embed: RuleId,
        base: RuleId,
        np_s: SymbolId,
        np_o: SymbolId,
        np_o2: SymbolId,
        te: SymbolId,
        tv: SymbolId,
        inf_su: SymbolId,
        inf_obj: SymbolId,
        itv: SymbolId,
        vc: SymbolId,
        top: SymbolId,
    }

    fn matches(pairs: &[(usize, Option<usize>)]) -> BTreeMap<usize, Option<usize>> {
        pairs.iter().cloned().collect()
    }

    fn control() -> Control {
        use crate::grammars::mcfg::Inherit::*;

        let mut g = Grammar::new();
        let top = g.symbol("CTRL", 1).unwrap();
        let vc = g.symbol("VC", 2).unwrap();
        let np_s = g.symbol("NP_s", 1).unwrap();
        let np_o = g.symbol("NP_o", 1).unwrap();
        let np_o2 = g.symbol("NP_o2", 1).unwrap();
        let te = g.symbol("TE", 1).unwrap();
        let tv = g.symbol("TV_su_ctrl", 1).unwrap();
        let inf_su = g.symbol("INF_su_ctrl", 1).unwrap();
        let inf_obj = g.symbol("INF_obj_ctrl", 1).unwrap();
        let itv = g.symbol("ITV_inf", 1).unwrap();

        let ctrl = g
            .add_annotated_rule(
                top,
                vec![np_s, tv, np_o, vc],
                BindingSpec {
                    matches: matches(&[(1, Some(0))]),
                    inherit: vec![KeepInherited, KeepInherited, KeepInherited, UseSibling(0)],
                },
                SurfaceSpec::from(vec![vec![(0, 0), (1, 0), (2, 0), (3, 0), (3, 1)]]),
            )
            .unwrap();
        let su_embed = g
            .add_annotated_rule(
                vc,
                vec![np_o2, te, inf_su, vc],
                BindingSpec {
                    matches: matches(&[(2, None)]),
                    inherit: vec![KeepInherited, KeepInherited, KeepInherited, UseResolvedHere],
                },
                SurfaceSpec::from(vec![vec![(0, 0), (1, 0)], vec![(2, 0), (3, 0), (3, 1)]]),
            )
            .unwrap();
        let obj_embed = g
            .add_annotated_rule(
                vc,
                vec![np_o2, te, inf_obj, vc],
                BindingSpec {
                    matches: matches(&[(2, None)]),
                    inherit: vec![KeepInherited, KeepInherited, KeepInherited, UseSibling(0)],
                },
                SurfaceSpec::from(vec![vec![(0, 0), (1, 0)], vec![(2, 0), (3, 0), (3, 1)]]),
            )
            .unwrap();
        let base = g
            .add_annotated_rule(
                vc,
                vec![te, itv],
                BindingSpec {
                    matches: matches(&[(1, None)]),
                    inherit: vec![KeepInherited, KeepInherited],
                },
                SurfaceSpec::from(vec![vec![(0, 0)], vec![(1, 0)]]),
            )
            .unwrap();

        let classes = Classes {
            nouns: vec![np_s, np_o, np_o2].into_iter().collect(),
            verbs: vec![tv, inf_su, inf_obj, itv].into_iter().collect(),
            exclude: FnvHashSet::default(),
        };

        Control {
            grammar: g,
            classes,
            ctrl,
            su_embed,
            obj_embed,
            base,
            np_s,
            np_o,
            np_o2,
            te,
            tv,
            inf_su,
            inf_obj,
            itv,
            vc,
            top,
        }
    }

    /// `CTRL(NP_s, TV, NP_o, VC(…))` with the given embedding rules, outermost first.
    fn chain(c: &Control, embeddings: &[RuleId]) -> Derivation {
        let mut vc = Derivation::Node(
            c.vc,
            c.base,
            vec![Derivation::Leaf(c.te), Derivation::Leaf(c.itv)],
        );
        for &rule in embeddings.iter().rev() {
            let inf = if rule == c.su_embed { c.inf_su } else { c.inf_obj };
            vc = Derivation::Node(
                c.vc,
                rule,
                vec![
                    Derivation::Leaf(c.np_o2),
                    Derivation::Leaf(c.te),
                    Derivation::Leaf(inf),
                    vc,
                ],
            );
        }
        Derivation::Node(
            c.top,
            c.ctrl,
            vec![
                Derivation::Leaf(c.np_s),
                Derivation::Leaf(c.tv),
                Derivation::Leaf(c.np_o),
                vc,
            ],
        )
    }

    fn resolve_chain(c: &Control, embeddings: &[RuleId]) -> BindingMap {
        let tree = label(
            &chain(c, embeddings),
            &c.classes.nouns,
            &c.classes.verbs,
            &mut Counter::new(),
            &mut Counter::new(),
        );
        resolve(&c.grammar, &tree, None).unwrap()
    }

    #[test]
    fn test_subject_control_chain() {
        let c = control();
        // NP_s = 0, NP_o = 1, NP_o2 = 2 and 3
        let bindings = resolve_chain(&c, &[c.su_embed, c.su_embed]);
        let expected: BindingMap = vec![(0, Some(0)), (1, Some(0)), (2, Some(0)), (3, Some(0))]
            .into_iter()
            .collect();
        assert_eq!(expected, bindings);
    }

    #[test]
    fn test_object_control_chain() {
        let c = control();
        let bindings = resolve_chain(&c, &[c.obj_embed, c.obj_embed]);
        let expected: BindingMap = vec![(0, Some(0)), (1, Some(0)), (2, Some(2)), (3, Some(3))]
            .into_iter()
            .collect();
        assert_eq!(expected, bindings);
    }

    #[test]
    fn test_mixed_chain() {
        let c = control();
        let bindings = resolve_chain(&c, &[c.obj_embed, c.su_embed]);
        let expected: BindingMap = vec![(0, Some(0)), (1, Some(0)), (2, Some(2)), (3, Some(2))]
            .into_iter()
            .collect();
        assert_eq!(expected, bindings);
    }

    #[test]
    fn test_inherited_value_reaches_the_top() {
        let c = control();
        let vc = Derivation::Node(
            c.vc,
            c.base,
            vec![Derivation::Leaf(c.te), Derivation::Leaf(c.itv)],
        );
        let tree = label(&vc, &c.classes.nouns, &c.classes.verbs, &mut Counter::new(), &mut Counter::new());
        let expected: BindingMap = vec![(0, Some(7))].into_iter().collect();
        assert_eq!(expected, resolve(&c.grammar, &tree, Some(7)).unwrap());

        let leaf = label(&Derivation::Leaf(c.np_s), &c.classes.nouns, &c.classes.verbs, &mut Counter::new(), &mut Counter::new());
        assert!(resolve(&c.grammar, &leaf, Some(7)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_annotation() {
        let mut c = control();
        let bare = c.grammar.add_rule(c.vc, vec![c.te, c.np_o]).unwrap();
        let tree = Derivation::Node(
            c.vc,
            bare,
            vec![Derivation::Leaf(c.te), Derivation::Leaf(c.np_o)],
        );
        let tree = label(&tree, &c.classes.nouns, &c.classes.verbs, &mut Counter::new(), &mut Counter::new());
        match resolve(&c.grammar, &tree, None) {
            Err(ResolutionError::MissingBinding(_)) => (),
            other => panic!("expected a missing binding, got {:?}", other),
        }
    }

    #[test]
    fn test_match_on_non_verb() {
        let c = control();
        let tree = chain(&c, &[]);
        let no_verbs = FnvHashSet::default();
        let tree = label(&tree, &c.classes.nouns, &no_verbs, &mut Counter::new(), &mut Counter::new());
        assert_eq!(
            Err(ResolutionError::NotAVerb {
                rule: c.grammar.rule_string(c.ctrl),
                successor: 1,
            }),
            resolve(&c.grammar, &tree, None)
        );
    }
}
