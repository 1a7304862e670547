use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::derivation::binding::{resolve, BindingMap};
use crate::derivation::labelling::{label, Counter};
use crate::exhaust::{exhaust, ExhaustOptions};
use crate::grammars::mcfg::GrammarDefinition;
use crate::realization::realize_structure;

fn control() -> GrammarDefinition {
    include_str!("../../demos/control.mcfg").parse().unwrap()
}

#[test]
fn test_control_depths() {
    let GrammarDefinition { grammar, initial, classes } = control();
    let options = ExhaustOptions { min_depth: 0, max_depth: 2, sample: Some(5) };
    let exhaustion = exhaust(&grammar, initial, &classes, &options, &mut StdRng::seed_from_u64(0)).unwrap();

    // the noun phrases below CTRL have no constants of their own
    assert!(exhaustion[&0].is_empty());
    // four main clauses, each with one of two simple verb clusters
    assert_eq!(8, exhaustion[&1].len());
}

#[test]
fn test_control_sentence() {
    let GrammarDefinition { grammar, initial, classes } = control();
    let options = ExhaustOptions { min_depth: 1, max_depth: 2, sample: None };
    let exhaustion = exhaust(&grammar, initial, &classes, &options, &mut StdRng::seed_from_u64(0)).unwrap();

    let (tree, (bindings, realizations)) = exhaustion[&1]
        .iter()
        .find(|(tree, _)| {
            tree.display(&grammar).to_string()
                == "CTRL(NP_s(NP), TV_su_ctrl, NP_o(NP), VC(TE, ITV_inf))"
        })
        .unwrap();
    assert_eq!(2, tree.height());

    // NP_s = 0, NP = 1, NP_o = 2, NP = 3; the subject controls both verbs
    let expected: BindingMap = vec![(0, Some(0)), (1, Some(0))].into_iter().collect();
    assert_eq!(&expected, bindings);

    let sentences: Vec<String> = realizations.iter().map(|r| r.sentence()).collect();
    // 4 * 3 noun pairs, 2 finite verbs, 2 infinitives
    assert_eq!(48, sentences.len());
    assert!(sentences.contains(&"de man belooft de vrouw te vertrekken".to_string()));
    assert!(!sentences.contains(&"de man belooft de man te vertrekken".to_string()));
}

#[test]
fn test_subject_control_chains() {
    let GrammarDefinition { grammar, initial, classes } = control();

    let mut chains = 0;
    for tree in grammar.generate(initial, 4, true) {
        let name = tree.display(&grammar).to_string();
        if name.contains("obj") || name.contains("AUX") {
            continue;
        }
        let labelled = label(&tree, &classes.nouns, &classes.verbs, &mut Counter::new(), &mut Counter::new());
        let bindings = resolve(&grammar, &labelled, None).unwrap();
        assert!(bindings.values().all(|&noun| noun == Some(0)), "{}: {:?}", name, bindings);
        if bindings.len() >= 3 {
            chains += 1;
        }
    }
    assert!(chains > 0);
}

#[test]
fn test_object_control_chain() {
    let GrammarDefinition { grammar, initial, classes } = control();

    let name = "CTRL(NP_s(NP), TV_obj_ctrl, NP_o(NP), \
                VC(NP_o2(NP), TE, INF_obj_ctrl, VC(TE, ITV_inf)))";
    let tree = grammar
        .generate(initial, 4, true)
        .into_iter()
        .find(|tree| tree.display(&grammar).to_string() == name)
        .unwrap();
    let labelled = label(&tree, &classes.nouns, &classes.verbs, &mut Counter::new(), &mut Counter::new());

    // NP_s = 0, NP_o = 2, NP_o2 = 4
    let expected: BindingMap = vec![(0, Some(0)), (1, Some(2)), (2, Some(4))].into_iter().collect();
    assert_eq!(expected, resolve(&grammar, &labelled, None).unwrap());
}

#[test]
fn test_pipeline_idempotence() {
    let GrammarDefinition { grammar, initial, classes } = control();

    for tree in grammar.generate(initial, 3, true) {
        let run = || {
            let labelled = label(
                &tree,
                &classes.nouns,
                &classes.verbs,
                &mut Counter::starting_at(3),
                &mut Counter::starting_at(5),
            );
            let bindings = resolve(&grammar, &labelled, None).unwrap();
            let (next, recipes) = realize_structure(&grammar, &labelled, 0).unwrap();
            (bindings, next, recipes)
        };
        let (bindings, next, recipes) = run();
        assert_eq!((bindings, next, recipes.clone()), run());
        assert_eq!(tree.leaves().len(), next);
        assert_eq!(1, recipes.len());
    }
}

#[test]
fn test_control_round_trip() {
    let definition = control();
    let reparsed: GrammarDefinition = definition.to_string().parse().unwrap();

    assert_eq!(
        definition.grammar.rules().count(),
        reparsed.grammar.rules().count()
    );
    assert_eq!(definition.classes.verbs.len(), reparsed.classes.verbs.len());
    for (id, rule) in definition.grammar.rules() {
        let lhs = reparsed.grammar.find_symbol(definition.grammar.name(rule.lhs)).unwrap();
        let rhs: Vec<_> = rule
            .rhs
            .iter()
            .map(|&s| reparsed.grammar.find_symbol(definition.grammar.name(s)).unwrap())
            .collect();
        let other = reparsed.grammar.find_rule(lhs, &rhs).unwrap();
        assert_eq!(definition.grammar.binding(id), reparsed.grammar.binding(other));
        assert_eq!(definition.grammar.surface(id), reparsed.grammar.surface(other));
    }
}
