use fnv::FnvHashSet;
use itertools::{Either, Itertools};
use rand::seq::SliceRandom;
use rand::Rng;
use std::iter;

use crate::grammars::mcfg::{Constant, Grammar, SymbolId};
use crate::realization::{realize_content, Realized, SpanRealization};

/// Whether `realized` repeats no string where it matters: adjacent spans
/// must differ, and spans of leaves outside `exclude` must be pairwise
/// distinct.
pub fn has_no_duplicates(
    realized: &Realized,
    leaves: &[SymbolId],
    recipe: &SpanRealization,
    exclude: &FnvHashSet<SymbolId>,
) -> bool {
    let surfaces = realized.surfaces();
    if surfaces.windows(2).any(|pair| pair[0] == pair[1]) {
        return false;
    }

    let mut seen = FnvHashSet::default();
    recipe
        .iter()
        .zip(surfaces)
        .filter(|(span, _)| !exclude.contains(&leaves[span.slot]))
        .all(|(_, surface)| seen.insert(surface))
}

/// Every choice of constants for `leaves` (one constant per leaf slot),
/// applied to `recipe`, minus those with duplicate strings.
pub fn get_choices<'a>(
    grammar: &'a Grammar,
    leaves: &'a [SymbolId],
    recipe: &'a SpanRealization,
    exclude: &'a FnvHashSet<SymbolId>,
) -> impl Iterator<Item = Realized> + 'a {
    // the product of no factors has one (empty) element
    let choices = if leaves.is_empty() {
        Either::Left(iter::once(Vec::new()))
    } else {
        Either::Right(
            leaves
                .iter()
                .map(move |&leaf| grammar.constants(leaf).iter())
                .multi_cartesian_product(),
        )
    };
    choices
        .map(move |choice: Vec<&Constant>| realize_content(&choice, recipe))
        .filter(move |realized| has_no_duplicates(realized, leaves, recipe, exclude))
}

/// Draws random choices of constants for `leaves` until `n` distinct
/// realizations without duplicate strings have been found, or `n² + 1`
/// draws have been made.
pub fn sample_choices<'a, R>(
    grammar: &'a Grammar,
    leaves: &'a [SymbolId],
    recipe: &'a SpanRealization,
    n: usize,
    exclude: &'a FnvHashSet<SymbolId>,
    rng: &'a mut R,
) -> SampleChoices<'a, R>
where
    R: Rng + ?Sized,
{
    SampleChoices {
        grammar,
        leaves,
        recipe,
        exclude,
        rng,
        n,
        limit: n.saturating_mul(n).saturating_add(1),
        attempts: 0,
        returned: FnvHashSet::default(),
    }
}

pub struct SampleChoices<'a, R: ?Sized> {
    grammar: &'a Grammar,
    leaves: &'a [SymbolId],
    recipe: &'a SpanRealization,
    exclude: &'a FnvHashSet<SymbolId>,
    rng: &'a mut R,
    n: usize,
    limit: usize,
    attempts: usize,
    returned: FnvHashSet<Vec<String>>,
}

impl<'a, R: Rng + ?Sized> SampleChoices<'a, R> {
    /// The number of draws made so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl<'a, R: Rng + ?Sized> Iterator for SampleChoices<'a, R> {
    type Item = Realized;

    fn next(&mut self) -> Option<Realized> {
        let grammar = self.grammar;
        let leaves = self.leaves;

        while self.attempts < self.limit && self.returned.len() < self.n {
            self.attempts += 1;
            let rng = &mut *self.rng;
            let choice: Vec<&Constant> = leaves
                .iter()
                .map(|&leaf| grammar.constants(leaf).choose(rng))
                .collect::<Option<_>>()?;

            let realized = realize_content(&choice, self.recipe);
            if !has_no_duplicates(&realized, leaves, self.recipe, self.exclude) {
                continue;
            }
            let key = realized.surfaces().into_iter().map(String::from).collect();
            if self.returned.insert(key) {
                return Some(realized);
            }
        }
        None
    }
}
