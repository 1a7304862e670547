extern crate fnv;
extern crate integeriser;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate nom;
extern crate rand;
extern crate serde;
extern crate thiserror;

pub mod derivation;
pub mod exhaust;
pub mod grammars;
pub mod lexicon;
pub mod realization;
pub mod util;

#[cfg(test)]
mod tests;
