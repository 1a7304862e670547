extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate mcfgen;
extern crate rand;
extern crate serde_json;

use clap::App;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::process;

use mcfgen::grammars::mcfg::GrammarDefinition;

mod generate;
mod trees;

fn main() {
    env_logger::init();

    let matches = App::new("mcfgen")
        .version("0.1")
        .about("Bounded-depth sentence generation with multiple context-free grammars")
        .subcommand(generate::get_sub_command())
        .subcommand(trees::get_sub_command())
        .get_matches();

    match matches.subcommand() {
        ("generate", Some(generate_matches)) => generate::handle_sub_matches(generate_matches),
        ("trees", Some(trees_matches)) => trees::handle_sub_matches(trees_matches),
        _ => (),
    }
}

/// Prints `error` and exits.
pub fn fail<E: Display>(error: E) -> ! {
    eprintln!("error: {}", error);
    process::exit(1)
}

pub fn read_grammar(file_name: &str) -> GrammarDefinition {
    let mut grammar_string = String::new();
    if let Err(e) = File::open(file_name).and_then(|mut f| f.read_to_string(&mut grammar_string)) {
        fail(format!("{}: {}", file_name, e));
    }
    let definition: GrammarDefinition = grammar_string
        .parse()
        .unwrap_or_else(|e| fail(format!("{}: {}", file_name, e)));
    info!(
        "read {} rules from {}",
        definition.grammar.rules().count(),
        file_name
    );
    definition
}
