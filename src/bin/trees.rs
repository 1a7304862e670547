use clap::{App, Arg, ArgMatches, SubCommand};

use crate::{fail, read_grammar};

pub fn get_sub_command() -> App<'static, 'static> {
    SubCommand::with_name("trees")
        .about("lists the derivations of the initial symbol up to a given height")
        .arg(
            Arg::with_name("grammar")
                .help("grammar file to use")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("depth")
                .help("maximum height of the derivations")
                .short("d")
                .long("depth")
                .value_name("depth")
                .default_value("2"),
        )
        .arg(
            Arg::with_name("all")
                .help("also list derivations with leaves that have no constants")
                .long("all"),
        )
}

pub fn handle_sub_matches(trees_matches: &ArgMatches) {
    let grammar_file_name = trees_matches.value_of("grammar").unwrap_or_default();
    let depth: usize = trees_matches
        .value_of("depth")
        .unwrap_or_default()
        .parse()
        .unwrap_or_else(|e| fail(format!("invalid depth: {}", e)));
    let definition = read_grammar(grammar_file_name);

    let filter_empty = !trees_matches.is_present("all");
    for tree in definition.grammar.generate(definition.initial, depth, filter_empty) {
        println!("{}", tree.display(&definition.grammar));
    }
}
