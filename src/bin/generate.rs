use clap::{App, Arg, ArgMatches, SubCommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{self, Write};

use mcfgen::exhaust::{exhaust, report, ExhaustOptions};
use mcfgen::lexicon::Assignment;

use crate::{fail, read_grammar};

pub fn get_sub_command() -> App<'static, 'static> {
    SubCommand::with_name("generate")
        .about("realizes all derivations of the initial symbol within a range of depths")
        .arg(
            Arg::with_name("grammar")
                .help("grammar file to use")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::with_name("min-depth")
                .help("smallest depth to realize")
                .long("min-depth")
                .value_name("min-depth")
                .default_value("0"),
        )
        .arg(
            Arg::with_name("max-depth")
                .help("depth bound (exclusive)")
                .long("max-depth")
                .value_name("max-depth")
                .default_value("1"),
        )
        .arg(
            Arg::with_name("sample")
                .help("number of realizations to sample per derivation, instead of all")
                .short("n")
                .long("sample")
                .value_name("sample"),
        )
        .arg(
            Arg::with_name("seed")
                .help("seed for shuffling lexicons and sampling")
                .short("s")
                .long("seed")
                .value_name("seed")
                .default_value("0"),
        )
        .arg(
            Arg::with_name("lexicon")
                .help("SYMBOL=PATH[:COLUMN][@FROM..TO], replaces the constants of SYMBOL")
                .short("l")
                .long("lexicon")
                .value_name("lexicon")
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("output")
                .help("file to write the JSON output to, instead of stdout")
                .short("o")
                .long("output")
                .value_name("output"),
        )
}

fn parse_number(matches: &ArgMatches, name: &str) -> Option<u64> {
    matches.value_of(name).map(|value| {
        value
            .parse()
            .unwrap_or_else(|e| fail(format!("invalid {} `{}`: {}", name, value, e)))
    })
}

pub fn handle_sub_matches(generate_matches: &ArgMatches) {
    let grammar_file_name = generate_matches.value_of("grammar").unwrap_or_default();
    let mut definition = read_grammar(grammar_file_name);
    let seed = parse_number(generate_matches, "seed").unwrap_or(0);

    for assignment in generate_matches.values_of("lexicon").into_iter().flatten() {
        let assignment: Assignment = assignment.parse().unwrap_or_else(|e| fail(e));
        let symbol = definition
            .grammar
            .find_symbol(&assignment.symbol)
            .unwrap_or_else(|| fail(format!("unknown symbol `{}`", assignment.symbol)));
        // a fresh generator per file keeps the columns of one file aligned
        let lexicon = assignment
            .load(&mut StdRng::seed_from_u64(seed))
            .unwrap_or_else(|e| fail(e));
        info!("{} constants for {}", lexicon.len(), assignment.symbol);
        definition
            .grammar
            .set_constants(symbol, lexicon.into_constants())
            .unwrap_or_else(|e| fail(e));
    }

    let options = ExhaustOptions {
        min_depth: parse_number(generate_matches, "min-depth").unwrap_or(0) as usize,
        max_depth: parse_number(generate_matches, "max-depth").unwrap_or(1) as usize,
        sample: parse_number(generate_matches, "sample").map(|n| n as usize),
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let exhaustion = exhaust(
        &definition.grammar,
        definition.initial,
        &definition.classes,
        &options,
        &mut rng,
    )
    .unwrap_or_else(|e| fail(e));
    for (depth, trees) in &exhaustion {
        info!("depth {}: {} derivations", depth, trees.len());
    }

    let report = report(&definition.grammar, &exhaustion);
    let written = match generate_matches.value_of("output") {
        Some(file_name) => File::create(file_name)
            .map_err(|e| e.to_string())
            .and_then(|file| serde_json::to_writer_pretty(file, &report).map_err(|e| e.to_string())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &report)
                .map_err(|e| e.to_string())
                .and_then(|()| writeln!(handle).map_err(|e| e.to_string()))
        }
    };
    if let Err(e) = written {
        fail(e);
    }
}
