use fnv::FnvHashMap;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, map, opt, value};
use nom::sequence::{pair, preceded, separated_pair, tuple};
use nom::IResult;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::grammars::mcfg::{
    write_token, BindingSpec, Classes, Constant, Grammar, GrammarError, Inherit, SurfaceSpec,
    SymbolId, Var,
};
use crate::util::parsing::*;

/// A grammar read from its textual definition, together with its initial
/// symbol and symbol classes.
#[derive(Debug)]
pub struct GrammarDefinition {
    pub grammar: Grammar,
    pub initial: SymbolId,
    pub classes: Classes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Initial,
    Nouns,
    Verbs,
    Exclude,
}

#[derive(Debug, Clone, PartialEq)]
struct RuleLine {
    head: String,
    composition: Vec<Vec<Var>>,
    successors: Vec<String>,
    binding: Option<BindingSpec>,
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Header(Header, Vec<String>),
    Constants(String, Vec<Constant>),
    Rule(RuleLine),
}

/// Collects what each line says about the arity of a symbol: an exact
/// arity (lhs of a rule, constants) or a lower bound (referenced
/// components of a successor).
#[derive(Default)]
struct Arities {
    order: Vec<String>,
    known: FnvHashMap<String, (Option<usize>, usize)>,
}

impl Arities {
    fn mention(&mut self, name: &str) -> &mut (Option<usize>, usize) {
        if !self.known.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.known.entry(name.to_string()).or_insert((None, 1))
    }

    fn fix(&mut self, name: &str, arity: usize) -> Result<(), GrammarError> {
        let entry = self.mention(name);
        match entry.0 {
            Some(declared) if declared != arity => Err(GrammarError::ConflictingArity {
                name: name.to_string(),
                declared,
                requested: arity,
            }),
            _ => {
                entry.0 = Some(arity);
                Ok(())
            }
        }
    }

    fn at_least(&mut self, name: &str, arity: usize) {
        let entry = self.mention(name);
        entry.1 = entry.1.max(arity);
    }

    /// Symbol names in order of their first mention, with their arities.
    fn resolve(self) -> Result<Vec<(String, usize)>, GrammarError> {
        let Arities { order, known } = self;
        order
            .into_iter()
            .map(|name| {
                let (exact, lower) = known[&name];
                match exact {
                    Some(0) => Err(GrammarError::ZeroArity(name)),
                    Some(declared) if declared < lower => Err(GrammarError::ConflictingArity {
                        name,
                        declared,
                        requested: lower,
                    }),
                    Some(declared) => Ok((name, declared)),
                    None => Ok((name, lower)),
                }
            })
            .collect()
    }
}

impl FromStr for GrammarDefinition {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = Vec::new();
        for (number, raw) in s.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            match all_consuming(parse_line)(line) {
                Ok((_, parsed)) => lines.push((number + 1, parsed)),
                Err(_) => {
                    return Err(GrammarError::Parse {
                        line: number + 1,
                        message: format!("could not parse `{}`", line),
                    })
                }
            }
        }

        let mut arities = Arities::default();
        let mut initial = None;
        for &(number, ref line) in &lines {
            match *line {
                Line::Header(Header::Initial, ref names) => {
                    if initial.is_some() || names.len() != 1 {
                        return Err(GrammarError::Parse {
                            line: number,
                            message: "exactly one initial symbol must be declared".to_string(),
                        });
                    }
                    arities.mention(&names[0]);
                    initial = Some(names[0].clone());
                }
                Line::Header(_, ref names) => {
                    for name in names {
                        arities.mention(name);
                    }
                }
                Line::Constants(ref name, ref constants) => {
                    arities.mention(name);
                    for constant in constants {
                        arities.fix(name, constant.len())?;
                    }
                }
                Line::Rule(ref rule) => {
                    arities.fix(&rule.head, rule.composition.len())?;
                    for name in &rule.successors {
                        arities.mention(name);
                    }
                    for &Var(i, j) in rule.composition.iter().flatten() {
                        if let Some(name) = rule.successors.get(i) {
                            arities.at_least(name, j + 1);
                        }
                    }
                }
            }
        }
        let initial = initial.ok_or(GrammarError::MissingInitial)?;

        let mut grammar = Grammar::new();
        for (name, arity) in arities.resolve()? {
            grammar.symbol(&name, arity)?;
        }
        let lookup = |grammar: &Grammar, name: &str| {
            grammar
                .find_symbol(name)
                .ok_or_else(|| GrammarError::UnknownSymbol(name.to_string()))
        };

        let mut classes = Classes::default();
        for (number, line) in lines {
            match line {
                Line::Header(Header::Initial, _) => (),
                Line::Header(header, names) => {
                    let class = match header {
                        Header::Nouns => &mut classes.nouns,
                        Header::Verbs => &mut classes.verbs,
                        _ => &mut classes.exclude,
                    };
                    for name in names {
                        class.insert(lookup(&grammar, &name)?);
                    }
                }
                Line::Constants(name, constants) => {
                    let symbol = lookup(&grammar, &name)?;
                    let mut all = grammar.constants(symbol).to_vec();
                    all.extend(constants);
                    grammar.set_constants(symbol, all)?;
                }
                Line::Rule(rule) => {
                    let lhs = lookup(&grammar, &rule.head)?;
                    let rhs = rule
                        .successors
                        .iter()
                        .map(|name| lookup(&grammar, name))
                        .collect::<Result<Vec<_>, _>>()?;
                    let successors = rhs.len();
                    let binding = match rule.binding {
                        Some(binding) => binding,
                        None => BindingSpec::keep_all(successors),
                    };
                    let id = grammar.add_rule(lhs, rhs)?;
                    grammar.annotate_surface(id, SurfaceSpec { composition: rule.composition })?;
                    grammar.annotate_binding(id, binding)?;
                    debug!("line {}: {}", number, grammar.rule_string(id));
                }
            }
        }

        let initial = lookup(&grammar, &initial)?;
        Ok(GrammarDefinition { grammar, initial, classes })
    }
}

impl Display for GrammarDefinition {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "initial: [")?;
        write_token(f, self.grammar.name(self.initial))?;
        writeln!(f, "]")?;

        let headers = [
            ("nouns", &self.classes.nouns),
            ("verbs", &self.classes.verbs),
            ("exclude", &self.classes.exclude),
        ];
        for &(header, class) in &headers {
            if class.is_empty() {
                continue;
            }
            let mut names: Vec<&str> = class.iter().map(|&s| self.grammar.name(s)).collect();
            names.sort();
            write!(f, "{}: [", header)?;
            for (i, name) in names.into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_token(f, name)?;
            }
            writeln!(f, "]")?;
        }

        writeln!(f)?;
        write!(f, "{}", self.grammar)
    }
}

fn parse_line(input: &str) -> IResult<&str, Line> {
    alt((
        map(parse_header, |(header, names)| Line::Header(header, names)),
        map(parse_rule, Line::Rule),
        map(parse_constants, |(name, constants)| Line::Constants(name, constants)),
    ))(input)
}

fn parse_header(input: &str) -> IResult<&str, (Header, Vec<String>)> {
    separated_pair(
        alt((
            value(Header::Initial, tag("initial")),
            value(Header::Nouns, tag("nouns")),
            value(Header::Verbs, tag("verbs")),
            value(Header::Exclude, tag("exclude")),
        )),
        tuple((space0, char(':'), space0)),
        |i| parse_vec(i, parse_token, '[', ']', ','),
    )(input)
}

fn parse_constant(input: &str) -> IResult<&str, Constant> {
    alt((
        |i| parse_vec(i, parse_token, '(', ')', ','),
        map(parse_token, |token| vec![token]),
    ))(input)
}

fn parse_constants(input: &str) -> IResult<&str, (String, Vec<Constant>)> {
    separated_pair(
        parse_token,
        tuple((space0, char(':'), space0)),
        |i| parse_vec(i, parse_constant, '[', ']', ','),
    )(input)
}

fn parse_arrow(input: &str) -> IResult<&str, &str> {
    alt((tag("→"), tag("->"), tag("=>")))(input)
}

fn parse_var(input: &str) -> IResult<&str, Var> {
    map(
        tuple((tag("Var"), space1, parse_usize, space1, parse_usize)),
        |(_, _, i, _, j)| Var(i, j),
    )(input)
}

fn parse_projection(input: &str) -> IResult<&str, Vec<Var>> {
    parse_vec(input, parse_var, '[', ']', ',')
}

fn parse_composition(input: &str) -> IResult<&str, Vec<Vec<Var>>> {
    parse_vec(input, parse_projection, '[', ']', ',')
}

fn parse_successors(input: &str) -> IResult<&str, Vec<String>> {
    parse_vec(input, parse_token, '(', ')', ',')
}

fn parse_match(input: &str) -> IResult<&str, (usize, Option<usize>)> {
    separated_pair(
        parse_usize,
        tuple((space0, char(':'), space0)),
        alt((map(parse_usize, Some), value(None, char('_')))),
    )(input)
}

fn parse_inherit(input: &str) -> IResult<&str, Inherit> {
    alt((
        value(Inherit::KeepInherited, tag("keep")),
        value(Inherit::UseResolvedHere, tag("here")),
        map(parse_usize, Inherit::UseSibling),
    ))(input)
}

fn parse_binding(input: &str) -> IResult<&str, BindingSpec> {
    map(
        separated_pair(
            |i| parse_vec(i, parse_match, '{', '}', ','),
            space0,
            |i| parse_vec(i, parse_inherit, '[', ']', ','),
        ),
        |(matches, inherit)| BindingSpec {
            matches: matches.into_iter().collect(),
            inherit,
        },
    )(input)
}

fn parse_rule(input: &str) -> IResult<&str, RuleLine> {
    map(
        tuple((
            parse_token,
            space0,
            parse_arrow,
            space0,
            parse_composition,
            space0,
            parse_successors,
            space0,
            opt(preceded(pair(char('#'), space0), parse_binding)),
        )),
        |(head, _, _, _, composition, _, successors, _, binding)| RuleLine {
            head,
            composition,
            successors,
            binding,
        },
    )(input)
}
