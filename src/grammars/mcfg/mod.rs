use fnv::{FnvHashMap, FnvHashSet};
use integeriser::{HashIntegeriser, Integeriser};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

mod from_str;

pub use self::from_str::GrammarDefinition;

/// Handle of a symbol, valid for the `Grammar` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SymbolId(pub usize);

/// Handle of a rule, valid for the `Grammar` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuleId(pub usize);

/// A terminal constant: one string per component of its symbol.
pub type Constant = Vec<String>;

/// A structural production `lhs → rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
}

/// `Var(i, j)` represents the `j`th component of the `i`th successor.
/// Indexing starts from `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub usize, pub usize);

/// How the components of a rule's successors are concatenated into the
/// components of its left-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceSpec {
    pub composition: Vec<Vec<Var>>,
}

impl SurfaceSpec {
    /// The single-component composition `[Var 0 0, Var 1 0, …, Var (n-1) 0]`.
    pub fn concatenation(successors: usize) -> Self {
        SurfaceSpec {
            composition: vec![(0..successors).map(|i| Var(i, 0)).collect()],
        }
    }
}

impl From<Vec<Vec<(usize, usize)>>> for SurfaceSpec {
    fn from(recipes: Vec<Vec<(usize, usize)>>) -> Self {
        SurfaceSpec {
            composition: recipes
                .into_iter()
                .map(|recipe| recipe.into_iter().map(|(i, j)| Var(i, j)).collect())
                .collect(),
        }
    }
}

/// The binding context threaded into a successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inherit {
    /// pass on the value the current node inherited
    KeepInherited,
    /// pass on the value introduced by this rule's `matches`
    UseResolvedHere,
    /// pass on the noun id at the root of the given sibling
    UseSibling(usize),
}

/// Coreference annotation of a rule.
///
/// `matches[k] = Some(v)` binds the verb at successor `k` to the noun at
/// successor `v`; `matches[k] = None` binds it to the inherited value.
/// `inherit[i]` decides what successor `i` inherits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSpec {
    pub matches: BTreeMap<usize, Option<usize>>,
    pub inherit: Vec<Inherit>,
}

impl BindingSpec {
    /// No matches, every successor keeps the inherited value.
    pub fn keep_all(successors: usize) -> Self {
        BindingSpec {
            matches: BTreeMap::new(),
            inherit: vec![Inherit::KeepInherited; successors],
        }
    }

    fn is_trivial(&self) -> bool {
        self.matches.is_empty() && self.inherit.iter().all(|i| *i == Inherit::KeepInherited)
    }
}

/// Configuration errors raised while a grammar is put together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("symbol `{0}` must have an arity of at least 1")]
    ZeroArity(String),
    #[error("symbol `{name}` has arity {declared} but is used with arity {requested}")]
    ConflictingArity {
        name: String,
        declared: usize,
        requested: usize,
    },
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("constant {constant:?} of `{symbol}` has {found} components, expected {arity}")]
    WrongConstantArity {
        symbol: String,
        constant: Constant,
        arity: usize,
        found: usize,
    },
    #[error("rule {0} is declared twice")]
    DuplicateRule(String),
    #[error("binding annotation of {rule}: {reason}")]
    InvalidBinding { rule: String, reason: String },
    #[error("surface annotation of {rule}: {reason}")]
    InvalidSurface { rule: String, reason: String },
    #[error("no initial symbol declared")]
    MissingInitial,
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Symbol classes used while labelling and realizing derivations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classes {
    pub nouns: FnvHashSet<SymbolId>,
    pub verbs: FnvHashSet<SymbolId>,
    /// leaves whose strings may repeat within one sentence
    pub exclude: FnvHashSet<SymbolId>,
}

/// A multiple context-free grammar with terminal constants and
/// binding/surface annotations per rule.
///
/// ```
/// use mcfgen::grammars::mcfg::{BindingSpec, Grammar, SurfaceSpec};
///
/// let mut grammar = Grammar::new();
/// let s = grammar.symbol("S", 1).unwrap();
/// let np = grammar.symbol("NP", 1).unwrap();
/// let vp = grammar.symbol("VP", 1).unwrap();
/// grammar.set_words(np, vec!["de man", "de vrouw"]).unwrap();
/// grammar.set_words(vp, vec!["loopt"]).unwrap();
/// grammar.add_annotated_rule(s, vec![np, vp], BindingSpec::keep_all(2), SurfaceSpec::concatenation(2)).unwrap();
///
/// // the bare goal and `S(NP, VP)`; only the latter is realizable
/// assert_eq!(2, grammar.generate(s, 1, false).len());
/// assert_eq!(1, grammar.generate(s, 1, true).len());
/// ```
pub struct Grammar {
    symbols: HashIntegeriser<String>,
    arities: Vec<usize>,
    constants: FnvHashMap<SymbolId, Vec<Constant>>,
    rules: Vec<Rule>,
    signatures: FnvHashMap<Rule, RuleId>,
    applicable: FnvHashMap<SymbolId, Vec<RuleId>>,
    bindings: FnvHashMap<RuleId, BindingSpec>,
    surfaces: FnvHashMap<RuleId, SurfaceSpec>,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        Grammar {
            symbols: HashIntegeriser::new(),
            arities: Vec::new(),
            constants: FnvHashMap::default(),
            rules: Vec::new(),
            signatures: FnvHashMap::default(),
            applicable: FnvHashMap::default(),
            bindings: FnvHashMap::default(),
            surfaces: FnvHashMap::default(),
        }
    }

    /// Declares the symbol `name` with the given arity, or returns the
    /// existing handle if it has been declared with the same arity before.
    pub fn symbol(&mut self, name: &str, arity: usize) -> Result<SymbolId, GrammarError> {
        if arity == 0 {
            return Err(GrammarError::ZeroArity(name.to_string()));
        }
        if let Some(id) = self.find_symbol(name) {
            let declared = self.arity(id);
            return if declared == arity {
                Ok(id)
            } else {
                Err(GrammarError::ConflictingArity {
                    name: name.to_string(),
                    declared,
                    requested: arity,
                })
            };
        }
        let id = self.symbols.integerise(name.to_string());
        debug_assert_eq!(id, self.arities.len());
        self.arities.push(arity);
        Ok(SymbolId(id))
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.find_key(&name.to_string()).map(SymbolId)
    }

    /// Panics if `symbol` was not issued by this grammar.
    pub fn name(&self, symbol: SymbolId) -> &str {
        self.symbols
            .find_value(symbol.0)
            .map(String::as_str)
            .expect("symbol handle from a different grammar")
    }

    /// Panics if `symbol` was not issued by this grammar.
    pub fn arity(&self, symbol: SymbolId) -> usize {
        self.arities[symbol.0]
    }

    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.arities.len()).map(SymbolId)
    }

    /// Replaces the constants of `symbol`. Every constant must have exactly
    /// one string per component.
    pub fn set_constants(&mut self, symbol: SymbolId, constants: Vec<Constant>) -> Result<(), GrammarError> {
        let arity = self.arity(symbol);
        if let Some(constant) = constants.iter().find(|c| c.len() != arity) {
            return Err(GrammarError::WrongConstantArity {
                symbol: self.name(symbol).to_string(),
                constant: constant.clone(),
                arity,
                found: constant.len(),
            });
        }
        self.constants.insert(symbol, constants);
        Ok(())
    }

    /// Sets the constants of a symbol of arity 1.
    pub fn set_words<I, S>(&mut self, symbol: SymbolId, words: I) -> Result<(), GrammarError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let constants = words.into_iter().map(|w| vec![w.into()]).collect();
        self.set_constants(symbol, constants)
    }

    pub fn constants(&self, symbol: SymbolId) -> &[Constant] {
        self.constants
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_rule(&mut self, lhs: SymbolId, rhs: Vec<SymbolId>) -> Result<RuleId, GrammarError> {
        let rule = Rule { lhs, rhs };
        if self.signatures.contains_key(&rule) {
            return Err(GrammarError::DuplicateRule(self.format_rule(&rule)));
        }
        let id = RuleId(self.rules.len());
        self.signatures.insert(rule.clone(), id);
        self.applicable.entry(lhs).or_insert_with(Vec::new).push(id);
        self.rules.push(rule);
        Ok(id)
    }

    /// Adds a rule together with both of its annotations.
    pub fn add_annotated_rule(
        &mut self,
        lhs: SymbolId,
        rhs: Vec<SymbolId>,
        binding: BindingSpec,
        surface: SurfaceSpec,
    ) -> Result<RuleId, GrammarError> {
        let id = self.add_rule(lhs, rhs)?;
        self.annotate_binding(id, binding)?;
        self.annotate_surface(id, surface)?;
        Ok(id)
    }

    pub fn annotate_binding(&mut self, rule: RuleId, binding: BindingSpec) -> Result<(), GrammarError> {
        let successors = self.rule(rule).rhs.len();
        let invalid = |reason: String| GrammarError::InvalidBinding {
            rule: self.rule_string(rule),
            reason,
        };

        if binding.inherit.len() != successors {
            return Err(invalid(format!(
                "{} inheritance flags for {} successors",
                binding.inherit.len(),
                successors
            )));
        }
        for (&k, &v) in &binding.matches {
            if k >= successors {
                return Err(invalid(format!("matched successor {} does not exist", k)));
            }
            if let Some(v) = v {
                if v >= successors {
                    return Err(invalid(format!("matching successor {} does not exist", v)));
                }
            }
        }
        for inherit in &binding.inherit {
            if let Inherit::UseSibling(j) = *inherit {
                if j >= successors {
                    return Err(invalid(format!("inherited sibling {} does not exist", j)));
                }
            }
        }

        self.bindings.insert(rule, binding);
        Ok(())
    }

    pub fn annotate_surface(&mut self, rule: RuleId, surface: SurfaceSpec) -> Result<(), GrammarError> {
        let Rule { lhs, ref rhs } = *self.rule(rule);
        let invalid = |reason: String| GrammarError::InvalidSurface {
            rule: self.rule_string(rule),
            reason,
        };

        if surface.composition.len() != self.arity(lhs) {
            return Err(invalid(format!(
                "{} components for `{}` of arity {}",
                surface.composition.len(),
                self.name(lhs),
                self.arity(lhs)
            )));
        }
        for &Var(i, j) in surface.composition.iter().flatten() {
            match rhs.get(i) {
                None => return Err(invalid(format!("successor {} does not exist", i))),
                Some(&successor) if j >= self.arity(successor) => {
                    return Err(invalid(format!(
                        "`{}` has no component {}",
                        self.name(successor),
                        j
                    )))
                }
                Some(_) => (),
            }
        }

        self.surfaces.insert(rule, surface);
        Ok(())
    }

    /// Panics if `rule` was not issued by this grammar.
    pub fn rule(&self, rule: RuleId) -> &Rule {
        &self.rules[rule.0]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    /// All rules with `symbol` on their left-hand side.
    pub fn applicable(&self, symbol: SymbolId) -> &[RuleId] {
        self.applicable
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find_rule(&self, lhs: SymbolId, rhs: &[SymbolId]) -> Option<RuleId> {
        self.signatures
            .get(&Rule { lhs, rhs: rhs.to_vec() })
            .cloned()
    }

    pub fn binding(&self, rule: RuleId) -> Option<&BindingSpec> {
        self.bindings.get(&rule)
    }

    pub fn surface(&self, rule: RuleId) -> Option<&SurfaceSpec> {
        self.surfaces.get(&rule)
    }

    /// `lhs → (rhs, …)`, for messages.
    pub fn rule_string(&self, rule: RuleId) -> String {
        self.format_rule(self.rule(rule))
    }

    fn format_rule(&self, rule: &Rule) -> String {
        let rhs: Vec<&str> = rule.rhs.iter().map(|&s| self.name(s)).collect();
        format!("{} → ({})", self.name(rule.lhs), rhs.join(", "))
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("symbols", &self.arities.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Writes a token, quoting it unless it can be read back bare.
pub(crate) fn write_token(f: &mut Formatter, token: &str) -> fmt::Result {
    if !token.is_empty() && !token.chars().any(|c| crate::util::parsing::RESERVED.contains(c)) {
        write!(f, "{}", token)
    } else {
        write!(f, "\"{}\"", token.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Var {} {}", self.0, self.1)
    }
}

impl Display for SurfaceSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let components: Vec<String> = self
            .composition
            .iter()
            .map(|component| {
                let vars: Vec<String> = component.iter().map(Var::to_string).collect();
                format!("[{}]", vars.join(", "))
            })
            .collect();
        write!(f, "[{}]", components.join(", "))
    }
}

impl Display for BindingSpec {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let matches: Vec<String> = self
            .matches
            .iter()
            .map(|(k, v)| match *v {
                Some(v) => format!("{}: {}", k, v),
                None => format!("{}: _", k),
            })
            .collect();
        let inherit: Vec<String> = self
            .inherit
            .iter()
            .map(|i| match *i {
                Inherit::KeepInherited => "keep".to_string(),
                Inherit::UseResolvedHere => "here".to_string(),
                Inherit::UseSibling(j) => j.to_string(),
            })
            .collect();
        write!(f, "{{{}}} [{}]", matches.join(", "), inherit.join(", "))
    }
}

/// Writes constants and annotated rules in the format read by
/// `GrammarDefinition::from_str`.
impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for symbol in self.symbols() {
            let constants = self.constants(symbol);
            if constants.is_empty() {
                continue;
            }
            write_token(f, self.name(symbol))?;
            write!(f, ": [")?;
            for (i, constant) in constants.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if constant.len() > 1 {
                    write!(f, "(")?;
                }
                for (j, component) in constant.iter().enumerate() {
                    if j > 0 {
                        write!(f, ", ")?;
                    }
                    write_token(f, component)?;
                }
                if constant.len() > 1 {
                    write!(f, ")")?;
                }
            }
            writeln!(f, "]")?;
        }

        for (id, rule) in self.rules() {
            write_token(f, self.name(rule.lhs))?;
            write!(f, " → ")?;
            match self.surface(id) {
                Some(surface) => write!(f, "{}", surface)?,
                None => write!(f, "[]")?,
            }
            write!(f, " (")?;
            for (i, &successor) in rule.rhs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_token(f, self.name(successor))?;
            }
            write!(f, ")")?;
            if let Some(binding) = self.binding(id) {
                if !binding.is_trivial() {
                    write!(f, " # {}", binding)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
