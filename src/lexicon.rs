//! Word lists and tab-separated word tuples that supply the constants of
//! terminal symbols.

use nom::bytes::complete::{is_not, tag};
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, opt};
use nom::sequence::{pair, preceded, separated_pair, terminated};
use nom::IResult;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::grammars::mcfg::Constant;
use crate::util::parsing::parse_usize;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("could not open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read lexicon: {0}")]
    Read(#[from] io::Error),
    #[error("line {line} has {found} columns, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("column {column} out of range for entries with {width} columns")]
    ColumnOutOfRange { column: usize, width: usize },
    #[error("malformed lexicon assignment `{0}`, expected SYMBOL=PATH[:COLUMN][@FROM..TO]")]
    MalformedAssignment(String),
}

/// An ordered list of entries with the same number of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    entries: Vec<Constant>,
}

impl Lexicon {
    /// Reads one entry per non-empty line, splitting lines at tabs.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LexiconError> {
        let mut entries: Vec<Constant> = Vec::new();
        for (number, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: Constant = line.split('\t').map(|s| s.trim().to_string()).collect();
            if let Some(first) = entries.first() {
                if first.len() != entry.len() {
                    return Err(LexiconError::Ragged {
                        line: number + 1,
                        expected: first.len(),
                        found: entry.len(),
                    });
                }
            }
            entries.push(entry);
        }
        Ok(Lexicon { entries })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LexiconError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Lexicon::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of columns of each entry (0 for an empty lexicon).
    pub fn width(&self) -> usize {
        self.entries.first().map(Vec::len).unwrap_or(0)
    }

    pub fn entries(&self) -> &[Constant] {
        &self.entries
    }

    /// Shuffles whole entries, keeping the columns of each entry together.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
    }

    /// The entries in `range`, clamped to the length of the lexicon.
    pub fn slice(&self, range: Range<usize>) -> Lexicon {
        let end = range.end.min(self.entries.len());
        let start = range.start.min(end);
        Lexicon {
            entries: self.entries[start..end].to_vec(),
        }
    }

    /// Projects every entry onto one of its columns.
    pub fn column(&self, column: usize) -> Result<Lexicon, LexiconError> {
        if self.entries.is_empty() {
            return Ok(Lexicon::default());
        }
        if column >= self.width() {
            return Err(LexiconError::ColumnOutOfRange {
                column,
                width: self.width(),
            });
        }
        Ok(Lexicon {
            entries: self.entries.iter().map(|e| vec![e[column].clone()]).collect(),
        })
    }

    pub fn into_constants(self) -> Vec<Constant> {
        self.entries
    }
}

/// `SYMBOL=PATH[:COLUMN][@FROM..TO]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub symbol: String,
    pub path: PathBuf,
    pub column: Option<usize>,
    pub range: Option<Range<usize>>,
}

fn parse_symbol(input: &str) -> IResult<&str, &str> {
    terminated(is_not("="), char('='))(input)
}

/// `[:COLUMN][@FROM..TO]` up to the end of the input
fn parse_selection(input: &str) -> IResult<&str, (Option<usize>, Option<Range<usize>>)> {
    all_consuming(pair(
        opt(preceded(char(':'), parse_usize)),
        opt(preceded(
            char('@'),
            map(separated_pair(parse_usize, tag(".."), parse_usize), |(from, to)| from..to),
        )),
    ))(input)
}

impl FromStr for Assignment {
    type Err = LexiconError;

    /// The path is the shortest non-empty prefix of the part after `=`
    /// that leaves a valid selection.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || LexiconError::MalformedAssignment(s.to_string());

        let (rest, symbol) = parse_symbol(s).map_err(|_| malformed())?;
        let (path, (column, range)) = (1..=rest.len())
            .filter(|&i| rest.is_char_boundary(i))
            .find_map(|i| {
                parse_selection(&rest[i..])
                    .ok()
                    .map(|(_, selection)| (&rest[..i], selection))
            })
            .ok_or_else(malformed)?;

        Ok(Assignment {
            symbol: symbol.to_string(),
            path: PathBuf::from(path),
            column,
            range,
        })
    }
}

impl Assignment {
    /// Reads the file, shuffles it with `rng`, then slices and projects it.
    pub fn load<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Lexicon, LexiconError> {
        let mut lexicon = Lexicon::from_path(&self.path)?;
        lexicon.shuffle(rng);
        if let Some(ref range) = self.range {
            lexicon = lexicon.slice(range.clone());
        }
        if let Some(column) = self.column {
            lexicon = lexicon.column(column)?;
        }
        if lexicon.is_empty() {
            warn!("no entries for {} in {}", self.symbol, self.path.display());
        }
        Ok(lexicon)
    }
}
