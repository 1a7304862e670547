use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag};
use nom::character::complete::{char, digit1, space0};
use nom::combinator::{map, map_res, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, tuple};
use nom::IResult;

/// Characters that cannot occur in an unquoted token.
pub const RESERVED: &str = " \t\"-→=,;:#%()[]{}";

/// Parses a token (i.e. a terminal symbol or a non-terminal symbol).
/// A *token* can be of one of the following two forms:
///
/// * It is a non-empty string containing none of the characters in `RESERVED`.
/// * It is delimited by the symbol `'"'` on both sides and each occurrence of `'\\'` or `'"'` inside the delimiters is escaped.
///   `""` is the empty token.
pub fn parse_token(input: &str) -> IResult<&str, String> {
    alt((
        delimited(
            char('"'),
            alt((
                escaped_transform(
                    is_not("\\\""),
                    '\\',
                    alt((value("\\", tag("\\")), value("\"", tag("\"")))),
                ),
                value(String::new(), tag("")),
            )),
            char('"'),
        ),
        map(is_not(RESERVED), String::from),
    ))(input)
}

pub fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |digits: &str| digits.parse::<usize>())(input)
}

/// Parses the `input` into a `Vec<A>` given an `inner` parser for type `A`, an `opening` delimiter, a `closing` delimiter, and a `separator`.
/// The `inner` parser must not consume the `separator`s or the `closing` delimiter of the given `input`.
pub fn parse_vec<'a, A, P>(
    input: &'a str,
    inner: P,
    opening: char,
    closing: char,
    separator: char,
) -> IResult<&'a str, Vec<A>>
where
    P: FnMut(&'a str) -> IResult<&'a str, A>,
{
    delimited(
        pair(char(opening), space0),
        separated_list0(tuple((space0, char(separator), space0)), inner),
        pair(space0, char(closing)),
    )(input)
}

/// Cuts off a `%` comment, ignoring `%` inside quoted tokens.
pub fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '%' if !quoted => return &line[..i],
            _ => (),
        }
    }
    line
}
