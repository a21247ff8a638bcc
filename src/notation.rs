//! Compact table notation using nom.
//!
//! ```text
//! REC21(CASEID, BIDX): B4, B5, B7
//! ──┬── ──────┬─────   ────┬────
//!   │         │            └── Output columns (optional)
//!   │         └── Join columns, in join order (optional)
//!   └── Table name
//! ```

use std::str::FromStr;

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::opt,
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};

use crate::error::{MergeError, MergeResult};
use crate::table::TableDescriptor;

/// Parse one table in compact notation.
pub fn parse_table(input: &str) -> MergeResult<TableDescriptor> {
    let trimmed = input.trim();

    match table_notation(trimmed) {
        Ok(("", (name, keys, columns))) => Ok(TableDescriptor::new(name, keys, columns)),
        Ok((remaining, _)) => Err(MergeError::parse(
            trimmed.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(MergeError::parse(
            trimmed.len() - e.input.len(),
            format!("Expected {:?}", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(MergeError::parse(trimmed.len(), "Incomplete input")),
    }
}

/// Parse several tables separated by `;`. Empty entries are skipped.
pub fn parse_tables(input: &str) -> MergeResult<Vec<TableDescriptor>> {
    input
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(parse_table)
        .collect()
}

impl FromStr for TableDescriptor {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_table(s)
    }
}

type Notation<'a> = (&'a str, Vec<&'a str>, Vec<&'a str>);

fn table_notation(input: &str) -> IResult<&str, Notation<'_>> {
    let (input, name) = identifier(input)?;
    let (input, keys) = opt(key_list)(input)?;
    let (input, columns) = opt(column_list)(input)?;

    Ok((input, (name, keys.unwrap_or_default(), columns.unwrap_or_default())))
}

/// `(A, B)`
fn key_list(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        preceded(multispace0, char('(')),
        identifier_list,
        preceded(multispace0, char(')')),
    )(input)
}

/// `: A, B`
fn column_list(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(preceded(multispace0, char(':')), identifier_list)(input)
}

fn identifier_list(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list0(
        preceded(multispace0, char(',')),
        preceded(multispace0, identifier),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}
