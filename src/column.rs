//! Column definition parser using nom.
//!
//! Parses the column mini-language embedded in operations.
//!
//! # Syntax Overview
//!
//! ```text
//! decimal(10, 2):notNullable:default(0)
//! ──┬──── ──┬──  ─────┬───── ────┬─────
//!   │       │         │          │
//!   │       │         │          └── Default value (verbatim)
//!   │       │         └── Modifier
//!   │       └── Type arguments (verbatim)
//!   └── Type name
//! ```
//!
//! Colons inside parentheses or quotes belong to the surrounding argument, so
//! `time:default('12:00')` has a single `default` modifier.

use nom::{
    character::complete::{char, multispace0},
    combinator::opt,
    multi::many0,
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::error::{MigrateError, MigrateResult};

/// A parsed column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef<'a> {
    /// The type part exactly as declared, e.g. `decimal(10, 2)`.
    pub type_def: &'a str,
    /// The bare type name, e.g. `decimal`.
    pub type_name: &'a str,
    /// The text between the type's parentheses, if any.
    pub type_args: Option<&'a str>,
    pub modifiers: Modifiers<'a>,
}

/// Recognized column modifiers.
///
/// Translators emit them in a fixed order: `NOT NULL`, `UNIQUE`,
/// `PRIMARY KEY`, `DEFAULT`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers<'a> {
    pub not_nullable: bool,
    pub unique: bool,
    pub primary: bool,
    pub default: Option<DefaultValue<'a>>,
    /// Modifiers that are not part of the language; ignored by translators.
    pub unknown: Vec<&'a str>,
}

impl<'a> ColumnDef<'a> {
    /// Type arguments split on top-level commas and trimmed.
    pub fn args(&self) -> Vec<&'a str> {
        match self.type_args {
            Some(args) => split_top_level(args, ',')
                .into_iter()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn has_args(&self) -> bool {
        self.type_args.is_some()
    }
}

/// Parse a column definition string.
pub fn parse_column(definition: &str) -> MigrateResult<ColumnDef<'_>> {
    let invalid = |reason: String| MigrateError::InvalidColumnDefinition {
        definition: definition.to_string(),
        reason,
    };

    let (rest, (type_def, raw_modifiers)) = match column_def(definition.trim()) {
        Ok(parsed) => parsed,
        Err(nom::Err::Failure(e)) | Err(nom::Err::Error(e)) => {
            return Err(invalid(format!("unbalanced parentheses or quotes near '{}'", e.input)));
        }
        Err(nom::Err::Incomplete(_)) => return Err(invalid("incomplete input".to_string())),
    };

    if !rest.is_empty() {
        return Err(invalid(format!("unexpected trailing content '{}'", rest)));
    }

    let type_def = type_def.trim();
    let (type_rest, (type_name, type_args)) = match pair(identifier, opt(group))(type_def) {
        Ok(parsed) => parsed,
        Err(nom::Err::Failure(_)) => {
            return Err(invalid("unbalanced parentheses in type arguments".to_string()));
        }
        Err(_) => return Err(invalid("missing type name".to_string())),
    };

    // Multi-word types such as `timestamp with time zone` keep the whole
    // text as their name and have no arguments.
    let (type_name, type_args) = if type_rest.is_empty() {
        (type_name, type_args)
    } else if type_rest.starts_with(|c: char| c.is_whitespace()) && balanced(type_def) {
        (type_def, None)
    } else {
        return Err(invalid(format!("unexpected '{}' in type '{}'", type_rest, type_def)));
    };

    let mut modifiers = Modifiers::default();
    for (name, args) in raw_modifiers {
        match (name, args) {
            ("notNullable", None) => modifiers.not_nullable = true,
            ("unique", None) => modifiers.unique = true,
            ("primary", None) => modifiers.primary = true,
            ("default", Some(value)) => modifiers.default = Some(DefaultValue::classify(value)),
            _ => {
                tracing::warn!(modifier = name, definition, "ignoring unknown column modifier");
                modifiers.unknown.push(name);
            }
        }
    }

    Ok(ColumnDef {
        type_def,
        type_name,
        type_args,
        modifiers,
    })
}

/// Parse the type segment followed by `:`-separated modifiers.
fn column_def(input: &str) -> IResult<&str, (&str, Vec<(&str, Option<&str>)>)> {
    let (input, type_def) = type_segment(input)?;
    let (input, modifiers) = many0(preceded(
        tuple((multispace0, char(':'), multispace0)),
        pair(identifier, opt(group)),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (type_def, modifiers)))
}

/// Parse an identifier (type or modifier name).
fn identifier(input: &str) -> IResult<&str, &str> {
    nom::bytes::complete::take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Everything up to the first `:` that is outside parentheses and quotes.
fn type_segment(input: &str) -> IResult<&str, &str> {
    match find_top_level(input, ':') {
        Some(i) => Ok((&input[i..], &input[..i])),
        None => Ok(("", input)),
    }
}

/// Parse a parenthesized group, returning the text between the outer parentheses.
///
/// Nested parentheses and quoted strings are skipped over.
fn group(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('(')(input)?;
    match find_top_level(body, ')') {
        Some(i) => Ok((&body[i + 1..], &body[..i])),
        None => Err(failure(input)),
    }
}

/// Byte offset of the first `target` outside parentheses and quotes.
///
/// A stray apostrophe (`default(it's)`) leaves a quote open; the scan is then
/// retried counting parentheses only.
fn find_top_level(input: &str, target: char) -> Option<usize> {
    scan(input, target, true).or_else(|| scan(input, target, false))
}

fn scan(input: &str, target: char, quotes: bool) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if quotes => quote = Some(c),
            (None, c) if c == target && depth == 0 => return Some(i),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    None
}

/// Parentheses close in order and none is left open.
fn balanced(input: &str) -> bool {
    let mut depth = 0usize;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn failure(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

/// Split on `sep` where it is not nested in parentheses or quotes.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Classification of a `default(...)` literal.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue<'a> {
    /// Contains `(`, e.g. `now()`. Emitted verbatim.
    Function(&'a str),
    /// A finite decimal number. Emitted verbatim.
    Numeric(&'a str),
    /// `true` / `false` in any case.
    Boolean(bool, &'a str),
    /// Already wrapped in matching single or double quotes. Emitted verbatim.
    Quoted(&'a str),
    /// Anything else; escaped and single-quoted.
    Text(&'a str),
}

impl<'a> DefaultValue<'a> {
    pub fn classify(raw: &'a str) -> Self {
        if raw.contains('(') {
            Self::Function(raw)
        } else if is_numeric(raw) {
            Self::Numeric(raw)
        } else if raw.eq_ignore_ascii_case("true") {
            Self::Boolean(true, raw)
        } else if raw.eq_ignore_ascii_case("false") {
            Self::Boolean(false, raw)
        } else if is_quoted(raw) {
            Self::Quoted(raw)
        } else {
            Self::Text(raw)
        }
    }

    /// Render as a SQL literal. Booleans keep the keyword as written.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Function(v) | Self::Numeric(v) | Self::Quoted(v) | Self::Boolean(_, v) => {
                v.to_string()
            }
            Self::Text(v) => quote_literal(v),
        }
    }
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn is_numeric(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && trimmed.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\''))
            || (raw.starts_with('"') && raw.ends_with('"')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type() {
        let col = parse_column("string").unwrap();
        assert_eq!(col.type_name, "string");
        assert_eq!(col.type_args, None);
        assert_eq!(col.modifiers, Modifiers::default());
    }

    #[test]
    fn test_type_with_args() {
        let col = parse_column("decimal(10, 2):notNullable").unwrap();
        assert_eq!(col.type_def, "decimal(10, 2)");
        assert_eq!(col.type_name, "decimal");
        assert_eq!(col.type_args, Some("10, 2"));
        assert_eq!(col.args(), vec!["10", "2"]);
        assert!(col.modifiers.not_nullable);
    }

    #[test]
    fn test_enum_args_keep_quotes() {
        let col = parse_column("enum('a','b, c')").unwrap();
        assert_eq!(col.args(), vec!["'a'", "'b, c'"]);
    }

    #[test]
    fn test_all_modifiers() {
        let col = parse_column("varchar(255):primary:unique:notNullable:default('x')").unwrap();
        assert!(col.modifiers.not_nullable);
        assert!(col.modifiers.unique);
        assert!(col.modifiers.primary);
        assert_eq!(col.modifiers.default, Some(DefaultValue::Quoted("'x'")));
    }

    #[test]
    fn test_colon_inside_default() {
        let col = parse_column("time:default('12:00')").unwrap();
        assert_eq!(col.modifiers.default, Some(DefaultValue::Quoted("'12:00'")));
    }

    #[test]
    fn test_function_default() {
        let col = parse_column("timestamptz:default(now())").unwrap();
        assert_eq!(col.modifiers.default, Some(DefaultValue::Function("now()")));
    }

    #[test]
    fn test_stray_apostrophe_in_default() {
        let col = parse_column("text:default(it's):notNullable").unwrap();
        assert_eq!(col.modifiers.default, Some(DefaultValue::Text("it's")));
        assert!(col.modifiers.not_nullable);
    }

    #[test]
    fn test_unknown_modifier_is_kept_aside() {
        let col = parse_column("integer:unsigned").unwrap();
        assert_eq!(col.modifiers.unknown, vec!["unsigned"]);
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_column("decimal(10, 2").unwrap_err();
        assert!(matches!(err, MigrateError::InvalidColumnDefinition { .. }));
    }

    #[test]
    fn test_multi_word_type_keeps_whole_name() {
        let col = parse_column("timestamp with time zone:notNullable").unwrap();
        assert_eq!(col.type_def, "timestamp with time zone");
        assert_eq!(col.type_name, "timestamp with time zone");
        assert_eq!(col.type_args, None);
        assert!(col.modifiers.not_nullable);

        let col = parse_column("varchar(20) binary").unwrap();
        assert_eq!(col.type_name, "varchar(20) binary");
        assert!(!col.has_args());
    }

    #[test]
    fn test_trailing_text_after_type_is_rejected() {
        for definition in ["integer):notNullable", "integer )", "decimal(10, 2)x", "int-eger"] {
            let err = parse_column(definition).unwrap_err();
            assert!(
                matches!(err, MigrateError::InvalidColumnDefinition { .. }),
                "{} -> {:?}",
                definition,
                err
            );
        }
    }

    #[test]
    fn test_missing_type() {
        assert!(parse_column(":notNullable").is_err());
        assert!(parse_column("").is_err());
    }

    #[test]
    fn test_default_classification() {
        assert_eq!(DefaultValue::classify("42"), DefaultValue::Numeric("42"));
        assert_eq!(DefaultValue::classify("-1.5"), DefaultValue::Numeric("-1.5"));
        assert_eq!(DefaultValue::classify("TRUE"), DefaultValue::Boolean(true, "TRUE"));
        assert_eq!(DefaultValue::classify("false"), DefaultValue::Boolean(false, "false"));
        assert_eq!(DefaultValue::classify("\"x\""), DefaultValue::Quoted("\"x\""));
        assert_eq!(DefaultValue::classify("inf"), DefaultValue::Text("inf"));
        assert_eq!(DefaultValue::classify("pending"), DefaultValue::Text("pending"));
    }

    #[test]
    fn test_text_default_is_escaped() {
        assert_eq!(DefaultValue::classify("it's").to_sql(), "'it''s'");
        assert_eq!(DefaultValue::classify("now()").to_sql(), "now()");
    }
}
