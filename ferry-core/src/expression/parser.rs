//! Recursive-descent parser for expression text.
//!
//! Every failure is a [`ParseError`] whose message starts with
//! `Cannot parse: `. The lower-level functions operate on a shared
//! [`Tokenizer`] so callers can compose them.

use super::term::{Options, Term};
use super::tokenizer::Tokenizer;
use super::{Expression, Operation, Operator};
use crate::error::ParseError;

/// Parse a full expression: a term followed by any number of operations.
pub fn parse_expression(text: &str) -> Result<Expression, ParseError> {
    let mut input = Tokenizer::new(text);
    let creator = parse_term(&mut input)?;
    let operations = parse_operation_list(&mut input)?;
    Ok(operations
        .into_iter()
        .fold(Expression::Repository(creator), Expression::apply))
}

/// Parse an expression that must be a bare repository, e.g.
/// `internal(revision=3)`.
pub fn parse_repository_expression(text: &str) -> Result<Expression, ParseError> {
    let mut input = Tokenizer::new(text);
    let creator = parse_term(&mut input)?;
    let operations = parse_operation_list(&mut input)?;
    if !operations.is_empty() {
        return Err(ParseError::new(
            "Expression must represent a simple repository, e.g. 'internal(revision=3)'.",
        ));
    }
    Ok(Expression::Repository(creator))
}

/// Parse one `key=value` pair.
pub fn parse_option(input: &mut Tokenizer<'_>) -> Result<(String, String), ParseError> {
    let Some(key) = input.next_token().literal().map(str::to_owned) else {
        return Err(ParseError::new(format!(
            "expected word during option key parse: {}",
            input.current()
        )));
    };
    if !input.next_token().is_char('=') {
        return Err(ParseError::new(format!(
            "key and value in option must be separated by \"=\":{}",
            input.current()
        )));
    }
    let Some(value) = input.next_token().literal().map(str::to_owned) else {
        return Err(ParseError::new(format!(
            "expected word during option value parse{}",
            input.current()
        )));
    };
    Ok((key, value))
}

/// Parse an optional parenthesised option list. Anything other than `(` is
/// left in the input and yields no options.
pub fn parse_options(input: &mut Tokenizer<'_>) -> Result<Options, ParseError> {
    let token = input.next_token();
    if token.is_eof() {
        return Ok(Options::new());
    }
    if !token.is_char('(') {
        input.push_back();
        return Ok(Options::new());
    }

    let mut options = Options::new();
    loop {
        let token = input.next_token();
        if token.is_eof() {
            return Err(ParseError::new("options not terminated by \")\""));
        }
        if token.is_char(')') {
            return Ok(options);
        }
        input.push_back();
        let (key, value) = parse_option(input)?;
        options.insert(key, value);

        let token = input.next_token();
        if token.is_char(')') {
            return Ok(options);
        }
        if !token.is_char(',') {
            return Err(ParseError::new("text after option must be \",\" or \")\""));
        }
    }
}

/// Parse an identifier and its options.
pub fn parse_term(input: &mut Tokenizer<'_>) -> Result<Term, ParseError> {
    let Some(identifier) = input.next_token().literal().map(str::to_owned) else {
        return Err(ParseError::new(format!(
            "expected word during identifier parse{}",
            input.current()
        )));
    };
    let options = parse_options(input)?;
    Ok(Term::with_options_map(identifier, options))
}

/// Parse a term and require that nothing follows it.
pub fn parse_term_completely(text: &str) -> Result<Term, ParseError> {
    let mut input = Tokenizer::new(text);
    let term = parse_term(&mut input)?;
    if !is_input_exhausted(&mut input) {
        return Err(ParseError::new(format!(
            "unexpected text after expression: {}",
            input.current()
        )));
    }
    Ok(term)
}

pub fn parse_operator(input: &mut Tokenizer<'_>) -> Result<Operator, ParseError> {
    let token = input.next_token();
    let operator = match token.kind {
        super::tokenizer::TokenKind::Char(c) => Operator::from_symbol(c),
        _ => None,
    };
    operator.ok_or_else(|| ParseError::new(format!("Invalid operator \"{}\"", input.current())))
}

/// Parse `(OP TERM)*` until the input runs out.
pub fn parse_operation_list(input: &mut Tokenizer<'_>) -> Result<Vec<Operation>, ParseError> {
    let mut operations = Vec::new();
    while !is_input_exhausted(input) {
        let operator = parse_operator(input)?;
        let term = parse_term(input)?;
        operations.push(Operation::new(operator, term));
    }
    Ok(operations)
}

fn is_input_exhausted(input: &mut Tokenizer<'_>) -> bool {
    if input.next_token().is_eof() {
        return true;
    }
    input.push_back();
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_err(text: &str) -> String {
        parse_option(&mut Tokenizer::new(text))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn parses_single_option() {
        let (k, v) = parse_option(&mut Tokenizer::new("key=value")).unwrap();
        assert_eq!((k.as_str(), v.as_str()), ("key", "value"));
        let (k, v) = parse_option(&mut Tokenizer::new(r#""key"="value""#)).unwrap();
        assert_eq!((k.as_str(), v.as_str()), ("key", "value"));
    }

    #[test]
    fn option_errors() {
        assert_eq!(
            option_err("=value"),
            "Cannot parse: expected word during option key parse: Token['='], line 1"
        );
        assert_eq!(
            option_err("key value"),
            "Cannot parse: key and value in option must be separated by \"=\":Token[value], line 1"
        );
        assert_eq!(
            option_err("key="),
            "Cannot parse: expected word during option value parseToken[EOF], line 1"
        );
    }

    #[test]
    fn options_list() {
        let opts = parse_options(&mut Tokenizer::new("(a=b,c=d)")).unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts["c"], "d");

        let empty = parse_options(&mut Tokenizer::new("()")).unwrap();
        assert!(empty.is_empty());

        let trailing_comma = parse_options(&mut Tokenizer::new("(a=b,)")).unwrap();
        assert_eq!(trailing_comma.len(), 1);

        let mut t = Tokenizer::new("|x");
        assert!(parse_options(&mut t).unwrap().is_empty());
        assert!(t.next_token().is_char('|'), "non-paren token must be pushed back");
    }

    #[test]
    fn options_errors() {
        let err = parse_options(&mut Tokenizer::new("(a=b")).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse: options not terminated by \")\"");
        let err = parse_options(&mut Tokenizer::new("(a=b;c=d)")).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse: text after option must be \",\" or \")\"");
    }

    #[test]
    fn operator_error() {
        let err = parse_operator(&mut Tokenizer::new("a")).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse: Invalid operator \"Token[a], line 1\"");
    }

    #[test]
    fn term_completely_rejects_trailing_text() {
        let err = parse_term_completely("internal(a=b) extra").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot parse: unexpected text after expression: Token[extra], line 1"
        );
    }
}
