use std::collections::BTreeMap;
use std::fmt;

use super::tokenizer::is_word_char;

/// Option map of a [`Term`]; keys iterate in sorted order.
pub type Options = BTreeMap<String, String>;

/// An identifier plus options, e.g. `internal(revision=45)`.
///
/// The canonical string form lists options in key order, so two terms are
/// equal exactly when their canonical strings are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    identifier: String,
    options: Options,
}

impl Term {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            options: Options::new(),
        }
    }

    pub fn with_options_map(identifier: impl Into<String>, options: Options) -> Self {
        Self {
            identifier: identifier.into(),
            options,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Copy of this term with `key` set to `value`.
    pub fn with_option(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut options = self.options.clone();
        options.insert(key.into(), value.into());
        Self::with_options_map(self.identifier.clone(), options)
    }

    /// Copy of this term with every entry of `more` added.
    pub fn with_options<I, K, V>(&self, more: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut options = self.options.clone();
        options.extend(more.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self::with_options_map(self.identifier.clone(), options)
    }
}

/// Writes `s` bare when it is a plain word, quoted and escaped otherwise.
pub(crate) fn write_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if !s.is_empty() && s.chars().all(is_word_char) {
        return f.write_str(s);
    }
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_literal(f, &self.identifier)?;
        if self.options.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write_literal(f, key)?;
            f.write_str("=")?;
            write_literal(f, value)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_sorted() {
        let term = Term::new("internal").with_options([("foo", "bar"), ("baz", "quux")]);
        assert_eq!(term.to_string(), "internal(baz=quux,foo=bar)");
    }

    #[test]
    fn bare_identifier_has_no_parens() {
        assert_eq!(Term::new("public").to_string(), "public");
    }

    #[test]
    fn non_word_values_are_quoted() {
        let term = Term::new("editor").with_option("locale", "en_US");
        assert_eq!(term.to_string(), r#"editor(locale="en_US")"#);
        let empty = Term::new("x").with_option("k", "");
        assert_eq!(empty.to_string(), r#"x(k="")"#);
    }

    #[test]
    fn with_option_overrides() {
        let term = Term::new("internal")
            .with_option("revision", "1")
            .with_option("revision", "2");
        assert_eq!(term.option("revision"), Some("2"));
    }

    #[test]
    fn equal_terms_built_in_different_orders() {
        let a = Term::new("t").with_option("a", "1").with_option("b", "2");
        let b = Term::new("t").with_option("b", "2").with_option("a", "1");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }
}
