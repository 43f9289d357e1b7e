//! The codebase expression language.
//!
//! ```text
//! EXPR    -> TERM (OP TERM)*
//! TERM    -> LITERAL OPTIONS?
//! OPTIONS -> '(' (OPTION (',' OPTION)*)? ')'
//! OPTION  -> LITERAL '=' LITERAL
//! OP      -> '|' (edit) | '>' (translate)
//! ```
//!
//! `internal(revision=45)|renamer>public` checks out revision 45 of the
//! `internal` repository, runs the `renamer` editor on it and translates the
//! result into the `public` project space. An [`Expression`] prints back to
//! text that parses to an equal expression.

pub mod parser;
pub mod term;
pub mod tokenizer;

use std::fmt;

pub use parser::{parse_expression, parse_repository_expression, parse_term_completely};
pub use term::{Options, Term};

/// Option on a translate term naming the codebase the result should land on.
pub const REFERENCE_TARGET_CODEBASE: &str = "referenceTargetCodebase";
/// Option on a translate term naming the codebase the input was derived from.
pub const REFERENCE_FROM_CODEBASE: &str = "referenceFromCodebase";

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// `|`: run an editor within the current project space.
    Edit,
    /// `>`: translate into another project space.
    Translate,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Edit => '|',
            Operator::Translate => '>',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '|' => Some(Operator::Edit),
            '>' => Some(Operator::Translate),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An operator applied to a term, e.g. `|renamer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub operator: Operator,
    pub term: Term,
}

impl Operation {
    pub fn new(operator: Operator, term: Term) -> Self {
        Self { operator, term }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.term)
    }
}

// ---------------------------------------------------------------------------
// Expression tree
// ---------------------------------------------------------------------------

/// How to build a codebase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// A checkout of a named repository.
    Repository(Term),
    /// `base|editor(options)`
    Edit { base: Box<Expression>, term: Term },
    /// `base>space(options)`
    Translate { base: Box<Expression>, term: Term },
}

impl Expression {
    pub fn repository(name: impl Into<String>) -> Self {
        Expression::Repository(Term::new(name))
    }

    /// The outermost term: the repository, editor or target space.
    pub fn term(&self) -> &Term {
        match self {
            Expression::Repository(term)
            | Expression::Edit { term, .. }
            | Expression::Translate { term, .. } => term,
        }
    }

    /// The expression this one is applied to, if any.
    pub fn base(&self) -> Option<&Expression> {
        match self {
            Expression::Repository(_) => None,
            Expression::Edit { base, .. } | Expression::Translate { base, .. } => Some(base),
        }
    }

    /// The operation this expression applies, if it is not a leaf.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Expression::Repository(_) => None,
            Expression::Edit { term, .. } => Some(Operation::new(Operator::Edit, term.clone())),
            Expression::Translate { term, .. } => {
                Some(Operation::new(Operator::Translate, term.clone()))
            }
        }
    }

    /// Name of the repository at the root of the tree.
    pub fn repository_name(&self) -> &str {
        match self {
            Expression::Repository(term) => term.identifier(),
            Expression::Edit { base, .. } | Expression::Translate { base, .. } => {
                base.repository_name()
            }
        }
    }

    /// Copy with `key=value` set on the outermost term.
    pub fn with_option(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_term(|term| term.with_option(key, value))
    }

    /// Copy with `revision=<rev_id>` set on the root repository term.
    pub fn at_revision(&self, rev_id: impl Into<String>) -> Self {
        match self {
            Expression::Repository(term) => {
                Expression::Repository(term.with_option("revision", rev_id))
            }
            Expression::Edit { base, term } => Expression::Edit {
                base: Box::new(base.at_revision(rev_id)),
                term: term.clone(),
            },
            Expression::Translate { base, term } => Expression::Translate {
                base: Box::new(base.at_revision(rev_id)),
                term: term.clone(),
            },
        }
    }

    pub fn apply(self, operation: Operation) -> Self {
        match operation.operator {
            Operator::Edit => Expression::Edit {
                base: Box::new(self),
                term: operation.term,
            },
            Operator::Translate => Expression::Translate {
                base: Box::new(self),
                term: operation.term,
            },
        }
    }

    pub fn edit_with(&self, editor: impl Into<String>, options: Options) -> Self {
        self.clone()
            .apply(Operation::new(Operator::Edit, Term::with_options_map(editor, options)))
    }

    pub fn translate_to(&self, project_space: impl Into<String>) -> Self {
        self.clone()
            .apply(Operation::new(Operator::Translate, Term::new(project_space)))
    }

    /// Copy with `referenceTargetCodebase` pointing at `target`.
    pub fn with_reference_target_codebase(&self, target: &Expression) -> Self {
        self.with_option(REFERENCE_TARGET_CODEBASE, target.to_string())
    }

    /// Copy with `referenceFromCodebase` pointing at `from`.
    pub fn with_reference_from_codebase(&self, from: &Expression) -> Self {
        self.with_option(REFERENCE_FROM_CODEBASE, from.to_string())
    }

    fn map_term(&self, f: impl FnOnce(&Term) -> Term) -> Self {
        match self {
            Expression::Repository(term) => Expression::Repository(f(term)),
            Expression::Edit { base, term } => Expression::Edit {
                base: base.clone(),
                term: f(term),
            },
            Expression::Translate { base, term } => Expression::Translate {
                base: base.clone(),
                term: f(term),
            },
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Repository(term) => write!(f, "{term}"),
            Expression::Edit { base, term } => write!(f, "{base}{}{term}", Operator::Edit),
            Expression::Translate { base, term } => {
                write!(f, "{base}{}{term}", Operator::Translate)
            }
        }
    }
}
