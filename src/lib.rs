// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Compiler for a contract language targeting a stack-machine VM.
//!
//! A contract locks a value behind one or more named clauses; each
//! clause lists typed parameters and the assertions a spender must
//! satisfy. [`compile`] takes the parsed contract through reference
//! checking, type checking, desugaring, lowering, stack resolution
//! and peephole optimization, and returns a reusable [`Template`]
//! whose instruction stream carries `PUSH(name)` placeholders for
//! the contract arguments.

pub mod ast;
pub mod desugar;
pub mod emit;
pub mod ir;
pub mod logging;
pub mod lower;
pub mod optimize;
pub mod scope;
pub mod stack;
pub mod template;
pub mod typecheck;
pub mod types;

pub use ast::RawContract;
pub use template::{CompilerError, Template};
pub use types::{HashFunction, Type};

use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument};

/// A 1-based position in the contract source, carried through from
/// the parser so diagnostics can point at the offending token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Message plus optional source position, shared by every error kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Diag {
    pub message: String,
    pub location: Option<Location>,
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Internal pipeline error. `Bug` marks states earlier passes are
/// supposed to rule out; it reaching a user is itself the defect.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("NameError: {0}")]
    Name(Diag),
    #[error("TypeError: {0}")]
    Type(Diag),
    #[error("ValueError: {0}")]
    Value(Diag),
    #[error("BugError: {0}")]
    Bug(Diag),
}

impl Error {
    pub fn name(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Name(Diag {
            message: message.into(),
            location,
        })
    }

    pub fn type_error(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Type(Diag {
            message: message.into(),
            location,
        })
    }

    pub fn value(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Value(Diag {
            message: message.into(),
            location,
        })
    }

    pub fn bug(message: impl Into<String>) -> Self {
        Error::Bug(Diag {
            message: message.into(),
            location: None,
        })
    }

    /// Attach a position if the error does not already carry one.
    pub fn at(mut self, location: Option<Location>) -> Self {
        let diag = self.diag_mut();
        if diag.location.is_none() {
            diag.location = location;
        }
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::Name(_) => "NameError",
            Error::Type(_) => "TypeError",
            Error::Value(_) => "ValueError",
            Error::Bug(_) => "BugError",
        }
    }

    pub fn message(&self) -> &str {
        &self.diag().message
    }

    pub fn location(&self) -> Option<Location> {
        self.diag().location
    }

    fn diag(&self) -> &Diag {
        match self {
            Error::Name(d) | Error::Type(d) | Error::Value(d) | Error::Bug(d) => d,
        }
    }

    fn diag_mut(&mut self) -> &mut Diag {
        match self {
            Error::Name(d) | Error::Type(d) | Error::Value(d) | Error::Bug(d) => d,
        }
    }
}

/// Compile a parsed contract into a [`Template`].
///
/// `source` is the original contract text; it is embedded verbatim
/// in the template (and in [`CompilerError`]) so downstream tooling
/// can re-display what was compiled. All pipeline failures surface
/// here as a single [`CompilerError`] with a formatted message.
#[instrument(level = "info", skip_all, fields(contract = %ast.name))]
pub fn compile(ast: RawContract, source: &str) -> Result<Template, CompilerError> {
    run_pipeline(ast, source).map_err(|e| CompilerError::new(source, describe(&e)))
}

fn run_pipeline(ast: RawContract, source: &str) -> Result<Template, Error> {
    let scoped = scope::reference_check(ast)?;
    let typed = typecheck::type_check(scoped)?;

    // schema projections happen before desugaring folds the clauses
    let clauses = template::template_clauses(&typed);
    let params = template::contract_parameters(&typed.parameters);
    let name = typed.name.clone();

    let desugared = desugar::desugar(typed)?;
    let ops = lower::lower_contract(&desugared)?;
    let resolved = stack::resolve_stack(&ops)?;
    let instructions = optimize::optimize(emit::to_opcodes(&resolved)?);

    debug!(instructions = instructions.len(), "compiled {name}");

    Ok(Template::new(
        name,
        instructions,
        clauses,
        params,
        source.to_string(),
    ))
}

fn describe(error: &Error) -> String {
    match error.location() {
        Some(l) => format!(
            "{} at line {}, column {}: {}",
            error.kind(),
            l.line,
            l.column,
            error.message()
        ),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_errors_name_their_position() {
        let err = Error::name(
            "unknown variable: x",
            Some(Location { line: 3, column: 7 }),
        );
        assert_eq!(
            describe(&err),
            "NameError at line 3, column 7: unknown variable: x"
        );
    }

    #[test]
    fn unlocated_errors_keep_the_kind_prefix() {
        let err = Error::type_error("got Bytes, expected Signature", None);
        assert_eq!(describe(&err), "TypeError: got Bytes, expected Signature");
    }

    #[test]
    fn at_does_not_overwrite_an_existing_position() {
        let original = Some(Location { line: 1, column: 2 });
        let err = Error::type_error("boom", original).at(Some(Location { line: 9, column: 9 }));
        assert_eq!(err.location(), original);

        let attached = Error::bug("oops").at(original);
        assert_eq!(attached.location(), original);
    }
}
