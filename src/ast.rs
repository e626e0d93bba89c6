// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Contract AST node types and the generic rewrite kernel.
//!
//! Every compiler pass that transforms the tree is expressed as a
//! closure handed to [`rewrite`], which recursively rewrites all
//! structural children of a node before applying the closure to the
//! node itself (a bottom-up traversal over the whole closed node
//! union). Pass-local state lives in the closure, not in the tree.

use crate::types::Type;
use crate::{Error, Location};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralType {
    Boolean,
    Integer,
}

/// A binding site: contract parameter (`scope` absent) or clause
/// parameter (`scope` = owning clause name, set during scope checking).
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub item_type: Type,
    pub scope: Option<String>,
    pub location: Option<Location>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, item_type: Type) -> Self {
        Self {
            name: name.into(),
            item_type,
            scope: None,
            location: None,
        }
    }
}

/// A variable use. `scope` and `item_type` are absent in parser
/// output and filled in by the reference checker.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub scope: Option<String>,
    pub item_type: Option<Type>,
    pub location: Option<Location>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
            item_type: None,
            location: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Instruction {
        name: String,
        args: Vec<Expression>,
        location: Option<Location>,
    },
    ListLiteral {
        values: Vec<Expression>,
        location: Option<Location>,
    },
    ValueLiteral {
        literal_type: LiteralType,
        value: String,
        location: Option<Location>,
    },
    Variable(Variable),
}

impl Expression {
    pub fn instruction(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Instruction {
            name: name.into(),
            args,
            location: None,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(Variable::new(name))
    }

    pub fn list(values: Vec<Expression>) -> Self {
        Expression::ListLiteral {
            values,
            location: None,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Expression::ValueLiteral {
            literal_type: LiteralType::Boolean,
            value: if value { "true" } else { "false" }.to_string(),
            location: None,
        }
    }

    pub fn integer(value: i64) -> Self {
        Expression::ValueLiteral {
            literal_type: LiteralType::Integer,
            value: value.to_string(),
            location: None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Expression::Instruction { location, .. }
            | Expression::ListLiteral { location, .. }
            | Expression::ValueLiteral { location, .. } => *location,
            Expression::Variable(v) => v.location,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Assertion {
        expression: Expression,
        location: Option<Location>,
    },
    Unlock {
        value: Variable,
        location: Option<Location>,
    },
}

impl Statement {
    pub fn assertion(expression: Expression) -> Self {
        Statement::Assertion {
            expression,
            location: None,
        }
    }

    pub fn unlock(value: impl Into<String>) -> Self {
        Statement::Unlock {
            value: Variable::new(value),
            location: None,
        }
    }
}

/// One named spending condition. `reference_counts` is empty in
/// parser output and populated by the reference checker.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub statements: Vec<Statement>,
    pub reference_counts: BTreeMap<String, u32>,
    pub location: Option<Location>,
}

impl Clause {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            statements,
            reference_counts: BTreeMap::new(),
            location: None,
        }
    }
}

/// Parser output: the contract as written, clauses unmerged and
/// variables unannotated.
#[derive(Clone, Debug, PartialEq)]
pub struct RawContract {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub clauses: Vec<Clause>,
    pub location: Option<Location>,
}

impl RawContract {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        clauses: Vec<Clause>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            clauses,
            location: None,
        }
    }
}

/// Output of the reference checker: every variable annotated with its
/// scope and type, counts recorded at contract and clause level.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopedContract {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub clauses: Vec<Clause>,
    pub reference_counts: BTreeMap<String, u32>,
}

/// Output of the type checker: shape invariants hold and each
/// clause's statements are assertions only (the `unlock` has served
/// its purpose and carries no bytecode).
#[derive(Clone, Debug, PartialEq)]
pub struct TypedContract {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub clauses: Vec<Clause>,
    pub reference_counts: BTreeMap<String, u32>,
}

/// Post-desugar body: a clause, or a conditional selecting between
/// blocks.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Clause(Clause),
    Conditional(Box<Conditional>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Conditional {
    pub condition: Expression,
    pub if_block: Block,
    pub else_block: Option<Block>,
}

/// Output of the desugarer: a single block tree selected by the
/// synthetic clause selector (absent when there is one clause).
#[derive(Clone, Debug, PartialEq)]
pub struct DesugaredContract {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub block: Block,
    pub clause_selector: Option<String>,
}

/// The closed union of rewritable node categories.
///
/// `Expression::Variable` is traversed through its inner
/// [`Variable`] first, so a rewriting closure that cares about
/// variable uses matches on `AstNode::Variable` and ignores the
/// enclosing expression wrapper.
#[derive(Clone, Debug, PartialEq)]
pub enum AstNode {
    Contract(RawContract),
    Parameter(Parameter),
    Clause(Clause),
    Statement(Statement),
    Expression(Expression),
    Variable(Variable),
}

/// Bottom-up rewrite: children first, then `f` on the node itself.
pub fn rewrite<F>(node: AstNode, f: &mut F) -> Result<AstNode, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    let node = match node {
        AstNode::Contract(c) => AstNode::Contract(RawContract {
            name: c.name,
            parameters: c
                .parameters
                .into_iter()
                .map(|p| rewrite_parameter(p, f))
                .collect::<Result<_, _>>()?,
            clauses: c
                .clauses
                .into_iter()
                .map(|cl| rewrite_clause(cl, f))
                .collect::<Result<_, _>>()?,
            location: c.location,
        }),
        AstNode::Clause(cl) => AstNode::Clause(Clause {
            name: cl.name,
            parameters: cl
                .parameters
                .into_iter()
                .map(|p| rewrite_parameter(p, f))
                .collect::<Result<_, _>>()?,
            statements: cl
                .statements
                .into_iter()
                .map(|s| rewrite_statement(s, f))
                .collect::<Result<_, _>>()?,
            reference_counts: cl.reference_counts,
            location: cl.location,
        }),
        AstNode::Statement(s) => AstNode::Statement(match s {
            Statement::Assertion {
                expression,
                location,
            } => Statement::Assertion {
                expression: rewrite_expression(expression, f)?,
                location,
            },
            Statement::Unlock { value, location } => Statement::Unlock {
                value: rewrite_variable(value, f)?,
                location,
            },
        }),
        AstNode::Expression(e) => AstNode::Expression(match e {
            Expression::Instruction {
                name,
                args,
                location,
            } => Expression::Instruction {
                name,
                args: args
                    .into_iter()
                    .map(|a| rewrite_expression(a, f))
                    .collect::<Result<_, _>>()?,
                location,
            },
            Expression::ListLiteral { values, location } => Expression::ListLiteral {
                values: values
                    .into_iter()
                    .map(|v| rewrite_expression(v, f))
                    .collect::<Result<_, _>>()?,
                location,
            },
            lit @ Expression::ValueLiteral { .. } => lit,
            Expression::Variable(v) => Expression::Variable(rewrite_variable(v, f)?),
        }),
        leaf @ (AstNode::Parameter(_) | AstNode::Variable(_)) => leaf,
    };

    f(node)
}

pub fn rewrite_contract<F>(contract: RawContract, f: &mut F) -> Result<RawContract, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Contract(contract), f)? {
        AstNode::Contract(c) => Ok(c),
        other => Err(category_changed(&other)),
    }
}

pub fn rewrite_clause<F>(clause: Clause, f: &mut F) -> Result<Clause, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Clause(clause), f)? {
        AstNode::Clause(c) => Ok(c),
        other => Err(category_changed(&other)),
    }
}

pub fn rewrite_statement<F>(statement: Statement, f: &mut F) -> Result<Statement, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Statement(statement), f)? {
        AstNode::Statement(s) => Ok(s),
        other => Err(category_changed(&other)),
    }
}

pub fn rewrite_expression<F>(expression: Expression, f: &mut F) -> Result<Expression, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Expression(expression), f)? {
        AstNode::Expression(e) => Ok(e),
        other => Err(category_changed(&other)),
    }
}

pub fn rewrite_parameter<F>(parameter: Parameter, f: &mut F) -> Result<Parameter, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Parameter(parameter), f)? {
        AstNode::Parameter(p) => Ok(p),
        other => Err(category_changed(&other)),
    }
}

pub fn rewrite_variable<F>(variable: Variable, f: &mut F) -> Result<Variable, Error>
where
    F: FnMut(AstNode) -> Result<AstNode, Error>,
{
    match rewrite(AstNode::Variable(variable), f)? {
        AstNode::Variable(v) => Ok(v),
        other => Err(category_changed(&other)),
    }
}

fn category_changed(node: &AstNode) -> Error {
    Error::bug(format!(
        "rewrite closure changed node category (got {})",
        match node {
            AstNode::Contract(_) => "contract",
            AstNode::Parameter(_) => "parameter",
            AstNode::Clause(_) => "clause",
            AstNode::Statement(_) => "statement",
            AstNode::Expression(_) => "expression",
            AstNode::Variable(_) => "variable",
        }
    ))
}
