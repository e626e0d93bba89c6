// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Type checker: expression typing over the type lattice, statement
//! checks, and the contract-shape invariants.
//!
//! Hash and comparison instructions are typed structurally; every
//! other call site unifies against the fixed signature supplied by
//! the instruction table. The final value-flow step filters each
//! clause down to its assertions: the `unlock` statement has proven
//! linearity during reference checking and emits no bytecode.

use crate::ast::{
    rewrite_clause, AstNode, Clause, Expression, LiteralType, ScopedContract, Statement,
    TypedContract,
};
use crate::emit::instruction_signature;
use crate::types::{match_types, HashFunction, Type};
use crate::{Error, Location};
use std::collections::BTreeSet;
use tracing::debug;

pub fn type_check(contract: ScopedContract) -> Result<TypedContract, Error> {
    check_clause_names(&contract.clauses)?;
    check_parameter_shapes(&contract)?;

    for clause in &contract.clauses {
        for statement in &clause.statements {
            type_check_statement(statement)?;
        }
        check_multisig_counts(clause)?;
    }

    // Value flow: the unlock has served its purpose, keep assertions.
    let clauses = contract
        .clauses
        .into_iter()
        .map(|mut clause| {
            clause
                .statements
                .retain(|s| matches!(s, Statement::Assertion { .. }));
            clause
        })
        .collect::<Vec<_>>();

    debug!(clauses = clauses.len(), "type check passed");

    Ok(TypedContract {
        name: contract.name,
        parameters: contract.parameters,
        clauses,
        reference_counts: contract.reference_counts,
    })
}

pub fn type_check_expression(expression: &Expression) -> Result<Type, Error> {
    match expression {
        Expression::ValueLiteral { literal_type, .. } => Ok(match literal_type {
            LiteralType::Boolean => Type::Boolean,
            LiteralType::Integer => Type::Integer,
        }),
        Expression::Variable(v) => v.item_type.clone().ok_or_else(|| {
            Error::bug(format!("variable {} has no type annotation", v.name))
        }),
        Expression::ListLiteral { values, location } => {
            type_check_list(values, *location)
        }
        Expression::Instruction {
            name,
            args,
            location,
        } => type_check_instruction(name, args, *location),
    }
}

fn type_check_instruction(
    name: &str,
    args: &[Expression],
    location: Option<Location>,
) -> Result<Type, Error> {
    if let Some(function) = HashFunction::from_name(name) {
        let [arg] = args else {
            return Err(wrong_arity(name, 1, args.len(), location));
        };
        let input = type_check_expression(arg)?;
        if !input.is_hashable() {
            return Err(Error::type_error(
                format!("cannot call {name} on an argument of type {input}"),
                location,
            ));
        }
        return Ok(Type::hash(function, input));
    }

    match name {
        "bytes" => {
            let [arg] = args else {
                return Err(wrong_arity(name, 1, args.len(), location));
            };
            let input = type_check_expression(arg)?;
            if matches!(input, Type::Value | Type::Boolean) {
                return Err(Error::type_error(
                    format!("cannot convert {input} to Bytes"),
                    location,
                ));
            }
            Ok(Type::Bytes)
        }
        "==" | "!=" | ">" | "<" => {
            let [left, right] = args else {
                return Err(wrong_arity(name, 2, args.len(), location));
            };
            let left_type = type_check_expression(left)?;
            let right_type = type_check_expression(right)?;
            if left_type == Type::Boolean || right_type == Type::Boolean {
                return Err(Error::type_error(
                    format!("cannot pass an expression of Boolean type to {name}"),
                    location,
                ));
            }
            match_types(&left_type, &right_type).map_err(|e| e.at(location))?;
            Ok(Type::Boolean)
        }
        _ => {
            let Some(signature) = instruction_signature(name) else {
                return Err(Error::type_error(
                    format!("unknown instruction: {name}"),
                    location,
                ));
            };
            if args.len() != signature.inputs.len() {
                return Err(wrong_arity(name, signature.inputs.len(), args.len(), location));
            }
            for (arg, expected) in args.iter().zip(&signature.inputs) {
                let actual = type_check_expression(arg)?;
                match_types(&actual, expected).map_err(|e| e.at(arg.location().or(location)))?;
            }
            Ok(signature.output)
        }
    }
}

fn wrong_arity(name: &str, expected: usize, got: usize, location: Option<Location>) -> Error {
    Error::type_error(
        format!("{name} expects {expected} argument(s), got {got}"),
        location,
    )
}

fn type_check_list(values: &[Expression], location: Option<Location>) -> Result<Type, Error> {
    let Some((first, rest)) = values.split_first() else {
        return Err(Error::type_error(
            "list literals cannot be empty".to_string(),
            location,
        ));
    };

    let mut element = type_check_expression(first)?;
    for value in rest {
        let next = type_check_expression(value)?;
        element = match_types(&element, &next).map_err(|e| e.at(location))?;
    }
    Ok(Type::list(element))
}

fn type_check_statement(statement: &Statement) -> Result<(), Error> {
    match statement {
        Statement::Assertion {
            expression,
            location,
        } => {
            let found = type_check_expression(expression)?;
            if found != Type::Boolean {
                return Err(Error::type_error(
                    format!("expression in verify statement must be Boolean, got {found}"),
                    expression.location().or(*location),
                ));
            }
            Ok(())
        }
        Statement::Unlock { value, location } => {
            let found = value.item_type.clone().ok_or_else(|| {
                Error::bug(format!("variable {} has no type annotation", value.name))
            })?;
            if found != Type::Value {
                return Err(Error::type_error(
                    format!("unlock statement requires a Value, got {found}"),
                    value.location.or(*location),
                ));
            }
            Ok(())
        }
    }
}

fn check_clause_names(clauses: &[Clause]) -> Result<(), Error> {
    let mut seen = BTreeSet::new();
    for clause in clauses {
        if !seen.insert(clause.name.clone()) {
            return Err(Error::name(
                format!("duplicate clause name: {}", clause.name),
                clause.location,
            ));
        }
    }
    Ok(())
}

fn check_parameter_shapes(contract: &ScopedContract) -> Result<(), Error> {
    let value_params = contract
        .parameters
        .iter()
        .filter(|p| p.item_type == Type::Value)
        .count();
    if value_params != 1 {
        return Err(Error::type_error(
            "a contract must only have one parameter of type Value".to_string(),
            None,
        ));
    }

    if let Some(param) = contract
        .parameters
        .iter()
        .find(|p| p.item_type == Type::Signature)
    {
        return Err(Error::type_error(
            format!(
                "contract parameter {} cannot have type Signature",
                param.name
            ),
            param.location,
        ));
    }

    for clause in &contract.clauses {
        if let Some(param) = clause
            .parameters
            .iter()
            .find(|p| p.item_type == Type::Value)
        {
            return Err(Error::type_error(
                format!("clause parameter {} cannot have type Value", param.name),
                param.location,
            ));
        }
    }

    Ok(())
}

/// Every `checkMultiSig` call must take list literals (desugaring
/// needs the static lengths) with no more signatures than keys.
fn check_multisig_counts(clause: &Clause) -> Result<(), Error> {
    rewrite_clause(clause.clone(), &mut |node| {
        if let AstNode::Expression(Expression::Instruction {
            ref name,
            ref args,
            location,
        }) = node
        {
            if name == "checkMultiSig" {
                let [Expression::ListLiteral { values: keys, .. }, Expression::ListLiteral { values: sigs, .. }] =
                    &args[..]
                else {
                    return Err(Error::type_error(
                        "checkMultiSig arguments must be list literals".to_string(),
                        location,
                    ));
                };
                if sigs.len() > keys.len() {
                    return Err(Error::type_error(
                        format!(
                            "checkMultiSig expects at most as many signatures as public \
                             keys, got {} signatures for {} public keys",
                            sigs.len(),
                            keys.len()
                        ),
                        location,
                    ));
                }
            }
        }
        Ok(node)
    })?;
    Ok(())
}
