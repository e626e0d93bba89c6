// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Post-order lowering from the desugared contract to abstract
//! stack-machine operations.
//!
//! One operation per semantic unit. Instruction arguments are
//! lowered in reverse order so the first formal argument is pushed
//! last and therefore sits on top of the stack, which is the order
//! the target VM's opcodes pop their operands in.

use crate::ast::{Block, DesugaredContract, Expression, LiteralType, Statement};
use crate::ir::Operation;
use crate::Error;
use tracing::debug;

pub fn lower_contract(contract: &DesugaredContract) -> Result<Vec<Operation>, Error> {
    let mut ops = Vec::new();
    ops.push(Operation::BeginContract {
        parameters: contract.parameters.clone(),
        selector: contract.clause_selector.clone(),
    });
    lower_block(&mut ops, &contract.block)?;

    debug!(ops = ops.len(), "lowered to stack operations");
    Ok(ops)
}

fn lower_block(ops: &mut Vec<Operation>, block: &Block) -> Result<(), Error> {
    match block {
        Block::Clause(clause) => {
            ops.push(Operation::BeginClause {
                name: clause.name.clone(),
                parameters: clause.parameters.clone(),
            });

            match clause.statements.split_last() {
                None => {
                    // an empty clause is trivially satisfied
                    ops.push(Operation::Push {
                        literal_type: LiteralType::Boolean,
                        value: "true".to_string(),
                    });
                }
                Some((last, rest)) => {
                    for statement in rest {
                        lower_statement_expression(ops, statement)?;
                        ops.push(Operation::Verify);
                    }
                    // the last assertion's value is the clause's
                    // success value; the VM treats a nonzero top of
                    // stack as success
                    lower_statement_expression(ops, last)?;
                }
            }

            ops.push(Operation::EndClause);
            Ok(())
        }
        Block::Conditional(conditional) => {
            lower_expression(ops, &conditional.condition)?;
            ops.push(Operation::BeginIf);
            lower_block(ops, &conditional.if_block)?;
            if let Some(else_block) = &conditional.else_block {
                ops.push(Operation::Else);
                lower_block(ops, else_block)?;
            }
            ops.push(Operation::EndIf);
            Ok(())
        }
    }
}

fn lower_statement_expression(
    ops: &mut Vec<Operation>,
    statement: &Statement,
) -> Result<(), Error> {
    match statement {
        Statement::Assertion { expression, .. } => lower_expression(ops, expression),
        Statement::Unlock { value, .. } => Err(Error::bug(format!(
            "unlock of {} survived the value-flow filter",
            value.name
        ))),
    }
}

fn lower_expression(ops: &mut Vec<Operation>, expression: &Expression) -> Result<(), Error> {
    match expression {
        Expression::Instruction { name, args, .. } => {
            for arg in args.iter().rev() {
                lower_expression(ops, arg)?;
            }
            ops.push(Operation::Instruction {
                name: name.clone(),
                arity: args.len(),
            });
            Ok(())
        }
        Expression::Variable(v) => {
            ops.push(Operation::Get {
                name: v.name.clone(),
            });
            Ok(())
        }
        Expression::ValueLiteral {
            literal_type,
            value,
            ..
        } => {
            ops.push(Operation::Push {
                literal_type: *literal_type,
                value: value.clone(),
            });
            Ok(())
        }
        Expression::ListLiteral { .. } => Err(Error::bug(
            "list literal survived desugaring".to_string(),
        )),
    }
}
