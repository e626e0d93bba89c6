// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Desugarer: collapses the clause list into one conditional tree
//! and flattens `checkMultiSig` call sites.
//!
//! The target VM has no indexed jump, only nested IF/ELSE, so clause
//! selection becomes a right-leaning chain of equality tests against
//! a synthetic selector value supplied by the spender. Selecting
//! clause k costs O(k) comparisons; that is the trade the VM forces.

use crate::ast::{
    rewrite_clause, AstNode, Block, Clause, Conditional, DesugaredContract, Expression,
    TypedContract,
};
use crate::Error;
use tracing::debug;

pub fn desugar(contract: TypedContract) -> Result<DesugaredContract, Error> {
    let clauses = contract
        .clauses
        .into_iter()
        .map(expand_multisig)
        .collect::<Result<Vec<_>, _>>()?;

    let clause_selector = (clauses.len() > 1).then(|| {
        clauses
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    });

    let block = match &clause_selector {
        None => {
            let [clause] = <[Clause; 1]>::try_from(clauses)
                .map_err(|_| Error::bug("contract without clauses".to_string()))?;
            Block::Clause(clause)
        }
        Some(selector) => select_block(clauses, selector),
    };

    debug!(selector = clause_selector.as_deref(), "desugared");

    Ok(DesugaredContract {
        name: contract.name,
        parameters: contract.parameters,
        block,
        clause_selector,
    })
}

/// Build the selection chain for two or more clauses, peeling the
/// last declared clause into the IF branch each step. The two-clause
/// base tests the bare selector (the last clause is the "true"
/// branch); deeper chains test `index == selector` explicitly.
fn select_block(mut clauses: Vec<Clause>, selector: &str) -> Block {
    let index = clauses.len() - 1;
    let last = clauses.pop().expect("select_block needs clauses");

    if clauses.len() == 1 {
        let first = clauses.pop().expect("two-clause base");
        return Block::Conditional(Box::new(Conditional {
            condition: Expression::variable(selector),
            if_block: Block::Clause(last),
            else_block: Some(Block::Clause(first)),
        }));
    }

    Block::Conditional(Box::new(Conditional {
        condition: Expression::instruction(
            "==",
            vec![
                Expression::integer(index as i64),
                Expression::variable(selector),
            ],
        ),
        if_block: Block::Clause(last),
        else_block: Some(select_block(clauses, selector)),
    }))
}

/// Rewrite every `checkMultiSig(pubKeys, sigs)` call into the flat
/// count-prefixed argument convention of the VM's multisig opcode:
/// `[len(pubKeys), pubKeys…, len(sigs), sigs…, 0]`. The trailing
/// zero is the dummy the opcode pops but never inspects.
fn expand_multisig(clause: Clause) -> Result<Clause, Error> {
    rewrite_clause(clause, &mut |node| {
        Ok(match node {
            AstNode::Expression(Expression::Instruction {
                name,
                mut args,
                location,
            }) if name == "checkMultiSig" => {
                let (Some(Expression::ListLiteral { values: sigs, .. }), Some(Expression::ListLiteral { values: keys, .. })) =
                    (args.pop(), args.pop())
                else {
                    return Err(Error::bug(
                        "checkMultiSig arguments survived type checking unlisted".to_string(),
                    ));
                };

                let mut flat = Vec::with_capacity(keys.len() + sigs.len() + 3);
                flat.push(Expression::integer(keys.len() as i64));
                flat.extend(keys);
                flat.push(Expression::integer(sigs.len() as i64));
                flat.extend(sigs);
                flat.push(Expression::integer(0));

                AstNode::Expression(Expression::Instruction {
                    name,
                    args: flat,
                    location,
                })
            }
            other => other,
        })
    })
}
