// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Reference checker: scope resolution and the linear `Value`
//! discipline.
//!
//! Builds a contract-level name table and a per-clause table seeded
//! with the contract entries, annotates every variable use with its
//! scope and declared type, counts uses, and rejects duplicate,
//! undefined and unused names. A contract parameter of type `Value`
//! must be used exactly once in every clause.

use crate::ast::{rewrite_clause, AstNode, Clause, RawContract, ScopedContract};
use crate::types::Type;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub fn reference_check(contract: RawContract) -> Result<ScopedContract, Error> {
    let mut contract_types: BTreeMap<String, Type> = BTreeMap::new();
    let mut contract_counts: BTreeMap<String, u32> = BTreeMap::new();

    for param in &contract.parameters {
        if contract_types
            .insert(param.name.clone(), param.item_type.clone())
            .is_some()
        {
            return Err(Error::name(
                format!("variable {} is already defined", param.name),
                param.location,
            ));
        }
        contract_counts.insert(param.name.clone(), 0);
    }

    let mut clauses = Vec::with_capacity(contract.clauses.len());
    for clause in contract.clauses {
        clauses.push(check_clause(
            clause,
            &contract_types,
            &mut contract_counts,
        )?);
    }

    for (name, count) in &contract_counts {
        if *count == 0 {
            let param = contract
                .parameters
                .iter()
                .find(|p| &p.name == name);
            // Value misuse is reported per clause; anything still at
            // zero here was never referenced anywhere.
            return Err(Error::name(
                format!("unused parameter: {name}"),
                param.and_then(|p| p.location),
            ));
        }
    }

    debug!(
        parameters = contract.parameters.len(),
        clauses = clauses.len(),
        "reference check passed"
    );

    Ok(ScopedContract {
        name: contract.name,
        parameters: contract.parameters,
        clauses,
        reference_counts: contract_counts,
    })
}

fn check_clause(
    clause: Clause,
    contract_types: &BTreeMap<String, Type>,
    contract_counts: &mut BTreeMap<String, u32>,
) -> Result<Clause, Error> {
    let clause_name = clause.name.clone();

    let mut clause_types = contract_types.clone();
    let mut clause_counts: BTreeMap<String, u32> =
        contract_types.keys().map(|k| (k.clone(), 0)).collect();
    let mut clause_params: BTreeSet<String> = BTreeSet::new();

    for param in &clause.parameters {
        if clause_types
            .insert(param.name.clone(), param.item_type.clone())
            .is_some()
        {
            return Err(Error::name(
                format!("variable {} is already defined", param.name),
                param.location,
            ));
        }
        clause_counts.insert(param.name.clone(), 0);
        clause_params.insert(param.name.clone());
    }

    let mut checked = rewrite_clause(clause, &mut |node| {
        Ok(match node {
            AstNode::Variable(mut v) => {
                let Some(item_type) = clause_types.get(&v.name) else {
                    return Err(Error::name(
                        format!("unknown variable: {}", v.name),
                        v.location,
                    ));
                };

                *clause_counts.entry(v.name.clone()).or_insert(0) += 1;
                if let Some(count) = contract_counts.get_mut(&v.name) {
                    *count += 1;
                }

                v.scope = clause_params
                    .contains(&v.name)
                    .then(|| clause_name.clone());
                v.item_type = Some(item_type.clone());
                AstNode::Variable(v)
            }
            other => other,
        })
    })?;

    for param in &checked.parameters {
        if clause_counts.get(&param.name) == Some(&0) {
            return Err(Error::name(
                format!("unused variable: {}", param.name),
                param.location,
            ));
        }
    }

    for (name, declared) in contract_types {
        if *declared != Type::Value {
            continue;
        }
        match clause_counts.get(name).copied().unwrap_or(0) {
            0 => {
                return Err(Error::name(
                    format!("{name} must be disposed of in clause {clause_name}"),
                    checked.location,
                ))
            }
            1 => {}
            _ => {
                return Err(Error::name(
                    format!("{name} cannot be used twice in clause {clause_name}"),
                    checked.location,
                ))
            }
        }
    }

    checked.reference_counts = clause_counts;
    Ok(checked)
}
