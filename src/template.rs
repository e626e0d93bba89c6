// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Compiled artifacts: the reusable [`Template`] and the terminal
//! [`CompilerError`].
//!
//! A template carries the literal instruction stream (with
//! `PUSH(name)` placeholders for contract arguments) plus the
//! per-clause parameter schema the instantiation tooling needs, and
//! a blake3 fingerprint of the instruction stream so callers can
//! cheaply compare compiles.

use crate::ast::{Parameter, TypedContract};
use crate::types::Type;
use serde::Serialize;
use std::fmt;

/// A contract-level binding in the template schema. `Signature` is
/// not legal here; `Value` is (it names the locked value itself).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractParameter {
    pub name: String,
    pub item_type: Type,
}

/// A clause-level binding in the template schema. `Signature` is
/// legal here; `Value` is not.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseParameter {
    pub name: String,
    pub item_type: Type,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateClause {
    pub name: String,
    pub parameters: Vec<ClauseParameter>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub instructions: Vec<String>,
    pub clauses: Vec<TemplateClause>,
    pub clause_names: Vec<String>,
    pub params: Vec<ContractParameter>,
    pub source: String,
    pub fingerprint: String,
}

impl Template {
    pub fn new(
        name: String,
        instructions: Vec<String>,
        clauses: Vec<TemplateClause>,
        params: Vec<ContractParameter>,
        source: String,
    ) -> Self {
        let clause_names = clauses.iter().map(|c| c.name.clone()).collect();
        let fingerprint = fingerprint(&instructions);
        Self {
            kind: "template".to_string(),
            name,
            instructions,
            clauses,
            clause_names,
            params,
            source,
            fingerprint,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub message: String,
}

impl CompilerError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: "compilerError".to_string(),
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompilerError {}

/// Project the contract's parameter list into the template schema.
pub fn contract_parameters(parameters: &[Parameter]) -> Vec<ContractParameter> {
    parameters
        .iter()
        .map(|p| ContractParameter {
            name: p.name.clone(),
            item_type: p.item_type.clone(),
        })
        .collect()
}

/// Project the type-checked clauses into the template schema. Runs
/// before desugaring folds the clause list into one block.
pub fn template_clauses(contract: &TypedContract) -> Vec<TemplateClause> {
    contract
        .clauses
        .iter()
        .map(|clause| TemplateClause {
            name: clause.name.clone(),
            parameters: clause
                .parameters
                .iter()
                .map(|p| ClauseParameter {
                    name: p.name.clone(),
                    item_type: p.item_type.clone(),
                })
                .collect(),
        })
        .collect()
}

fn fingerprint(instructions: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for instruction in instructions {
        hasher.update(instruction.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize().as_bytes())
}
