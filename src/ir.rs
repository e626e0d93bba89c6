// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Abstract stack-machine operation sets.
//!
//! [`Operation`] is what lowering produces: variable reads are still
//! symbolic (`Get`) and scope boundaries are explicit markers for the
//! stack resolver. [`FinalOperation`] is the resolved form consumed
//! by the opcode emitter: every read is a concrete `Pick`/`Roll`
//! depth and dead bindings are discarded with explicit `Drop`s.

use crate::ast::{LiteralType, Parameter};

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    BeginContract {
        parameters: Vec<Parameter>,
        selector: Option<String>,
    },
    BeginClause {
        name: String,
        parameters: Vec<Parameter>,
    },
    EndClause,
    BeginIf,
    Else,
    EndIf,
    Verify,
    Push {
        literal_type: LiteralType,
        value: String,
    },
    Get {
        name: String,
    },
    Instruction {
        name: String,
        arity: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum FinalOperation {
    Pick {
        depth: usize,
    },
    Roll {
        depth: usize,
    },
    Drop,
    BeginIf,
    Else,
    EndIf,
    Verify,
    Push {
        literal_type: LiteralType,
        value: String,
    },
    PushParameter {
        name: String,
    },
    Instruction {
        name: String,
    },
}
