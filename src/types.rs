// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! The contract type lattice and structural unification.
//!
//! Types are a closed recursive sum: eight primitives, `Hash`
//! (a hash function applied to an input type) and `List`.
//! Identity is structural, so equality is derived and
//! unification is a comparison that reports both sides.

use crate::Error;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    Sha1,
    Sha256,
    Ripemd160,
}

impl HashFunction {
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Sha1 => "sha1",
            HashFunction::Sha256 => "sha256",
            HashFunction::Ripemd160 => "ripemd160",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(HashFunction::Sha1),
            "sha256" => Some(HashFunction::Sha256),
            "ripemd160" => Some(HashFunction::Ripemd160),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Type {
    PublicKey,
    Signature,
    Bytes,
    Time,
    Duration,
    Value,
    Boolean,
    Integer,
    Hash {
        function: HashFunction,
        input: Box<Type>,
    },
    List(Box<Type>),
}

impl Type {
    pub fn hash(function: HashFunction, input: Type) -> Self {
        Type::Hash {
            function,
            input: Box::new(input),
        }
    }

    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    /// Types a hash instruction accepts as input.
    pub fn is_hashable(&self) -> bool {
        matches!(self, Type::Bytes | Type::PublicKey | Type::Hash { .. })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::PublicKey => write!(f, "PublicKey"),
            Type::Signature => write!(f, "Signature"),
            Type::Bytes => write!(f, "Bytes"),
            Type::Time => write!(f, "Time"),
            Type::Duration => write!(f, "Duration"),
            Type::Value => write!(f, "Value"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Integer => write!(f, "Integer"),
            Type::Hash { function, input } => write!(f, "{}({})", function.name(), input),
            Type::List(element) => write!(f, "List({element})"),
        }
    }
}

/// Fixed input/output typing for a VM instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSignature {
    pub inputs: Vec<Type>,
    pub output: Type,
}

/// Unify two types structurally, producing the common type.
///
/// Equality recurses through `Hash` and `List` for free since
/// identity is structural; a mismatch names both sides.
pub fn match_types(a: &Type, b: &Type) -> Result<Type, Error> {
    if a == b {
        Ok(a.clone())
    } else {
        Err(Error::type_error(
            format!("got {a}, expected {b}"),
            None,
        ))
    }
}
