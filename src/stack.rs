// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Stack resolver: turns symbolic variable reads into concrete
//! stack references against a simulated frame.
//!
//! The frame mirrors what the VM stack will hold at runtime: the
//! spender's arguments for the selected clause (first argument
//! deepest) with the synthetic clause selector on top. A read whose
//! binding has no later use in its live range becomes a consuming
//! `Roll`; any other read becomes a copying `Pick`. Contract
//! parameters are not stack-resident at all — their values are baked
//! into the script at instantiation, so reading one emits a
//! `PushParameter` placeholder. On every exit path the slots below
//! the clause's result value are dropped so the VM stack is left
//! exactly one item tall.

use crate::ir::{FinalOperation, Operation};
use crate::types::Type;
use crate::Error;
use std::collections::BTreeSet;
use tracing::debug;

/// One simulated stack slot, bottom of the frame first.
#[derive(Clone, Debug, PartialEq)]
enum Slot {
    /// The not-yet-expanded argument region for whichever clause the
    /// spender selects; replaced by named slots at `BeginClause`.
    Args,
    /// A frame-resident binding (clause parameter or selector).
    Named(String),
    /// An anonymous intermediate value.
    Value,
}

/// Snapshot taken at `BeginIf` so the else branch can resolve
/// against the same frame the condition left behind.
struct Branch {
    entry: Vec<Slot>,
    if_exit: Option<Vec<Slot>>,
}

struct Resolver<'a> {
    ops: &'a [Operation],
    frame: Vec<Slot>,
    branches: Vec<Branch>,
    contract_params: BTreeSet<String>,
    in_clause: bool,
    out: Vec<FinalOperation>,
}

pub fn resolve_stack(ops: &[Operation]) -> Result<Vec<FinalOperation>, Error> {
    let mut resolver = Resolver {
        ops,
        frame: Vec::new(),
        branches: Vec::new(),
        contract_params: BTreeSet::new(),
        in_clause: false,
        out: Vec::new(),
    };

    for (index, op) in ops.iter().enumerate() {
        resolver.step(index, op)?;
    }

    if resolver.frame != vec![Slot::Value] {
        return Err(Error::bug(format!(
            "stack not fully resolved: {:?}",
            resolver.frame
        )));
    }
    if !resolver.branches.is_empty() {
        return Err(Error::bug("unterminated conditional".to_string()));
    }

    debug!(ops = resolver.out.len(), "resolved stack references");
    Ok(resolver.out)
}

impl Resolver<'_> {
    fn step(&mut self, index: usize, op: &Operation) -> Result<(), Error> {
        match op {
            Operation::BeginContract {
                parameters,
                selector,
            } => {
                for param in parameters {
                    // Value never reaches the script; everything else
                    // is substituted at instantiation time.
                    if param.item_type != Type::Value {
                        self.contract_params.insert(param.name.clone());
                    }
                }
                self.frame.push(Slot::Args);
                if let Some(selector) = selector {
                    self.frame.push(Slot::Named(selector.clone()));
                }
                Ok(())
            }
            Operation::BeginClause { parameters, .. } => {
                let position = self
                    .frame
                    .iter()
                    .position(|s| *s == Slot::Args)
                    .ok_or_else(|| Error::bug("clause without argument region".to_string()))?;
                let names = parameters
                    .iter()
                    .map(|p| Slot::Named(p.name.clone()));
                self.frame.splice(position..=position, names);
                self.in_clause = true;
                Ok(())
            }
            Operation::EndClause => {
                if self.frame.last() != Some(&Slot::Value) {
                    return Err(Error::bug(
                        "clause left no result on the stack".to_string(),
                    ));
                }
                // discard everything under the clause's result value
                while self.frame.len() > 1 {
                    self.out.push(FinalOperation::Roll { depth: 1 });
                    self.out.push(FinalOperation::Drop);
                    let index = self.frame.len() - 2;
                    self.frame.remove(index);
                }
                self.in_clause = false;
                Ok(())
            }
            Operation::BeginIf => {
                self.pop_value("conditional")?;
                self.branches.push(Branch {
                    entry: self.frame.clone(),
                    if_exit: None,
                });
                self.out.push(FinalOperation::BeginIf);
                Ok(())
            }
            Operation::Else => {
                let branch = self
                    .branches
                    .last_mut()
                    .ok_or_else(|| Error::bug("else outside conditional".to_string()))?;
                branch.if_exit = Some(std::mem::replace(&mut self.frame, branch.entry.clone()));
                self.out.push(FinalOperation::Else);
                Ok(())
            }
            Operation::EndIf => {
                let branch = self
                    .branches
                    .pop()
                    .ok_or_else(|| Error::bug("endif outside conditional".to_string()))?;
                if let Some(if_exit) = branch.if_exit {
                    if if_exit != self.frame {
                        return Err(Error::bug(format!(
                            "branches left unbalanced stacks: {:?} vs {:?}",
                            if_exit, self.frame
                        )));
                    }
                }
                self.out.push(FinalOperation::EndIf);
                Ok(())
            }
            Operation::Verify => {
                self.pop_value("verify")?;
                self.out.push(FinalOperation::Verify);
                Ok(())
            }
            Operation::Push {
                literal_type,
                value,
            } => {
                self.frame.push(Slot::Value);
                self.out.push(FinalOperation::Push {
                    literal_type: *literal_type,
                    value: value.clone(),
                });
                Ok(())
            }
            Operation::Get { name } => self.get(index, name),
            Operation::Instruction { name, arity } => {
                for _ in 0..*arity {
                    self.pop_value(name)?;
                }
                self.frame.push(Slot::Value);
                self.out.push(FinalOperation::Instruction { name: name.clone() });
                Ok(())
            }
        }
    }

    fn get(&mut self, index: usize, name: &str) -> Result<(), Error> {
        if self.contract_params.contains(name) {
            self.frame.push(Slot::Value);
            self.out.push(FinalOperation::PushParameter {
                name: name.to_string(),
            });
            return Ok(());
        }

        let target = Slot::Named(name.to_string());
        let Some(depth) = self.frame.iter().rev().position(|s| *s == target) else {
            return Err(Error::bug(format!("no stack slot for {name}")));
        };

        let top = self.frame.len() - 1;
        if self.frame[top - depth + 1..].contains(&Slot::Args) {
            return Err(Error::bug(format!(
                "read of {name} across an unexpanded argument region"
            )));
        }

        if self.has_later_use(index, name) {
            self.out.push(FinalOperation::Pick { depth });
        } else {
            self.out.push(FinalOperation::Roll { depth });
            self.frame.remove(top - depth);
        }
        self.frame.push(Slot::Value);
        Ok(())
    }

    /// Whether `name` is read again in its live range: the rest of
    /// the enclosing clause body, or (for the selector, which is read
    /// only between clauses) the rest of the stream. A read in a
    /// sibling branch keeps the slot alive here; the leftover is
    /// discarded at `EndClause`.
    fn has_later_use(&self, index: usize, name: &str) -> bool {
        for op in &self.ops[index + 1..] {
            match op {
                Operation::EndClause if self.in_clause => return false,
                Operation::Get { name: later } if later == name => return true,
                _ => {}
            }
        }
        false
    }

    fn pop_value(&mut self, context: &str) -> Result<(), Error> {
        match self.frame.pop() {
            Some(Slot::Value) => Ok(()),
            other => Err(Error::bug(format!(
                "{context} consumed a non-value stack slot: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LiteralType, Parameter};

    fn begin_contract(parameters: Vec<Parameter>, selector: Option<&str>) -> Operation {
        Operation::BeginContract {
            parameters,
            selector: selector.map(str::to_string),
        }
    }

    fn begin_clause(name: &str, parameters: Vec<Parameter>) -> Operation {
        Operation::BeginClause {
            name: name.to_string(),
            parameters,
        }
    }

    fn get(name: &str) -> Operation {
        Operation::Get {
            name: name.to_string(),
        }
    }

    fn instruction(name: &str, arity: usize) -> Operation {
        Operation::Instruction {
            name: name.to_string(),
            arity,
        }
    }

    #[test]
    fn single_use_clause_parameter_rolls() {
        let ops = vec![
            begin_contract(
                vec![
                    Parameter::new("pubKey", Type::PublicKey),
                    Parameter::new("val", Type::Value),
                ],
                None,
            ),
            begin_clause("spend", vec![Parameter::new("sig", Type::Signature)]),
            get("sig"),
            get("pubKey"),
            instruction("checkSig", 2),
            Operation::EndClause,
        ];

        let resolved = resolve_stack(&ops).unwrap();
        assert_eq!(
            resolved,
            vec![
                FinalOperation::Roll { depth: 0 },
                FinalOperation::PushParameter {
                    name: "pubKey".to_string()
                },
                FinalOperation::Instruction {
                    name: "checkSig".to_string()
                },
            ]
        );
    }

    #[test]
    fn repeated_use_picks_then_rolls() {
        let ops = vec![
            begin_contract(vec![Parameter::new("val", Type::Value)], None),
            begin_clause("spend", vec![Parameter::new("n", Type::Integer)]),
            get("n"),
            get("n"),
            instruction("==", 2),
            Operation::EndClause,
        ];

        let resolved = resolve_stack(&ops).unwrap();
        assert_eq!(
            resolved,
            vec![
                FinalOperation::Pick { depth: 0 },
                FinalOperation::Roll { depth: 1 },
                FinalOperation::Instruction {
                    name: "==".to_string()
                },
            ]
        );
    }

    #[test]
    fn deeper_parameter_resolves_with_offset() {
        // two clause parameters; the first declared sits deeper
        let ops = vec![
            begin_contract(vec![Parameter::new("val", Type::Value)], None),
            begin_clause(
                "spend",
                vec![
                    Parameter::new("a", Type::Integer),
                    Parameter::new("b", Type::Integer),
                ],
            ),
            get("a"),
            get("b"),
            instruction("==", 2),
            Operation::EndClause,
        ];

        let resolved = resolve_stack(&ops).unwrap();
        assert_eq!(
            resolved,
            vec![
                FinalOperation::Roll { depth: 1 },
                FinalOperation::Roll { depth: 1 },
                FinalOperation::Instruction {
                    name: "==".to_string()
                },
            ]
        );
    }

    #[test]
    fn two_way_selection_consumes_the_selector() {
        // the selector's only read is the condition itself, so it is
        // rolled off before the branch and nothing is left to drop
        let ops = vec![
            begin_contract(vec![Parameter::new("val", Type::Value)], Some("a/b")),
            get("a/b"),
            Operation::BeginIf,
            begin_clause("b", vec![]),
            Operation::Push {
                literal_type: LiteralType::Boolean,
                value: "true".to_string(),
            },
            Operation::EndClause,
            Operation::Else,
            begin_clause("a", vec![]),
            Operation::Push {
                literal_type: LiteralType::Boolean,
                value: "true".to_string(),
            },
            Operation::EndClause,
            Operation::EndIf,
        ];

        let resolved = resolve_stack(&ops).unwrap();
        assert_eq!(
            resolved,
            vec![
                FinalOperation::Roll { depth: 0 },
                FinalOperation::BeginIf,
                FinalOperation::Push {
                    literal_type: LiteralType::Boolean,
                    value: "true".to_string()
                },
                FinalOperation::Else,
                FinalOperation::Push {
                    literal_type: LiteralType::Boolean,
                    value: "true".to_string()
                },
                FinalOperation::EndIf,
            ]
        );
    }

    #[test]
    fn leftover_selector_is_nipped_before_exit() {
        // three-way selection: the outer condition picks the selector
        // because the inner condition still needs it, so the branch
        // taken first must discard the leftover slot on its way out
        let push_true = || Operation::Push {
            literal_type: LiteralType::Boolean,
            value: "true".to_string(),
        };
        let ops = vec![
            begin_contract(vec![Parameter::new("val", Type::Value)], Some("a/b/c")),
            get("a/b/c"),
            Operation::Push {
                literal_type: LiteralType::Integer,
                value: "2".to_string(),
            },
            instruction("==", 2),
            Operation::BeginIf,
            begin_clause("c", vec![]),
            push_true(),
            Operation::EndClause,
            Operation::Else,
            get("a/b/c"),
            Operation::BeginIf,
            begin_clause("b", vec![]),
            push_true(),
            Operation::EndClause,
            Operation::Else,
            begin_clause("a", vec![]),
            push_true(),
            Operation::EndClause,
            Operation::EndIf,
            Operation::EndIf,
        ];

        let resolved = resolve_stack(&ops).unwrap();
        // outer read copies, inner read consumes
        assert_eq!(resolved[0], FinalOperation::Pick { depth: 0 });
        let inner = resolved
            .iter()
            .skip_while(|op| **op != FinalOperation::Else)
            .nth(1)
            .unwrap();
        assert_eq!(inner, &FinalOperation::Roll { depth: 0 });
        // the selected branch nips the selector it never consumed
        let if_branch: Vec<&FinalOperation> = resolved
            .iter()
            .skip_while(|op| **op != FinalOperation::BeginIf)
            .take_while(|op| **op != FinalOperation::Else)
            .collect();
        assert!(if_branch.contains(&&FinalOperation::Roll { depth: 1 }));
        assert!(if_branch.contains(&&FinalOperation::Drop));
    }

    #[test]
    fn value_parameter_read_is_an_internal_error() {
        let ops = vec![
            begin_contract(vec![Parameter::new("val", Type::Value)], None),
            begin_clause("spend", vec![]),
            get("val"),
            Operation::EndClause,
        ];

        let err = resolve_stack(&ops).unwrap_err();
        assert!(err.to_string().contains("BugError"), "{err}");
    }
}
