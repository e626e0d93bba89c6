// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! Peephole optimizer over the literal mnemonic stream.
//!
//! Every rule is a local identity of the target VM: the window it
//! matches is exactly one emitted unit (a depth literal is always
//! adjacent to its `PICK`/`ROLL`), so rewriting never reorders work
//! across `IF`/`ELSE`/`ENDIF` or `VERIFY` boundaries. Rules are
//! applied repeatedly until a fixpoint so rewrites can cascade
//! (`1 ROLL DROP` → `SWAP DROP` → `NIP`).

use tracing::debug;

const RULES: &[(&[&str], &[&str])] = &[
    (&["0", "ROLL"], &[]),
    (&["0", "PICK"], &["DUP"]),
    (&["1", "ROLL"], &["SWAP"]),
    (&["1", "PICK"], &["OVER"]),
    (&["2", "ROLL"], &["ROT"]),
    (&["SWAP", "SWAP"], &[]),
    (&["SWAP", "DROP"], &["NIP"]),
    (&["DUP", "DROP"], &[]),
    (&["1", "VERIFY"], &[]),
    (&["EQUAL", "VERIFY"], &["EQUALVERIFY"]),
    (&["CHECKSIG", "VERIFY"], &["CHECKSIGVERIFY"]),
    (&["CHECKMULTISIG", "VERIFY"], &["CHECKMULTISIGVERIFY"]),
];

pub fn optimize(instructions: Vec<String>) -> Vec<String> {
    let before = instructions.len();
    let mut current = instructions;

    loop {
        let mut next: Vec<String> = Vec::with_capacity(current.len());
        let mut changed = false;
        let mut i = 0;

        'outer: while i < current.len() {
            for (pattern, replacement) in RULES {
                if matches_at(&current, i, pattern) {
                    next.extend(replacement.iter().map(|s| s.to_string()));
                    i += pattern.len();
                    changed = true;
                    continue 'outer;
                }
            }
            next.push(current[i].clone());
            i += 1;
        }

        current = next;
        if !changed {
            break;
        }
    }

    debug!(before, after = current.len(), "peephole pass");
    current
}

fn matches_at(instructions: &[String], at: usize, pattern: &[&str]) -> bool {
    instructions.len() >= at + pattern.len()
        && instructions[at..at + pattern.len()]
            .iter()
            .zip(pattern)
            .all(|(have, want)| have == want)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &[&str]) -> Vec<String> {
        optimize(input.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn zero_roll_disappears() {
        assert_eq!(run(&["0", "ROLL", "CHECKSIG"]), vec!["CHECKSIG"]);
    }

    #[test]
    fn shallow_references_use_dedicated_opcodes() {
        assert_eq!(run(&["0", "PICK"]), vec!["DUP"]);
        assert_eq!(run(&["1", "PICK"]), vec!["OVER"]);
        assert_eq!(run(&["1", "ROLL"]), vec!["SWAP"]);
        assert_eq!(run(&["2", "ROLL"]), vec!["ROT"]);
    }

    #[test]
    fn verify_fuses_into_combined_opcodes() {
        assert_eq!(run(&["EQUAL", "VERIFY"]), vec!["EQUALVERIFY"]);
        assert_eq!(run(&["CHECKSIG", "VERIFY"]), vec!["CHECKSIGVERIFY"]);
        assert_eq!(
            run(&["CHECKMULTISIG", "VERIFY"]),
            vec!["CHECKMULTISIGVERIFY"]
        );
    }

    #[test]
    fn rewrites_cascade_to_a_fixpoint() {
        // the clause-exit cleanup sequence collapses to a single NIP
        assert_eq!(run(&["1", "ROLL", "DROP"]), vec!["NIP"]);
        // a trivially true verify vanishes entirely
        assert_eq!(
            run(&["CHECKSEQUENCEVERIFY", "DROP", "1", "VERIFY"]),
            vec!["CHECKSEQUENCEVERIFY", "DROP"]
        );
    }

    #[test]
    fn deep_references_are_untouched() {
        assert_eq!(run(&["3", "PICK"]), vec!["3", "PICK"]);
        assert_eq!(run(&["5", "ROLL"]), vec!["5", "ROLL"]);
    }

    #[test]
    fn control_flow_markers_are_never_rewritten() {
        let input = &["IF", "DUP", "ELSE", "SWAP", "ENDIF"];
        assert_eq!(run(input), input.to_vec());
    }

    #[test]
    fn optimization_is_idempotent() {
        let once = run(&["0", "ROLL", "1", "ROLL", "DROP", "EQUAL", "VERIFY"]);
        let twice = optimize(once.clone());
        assert_eq!(once, twice);
    }
}
