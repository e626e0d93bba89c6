// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of the ivy-compiler project.

//! End-to-end compilation of representative contracts, pinned
//! against the exact instruction streams the VM expects.

use ivy_compiler::ast::{Clause, Expression, Parameter, RawContract, Statement};
use ivy_compiler::types::{HashFunction, Type};
use ivy_compiler::{compile, logging, Template};

fn compiled(contract: RawContract) -> Template {
    logging::init_with_level(None);
    let source = format!("contract {}", contract.name);
    compile(contract, &source).expect("contract should compile")
}

fn lock_with_public_key() -> RawContract {
    RawContract::new(
        "LockWithPublicKey",
        vec![
            Parameter::new("pubKey", Type::PublicKey),
            Parameter::new("val", Type::Value),
        ],
        vec![Clause::new(
            "spend",
            vec![Parameter::new("sig", Type::Signature)],
            vec![
                Statement::assertion(Expression::instruction(
                    "checkSig",
                    vec![Expression::variable("pubKey"), Expression::variable("sig")],
                )),
                Statement::unlock("val"),
            ],
        )],
    )
}

#[test]
fn single_signature_lock() {
    let template = compiled(lock_with_public_key());
    assert_eq!(template.instructions, vec!["PUSH(pubKey)", "CHECKSIG"]);
    assert_eq!(template.clause_names, vec!["spend"]);
    assert_eq!(template.params.len(), 2);
    assert_eq!(template.clauses[0].parameters[0].name, "sig");
}

#[test]
fn transfer_with_timeout() {
    let template = compiled(RawContract::new(
        "TransferWithTimeout",
        vec![
            Parameter::new("sender", Type::PublicKey),
            Parameter::new("recipient", Type::PublicKey),
            Parameter::new("timeout", Type::Time),
            Parameter::new("val", Type::Value),
        ],
        vec![
            Clause::new(
                "transfer",
                vec![
                    Parameter::new("senderSig", Type::Signature),
                    Parameter::new("recipientSig", Type::Signature),
                ],
                vec![
                    Statement::assertion(Expression::instruction(
                        "checkSig",
                        vec![
                            Expression::variable("sender"),
                            Expression::variable("senderSig"),
                        ],
                    )),
                    Statement::assertion(Expression::instruction(
                        "checkSig",
                        vec![
                            Expression::variable("recipient"),
                            Expression::variable("recipientSig"),
                        ],
                    )),
                    Statement::unlock("val"),
                ],
            ),
            Clause::new(
                "timeout",
                vec![Parameter::new("senderSig", Type::Signature)],
                vec![
                    Statement::assertion(Expression::instruction(
                        "after",
                        vec![Expression::variable("timeout")],
                    )),
                    Statement::assertion(Expression::instruction(
                        "checkSig",
                        vec![
                            Expression::variable("sender"),
                            Expression::variable("senderSig"),
                        ],
                    )),
                    Statement::unlock("val"),
                ],
            ),
        ],
    ));

    // last declared clause sits in the IF branch; the first clause's
    // two-signature check fuses its first CHECKSIG with the VERIFY
    assert_eq!(
        template.instructions,
        vec![
            "IF",
            "PUSH(timeout)",
            "CHECKLOCKTIMEVERIFY",
            "DROP",
            "PUSH(sender)",
            "CHECKSIG",
            "ELSE",
            "SWAP",
            "PUSH(sender)",
            "CHECKSIGVERIFY",
            "PUSH(recipient)",
            "CHECKSIG",
            "ENDIF",
        ]
    );
    assert_eq!(template.clause_names, vec!["transfer", "timeout"]);
}

#[test]
fn two_of_three_multisig() {
    let template = compiled(RawContract::new(
        "LockWithMultisig",
        vec![
            Parameter::new("pk1", Type::PublicKey),
            Parameter::new("pk2", Type::PublicKey),
            Parameter::new("pk3", Type::PublicKey),
            Parameter::new("val", Type::Value),
        ],
        vec![Clause::new(
            "spend",
            vec![
                Parameter::new("sig1", Type::Signature),
                Parameter::new("sig2", Type::Signature),
            ],
            vec![
                Statement::assertion(Expression::instruction(
                    "checkMultiSig",
                    vec![
                        Expression::list(vec![
                            Expression::variable("pk1"),
                            Expression::variable("pk2"),
                            Expression::variable("pk3"),
                        ]),
                        Expression::list(vec![
                            Expression::variable("sig1"),
                            Expression::variable("sig2"),
                        ]),
                    ],
                )),
                Statement::unlock("val"),
            ],
        )],
    ));

    // the dummy zero rides under the reordered witness signatures
    assert_eq!(
        template.instructions,
        vec![
            "0",
            "SWAP",
            "ROT",
            "2",
            "PUSH(pk3)",
            "PUSH(pk2)",
            "PUSH(pk1)",
            "3",
            "CHECKMULTISIG",
        ]
    );
}

#[test]
fn sha256_hashlock() {
    let template = compiled(RawContract::new(
        "LockWithSha256Hash",
        vec![
            Parameter::new("h", Type::hash(HashFunction::Sha256, Type::Bytes)),
            Parameter::new("val", Type::Value),
        ],
        vec![Clause::new(
            "spend",
            vec![Parameter::new("preimage", Type::Bytes)],
            vec![
                Statement::assertion(Expression::instruction(
                    "==",
                    vec![
                        Expression::instruction(
                            "sha256",
                            vec![Expression::variable("preimage")],
                        ),
                        Expression::variable("h"),
                    ],
                )),
                Statement::unlock("val"),
            ],
        )],
    ));

    assert_eq!(
        template.instructions,
        vec!["PUSH(h)", "SWAP", "SHA256", "EQUAL"]
    );
}

#[test]
fn template_carries_source_and_stable_fingerprint() {
    let a = compiled(lock_with_public_key());
    let b = compiled(lock_with_public_key());

    assert_eq!(a.source, "contract LockWithPublicKey");
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.fingerprint.len(), 64); // blake3, hex encoded

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["type"], "template");
    assert_eq!(json["name"], "LockWithPublicKey");
    assert_eq!(json["params"][0]["itemType"], "PublicKey");
}
