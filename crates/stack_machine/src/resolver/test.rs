use super::*;
use crate::hash_name;
use crate::tokenizer::tokenize;

extern crate std;
use std::vec::Vec as StdVec;

fn operands(resolved: &Resolved) -> StdVec<Word> {
    resolved.program.iter().map(|i| i.operand).collect()
}

#[test]
fn forward_and_backward_references() {
    let resolved = resolve(tokenize(":top\njmp bottom\n:bottom\njif top").unwrap());
    assert!(resolved.is_clean());
    assert_eq!(operands(&resolved), [0, 2, 0, 0, 0]);
}

#[test]
fn redeclared_label_last_wins() {
    let resolved = resolve(tokenize(":x\n:x\njmp x").unwrap());
    assert!(resolved.is_clean());
    assert_eq!(resolved.program.get(2).map(|i| i.operand), Some(1));
}

#[test]
fn bare_identifiers_are_resolved_too() {
    let resolved = resolve(tokenize("target\n:target").unwrap());
    assert_eq!(resolved.program.get(0).map(|i| i.kind), Some(Kind::Identifier));
    assert_eq!(resolved.program.get(0).map(|i| i.operand), Some(1));
}

#[test]
fn unresolved_references_are_collected() {
    let tokens = tokenize("psh 1\njmp nowhere\n:here\njif elsewhere").unwrap();
    let count = tokens.len();
    let resolved = resolve(tokens);

    assert_eq!(resolved.program.len(), count);
    assert_eq!(operands(&resolved), [1, UNRESOLVED, 0, UNRESOLVED, 0]);

    let missing: StdVec<(&str, usize, u32)> = resolved
        .unresolved
        .iter()
        .map(|label| (label.name.as_str(), label.index, label.span.line_start))
        .collect();
    assert_eq!(missing, [("nowhere", 1, 2), ("elsewhere", 3, 4)]);
}

#[test]
fn numeric_jumps_are_left_alone() {
    let resolved = resolve(tokenize("jmp 7\njif 3").unwrap());
    assert!(resolved.is_clean());
    assert_eq!(operands(&resolved), [7, 3, 0]);
}

#[test]
fn resolving_twice_is_stable() {
    let once = resolve(tokenize(":a\njmp a\njmp b").unwrap());
    let twice = resolve(once.program.clone().into_instructions());
    assert_eq!(once.program, twice.program);
    assert_eq!(once.unresolved, twice.unresolved);
}

#[test]
fn colliding_hashes_share_a_bucket() {
    let mut table = LabelTable::collect(&[]);
    let a = Name::try_from("a").unwrap();
    let b = Name::try_from("b").unwrap();
    table.declare(7, &a, 0);
    table.declare(7, &b, 4);
    table.declare(7, &a, 2);

    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup(7, "a"), Some(2));
    assert_eq!(table.lookup(7, "b"), Some(4));
    assert_eq!(table.lookup(7, "c"), None);
    assert_eq!(table.lookup(hash_name("a"), "a"), None);
}
