use super::*;
use crate::{hash_name, NAME_CAP};

extern crate std;
use std::format;
use std::vec::Vec as StdVec;

fn kinds(source: &str) -> Result<StdVec<Kind>, LexError> {
    Ok(tokenize(source)?
        .iter()
        .map(|instruction| instruction.kind)
        .collect())
}

fn error_at(source: &str) -> (LexErrorKind, u32, u32) {
    let err = tokenize(source).unwrap_err();
    (err.error_kind(), err.line_number(), err.column())
}

#[test]
fn whitespace_only_yields_single_end() -> Result<(), LexError> {
    let tokens = tokenize("   ")?;
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, Kind::EndOfStream);
    assert_eq!(tokenize("")?.len(), 1);
    assert_eq!(tokenize("\n\t\r\n")?.len(), 1);
    Ok(())
}

#[test]
fn recognizes_every_mnemonic() -> Result<(), LexError> {
    assert_eq!(
        kinds("psh 1 dupl 0 sum sub mul div jmp 2 jif 3 eq")?,
        [
            Kind::Push,
            Kind::Duplicate,
            Kind::Sum,
            Kind::Subtract,
            Kind::Multiply,
            Kind::Divide,
            Kind::Jump,
            Kind::JumpIfTrue,
            Kind::Equal,
            Kind::EndOfStream,
        ]
    );
    for kind in Kind::ALL {
        if let Some(mnemonic) = kind.mnemonic() {
            assert_eq!(keyword(mnemonic), Some(kind));
        }
    }
    assert_eq!(keyword("PSH"), None);
    Ok(())
}

#[test]
fn operand_is_folded_into_the_instruction() -> Result<(), LexError> {
    let tokens = tokenize("psh 42\n")?;
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, Kind::Push);
    assert_eq!(tokens[0].operand, 42);
    assert_eq!(
        tokens[0].span,
        Span {
            line_start: 1,
            column_start: 1,
            line_end: 1,
            column_end: 7
        }
    );
    Ok(())
}

#[test]
fn operand_may_sit_on_the_next_line() -> Result<(), LexError> {
    let tokens = tokenize("psh\n  7")?;
    assert_eq!(tokens[0].operand, 7);
    assert_eq!(
        tokens[0].span,
        Span {
            line_start: 1,
            column_start: 1,
            line_end: 2,
            column_end: 4
        }
    );
    Ok(())
}

#[test]
fn label_then_jump_resolves_to_label_index() -> Result<(), LexError> {
    let tokens = tokenize(": loop\n jmp loop")?;
    assert_eq!(tokens[0].kind, Kind::Label);
    assert_eq!(tokens[0].name(), Some("loop"));
    assert_eq!(tokens[1].kind, Kind::Jump);
    assert_eq!(tokens[1].operand, UNRESOLVED);
    assert_eq!(tokens[1].hash, hash_name("loop"));

    let resolved = assemble(": loop\n jmp loop")?;
    assert!(resolved.is_clean());
    assert_eq!(resolved.program.get(1).map(|i| i.operand), Some(0));
    Ok(())
}

#[test]
fn undefined_label_is_a_diagnostic_not_an_error() -> Result<(), LexError> {
    let resolved = assemble("jmp undefined_label")?;
    assert_eq!(resolved.program.len(), 2);
    assert_eq!(resolved.program.get(0).map(|i| i.operand), Some(UNRESOLVED));
    assert_eq!(resolved.unresolved.len(), 1);
    assert_eq!(resolved.unresolved[0].name.as_str(), "undefined_label");
    assert_eq!(resolved.unresolved[0].index, 0);
    Ok(())
}

#[test]
fn stray_numbers_and_identifiers_stay_in_the_stream() -> Result<(), LexError> {
    let tokens = tokenize("sum 3 foo")?;
    assert_eq!(
        tokens.iter().map(|i| i.kind).collect::<StdVec<_>>(),
        [Kind::Sum, Kind::Number, Kind::Identifier, Kind::EndOfStream]
    );
    assert_eq!(tokens[1].operand, 3);
    assert_eq!(tokens[2].name(), Some("foo"));
    assert_eq!(tokens[2].hash, hash_name("foo"));
    assert_eq!(tokens[2].operand, UNRESOLVED);
    Ok(())
}

#[test]
fn comments_are_skipped_and_nest() -> Result<(), LexError> {
    let tokens = tokenize("// header\npsh 1 /* a /* nested */ still comment */ psh 2 // tail")?;
    assert_eq!(
        tokens.iter().map(|i| (i.kind, i.operand)).collect::<StdVec<_>>(),
        [(Kind::Push, 1), (Kind::Push, 2), (Kind::EndOfStream, 0)]
    );
    assert_eq!(tokens[1].span.line_start, 2);
    Ok(())
}

#[test]
fn identifiers_may_contain_digits_and_underscores() -> Result<(), LexError> {
    let tokens = tokenize(":_loop_2\njif _loop_2")?;
    assert_eq!(tokens[0].name(), Some("_loop_2"));
    assert_eq!(tokens[1].name(), Some("_loop_2"));
    Ok(())
}

#[test]
fn unterminated_block_comment_reports_opening() {
    assert_eq!(
        error_at("psh 1 /* open /* */"),
        (LexErrorKind::UnterminatedBlockComment, 1, 7)
    );
}

#[test]
fn lone_slash_is_unexpected() {
    assert_eq!(
        error_at("psh 1\n / 2"),
        (LexErrorKind::UnexpectedCharacter('/'), 2, 2)
    );
    assert_eq!(error_at("@"), (LexErrorKind::UnexpectedCharacter('@'), 1, 1));
    assert_eq!(error_at("psh -1"), (LexErrorKind::UnexpectedCharacter('-'), 1, 5));
}

#[test]
fn missing_operand_points_at_mnemonic() {
    assert_eq!(error_at("  psh"), (LexErrorKind::MissingOperand(Kind::Push), 1, 3));
    assert_eq!(
        error_at("dupl sum"),
        (LexErrorKind::MissingOperand(Kind::Duplicate), 1, 1)
    );
    // Only jumps take a label name.
    assert_eq!(
        error_at("psh loop"),
        (LexErrorKind::MissingOperand(Kind::Push), 1, 1)
    );
}

#[test]
fn number_errors() {
    assert_eq!(
        error_at("psh 99999999999999999999"),
        (LexErrorKind::NumberTooLarge, 1, 5)
    );
    assert_eq!(error_at("psh 12ab"), (LexErrorKind::MalformedNumber, 1, 5));
}

#[test]
fn largest_word_is_accepted() -> Result<(), LexError> {
    let tokens = tokenize("psh 9223372036854775807")?;
    assert_eq!(tokens[0].operand, Word::MAX);
    Ok(())
}

#[test]
fn label_errors() {
    assert_eq!(error_at(":"), (LexErrorKind::MissingLabelName, 1, 2));
    assert_eq!(error_at(":   9"), (LexErrorKind::MissingLabelName, 1, 5));
    assert_eq!(error_at(": psh"), (LexErrorKind::KeywordAsLabel, 1, 3));
}

#[test]
fn label_must_start_its_line() -> Result<(), LexError> {
    assert_eq!(error_at("psh 1 :x"), (LexErrorKind::LabelNotAtLineStart, 1, 7));
    assert_eq!(error_at(":a :b"), (LexErrorKind::LabelNotAtLineStart, 1, 4));
    assert_eq!(
        error_at("jmp\n:x"),
        (LexErrorKind::MissingOperand(Kind::Jump), 1, 1)
    );

    // Leading whitespace and comments do not count as tokens.
    let tokens = tokenize("psh 1\n  /* note */ :x\n\t:y")?;
    assert_eq!(
        tokens.iter().map(|i| i.kind).collect::<StdVec<_>>(),
        [Kind::Push, Kind::Label, Kind::Label, Kind::EndOfStream]
    );
    Ok(())
}

#[test]
fn long_names_are_rejected() {
    let source = format!("jmp {}", "a".repeat(NAME_CAP + 1));
    assert_eq!(error_at(&source), (LexErrorKind::NameTooLong, 1, 5));

    let source = format!(":{}", "a".repeat(NAME_CAP));
    assert!(tokenize(&source).is_ok());
}

#[test]
fn error_message_includes_position() {
    let err = tokenize("\n\n  psh").unwrap_err();
    assert_eq!(format!("{err}"), "Push expects an operand at 3:3");
}

#[test]
fn exhausted_tokenizer_keeps_returning_end() -> Result<(), LexError> {
    let mut tokenizer = Tokenizer::new("eq");
    assert_eq!(tokenizer.next_instruction()?.kind, Kind::Equal);
    assert_eq!(tokenizer.next_instruction()?.kind, Kind::EndOfStream);
    assert_eq!(tokenizer.next_instruction()?.kind, Kind::EndOfStream);
    Ok(())
}
