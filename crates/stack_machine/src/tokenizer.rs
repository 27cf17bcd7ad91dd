// Single pass scanner turning assembly text into the instruction stream.
//
// Grammar, in the order the scanner tries things:
//   whitespace                 skipped
//   // ... \n                  line comment
//   /* ... */                  block comment, nests
//   : name                     label declaration, first on its line
//   psh|dupl|sum|...           mnemonic, operand bearing ones absorb the
//                              following number or label name
//   name                       identifier (jump target)
//   123                        decimal number

use alloc::vec::Vec;
use core::str::Chars;
use thiserror_no_std::Error;

use crate::resolver::{resolve, Resolved};
use crate::{Instruction, Kind, Name, Span, Word, UNRESOLVED};

/// Forward keyword table, the reverse lives in [`Kind::mnemonic`].
const KEYWORDS: [(&str, Kind); 9] = [
    ("psh", Kind::Push),
    ("dupl", Kind::Duplicate),
    ("sum", Kind::Sum),
    ("sub", Kind::Subtract),
    ("mul", Kind::Multiply),
    ("div", Kind::Divide),
    ("jmp", Kind::Jump),
    ("jif", Kind::JumpIfTrue),
    ("eq", Kind::Equal),
];

pub fn keyword(text: &str) -> Option<Kind> {
    KEYWORDS
        .iter()
        .find(|(mnemonic, _)| *mnemonic == text)
        .map(|(_, kind)| *kind)
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("block comment is never closed")]
    UnterminatedBlockComment,
    #[error("label declaration has no name")]
    MissingLabelName,
    #[error("label declaration must start its line")]
    LabelNotAtLineStart,
    #[error("a mnemonic can not be used as a label name")]
    KeywordAsLabel,
    #[error("{0} expects an operand")]
    MissingOperand(Kind),
    #[error("number runs into an identifier")]
    MalformedNumber,
    #[error("number does not fit in a word")]
    NumberTooLarge,
    #[error("identifier is longer than the name capacity")]
    NameTooLong,
    #[error("source position overflowed")]
    PositionOverflow,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at {line}:{column}")]
pub struct LexError {
    kind: LexErrorKind,
    line: u32,
    column: u32,
}

impl LexError {
    fn new(kind: LexErrorKind, position: Position) -> Self {
        Self {
            kind,
            line: position.line,
            column: position.column,
        }
    }

    pub fn line_number(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn error_kind(&self) -> LexErrorKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    line: u32,
    column: u32,
}

impl Position {
    fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

fn span(start: Position, end: Position) -> Span {
    Span {
        line_start: start.line,
        column_start: start.column,
        line_end: end.line,
        column_end: end.column,
    }
}

enum Lexeme {
    Keyword(Kind),
    Identifier(Name),
    Number(Word),
    Label(Name),
    End,
}

struct Token {
    lexeme: Lexeme,
    start: Position,
    end: Position,
}

/// Tokenize the whole source. The result always ends with exactly one
/// `EndOfStream` and identifiers are left unresolved.
pub fn tokenize(source: &str) -> Result<Vec<Instruction>, LexError> {
    let mut tokenizer = Tokenizer::new(source);
    let mut instructions = Vec::new();
    loop {
        let instruction = tokenizer.next_instruction()?;
        let done = instruction.kind == Kind::EndOfStream;
        instructions.push(instruction);
        if done {
            break;
        }
    }
    debug_assert_eq!(
        instructions
            .iter()
            .filter(|instruction| instruction.kind == Kind::EndOfStream)
            .count(),
        1
    );
    tracing::debug!(count = instructions.len(), "tokenized source");
    Ok(instructions)
}

/// Tokenize and resolve labels in one go.
pub fn assemble(source: &str) -> Result<Resolved, LexError> {
    Ok(resolve(tokenize(source)?))
}

pub struct Tokenizer<'a> {
    chars: Chars<'a>,
    position: Position,
    // Line the previous token ended on.
    last_token_line: Option<u32>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
            position: Position::start(),
            last_token_line: None,
        }
    }

    /// Next instruction with its operand folded in. Returns `EndOfStream`
    /// once the input is exhausted, and keeps returning it after that.
    pub fn next_instruction(&mut self) -> Result<Instruction, LexError> {
        let token = self.next_token()?;
        let instruction = match token.lexeme {
            Lexeme::Keyword(kind) if kind.requires_operand() => {
                let operand = self.next_token()?;
                let folded = match operand.lexeme {
                    Lexeme::Number(value) => Instruction::new(kind, value),
                    Lexeme::Identifier(name) if kind.takes_label() => {
                        Instruction::with_name(kind, UNRESOLVED, name)
                    }
                    _ => {
                        return Err(LexError::new(
                            LexErrorKind::MissingOperand(kind),
                            token.start,
                        ));
                    }
                };
                folded.at(span(token.start, operand.end))
            }
            Lexeme::Keyword(kind) => Instruction::new(kind, 0).at(span(token.start, token.end)),
            Lexeme::Identifier(name) => Instruction::with_name(Kind::Identifier, UNRESOLVED, name)
                .at(span(token.start, token.end)),
            Lexeme::Number(value) => {
                Instruction::new(Kind::Number, value).at(span(token.start, token.end))
            }
            Lexeme::Label(name) => {
                Instruction::with_name(Kind::Label, 0, name).at(span(token.start, token.end))
            }
            Lexeme::End => Instruction::end().at(span(token.start, token.end)),
        };
        Ok(instruction)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.position;
        let Some(c) = self.peek() else {
            return Ok(Token {
                lexeme: Lexeme::End,
                start,
                end: start,
            });
        };

        let lexeme = if c == ':' {
            if self.last_token_line == Some(start.line) {
                return Err(LexError::new(LexErrorKind::LabelNotAtLineStart, start));
            }
            self.bump()?;
            while matches!(self.peek(), Some(' ') | Some('\t')) {
                self.bump()?;
            }
            match self.peek() {
                Some(c) if is_identifier_start(c) => {}
                _ => return Err(LexError::new(LexErrorKind::MissingLabelName, self.position)),
            }
            let name_start = self.position;
            let name = self.read_identifier()?;
            if keyword(&name).is_some() {
                return Err(LexError::new(LexErrorKind::KeywordAsLabel, name_start));
            }
            Lexeme::Label(name)
        } else if is_identifier_start(c) {
            let name = self.read_identifier()?;
            match keyword(&name) {
                Some(kind) => Lexeme::Keyword(kind),
                None => Lexeme::Identifier(name),
            }
        } else if c.is_ascii_digit() {
            Lexeme::Number(self.read_number()?)
        } else {
            return Err(LexError::new(LexErrorKind::UnexpectedCharacter(c), start));
        };

        self.last_token_line = Some(self.position.line);
        Ok(Token {
            lexeme,
            start,
            end: self.position,
        })
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump()?;
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump()? {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let opened_at = self.position;
        self.bump()?;
        self.bump()?;
        let mut depth: u32 = 1;
        loop {
            match (self.peek(), self.peek_second()) {
                (None, _) => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedBlockComment,
                        opened_at,
                    ));
                }
                (Some('/'), Some('*')) => {
                    self.bump()?;
                    self.bump()?;
                    depth = depth.saturating_add(1);
                }
                (Some('*'), Some('/')) => {
                    self.bump()?;
                    self.bump()?;
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {
                    self.bump()?;
                }
            }
        }
    }

    fn read_identifier(&mut self) -> Result<Name, LexError> {
        let start = self.position;
        let mut name = Name::new();
        while let Some(c) = self.peek() {
            if !is_identifier_part(c) {
                break;
            }
            name.push(c)
                .map_err(|_| LexError::new(LexErrorKind::NameTooLong, start))?;
            self.bump()?;
        }
        debug_assert!(!name.is_empty());
        Ok(name)
    }

    fn read_number(&mut self) -> Result<Word, LexError> {
        let start = self.position;
        let mut value: Word = 0;
        while let Some(c) = self.peek() {
            let Some(digit) = c.to_digit(10) else {
                break;
            };
            value = value
                .checked_mul(10)
                .and_then(|value| value.checked_add(Word::from(digit)))
                .ok_or(LexError::new(LexErrorKind::NumberTooLarge, start))?;
            self.bump()?;
        }
        if let Some(c) = self.peek() {
            if is_identifier_part(c) {
                return Err(LexError::new(LexErrorKind::MalformedNumber, start));
            }
        }
        Ok(value)
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Result<Option<char>, LexError> {
        let Some(c) = self.chars.next() else {
            return Ok(None);
        };
        let overflow = LexError::new(LexErrorKind::PositionOverflow, self.position);
        if c == '\n' {
            self.position.line = self.position.line.checked_add(1).ok_or(overflow)?;
            self.position.column = 1;
        } else {
            self.position.column = self.position.column.checked_add(1).ok_or(overflow)?;
        }
        Ok(Some(c))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod test;
