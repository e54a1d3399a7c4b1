//! IR line reader
//!
//! Each line holds any number of `label:` definitions followed by at most
//! one statement: a node keyword or a command keyword with its arguments.

use crate::arena::{ArgRef, ArgStore, Argument, NamePool, NAME_MAX};
use c6t_common::{
    is_float_keyword, CommandKind, CompileResult, CompilerError, Opcode, SourceLocation,
    NULL_KEYWORD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'s> {
    Ident(&'s str),
    Number(u16),
    Colon,
    Comma,
    Plus,
    Minus,
}

/// What follows the labels on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrStatement {
    /// A node keyword; `None` is `NULL`
    Node {
        opcode: Option<Opcode>,
        args: Option<ArgRef>,
    },
    Command {
        command: CommandKind,
        args: Option<ArgRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrLine {
    pub labels: Vec<String>,
    pub statement: Option<IrStatement>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '~')
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn tokenize<'s>(text: &'s str, location: &SourceLocation) -> CompileResult<Vec<Token<'s>>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            ';' => break,
            ':' | ',' | '+' | '-' => {
                chars.next();
                tokens.push(match c {
                    ':' => Token::Colon,
                    ',' => Token::Comma,
                    '+' => Token::Plus,
                    _ => Token::Minus,
                });
            }
            c if c.is_ascii_digit() => {
                let mut value: u32 = 0;
                while let Some(&(_, d)) = chars.peek() {
                    let Some(digit) = d.to_digit(10) else { break };
                    value = value * 10 + digit;
                    if value > u32::from(u16::MAX) {
                        return Err(CompilerError::parse_error(
                            "number out of range",
                            location.clone(),
                        ));
                    }
                    chars.next();
                }
                // Range checked above
                tokens.push(Token::Number(value as u16));
            }
            c if is_ident_start(c) => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if !is_ident_char(d) {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(&text[start..end]));
            }
            other => {
                return Err(CompilerError::parse_error(
                    format!("unexpected character '{other}'"),
                    location.clone(),
                ));
            }
        }
    }
    Ok(tokens)
}

/// Names are significant to their first 16 characters
fn truncate(name: &str) -> &str {
    &name[..name.len().min(NAME_MAX)]
}

fn word(value: u16) -> i16 {
    value as i16
}

/// Reads one line's labels, statement and arguments
struct LineParser<'s, 'a> {
    tokens: Vec<Token<'s>>,
    pos: usize,
    location: &'a SourceLocation,
    args: &'a mut ArgStore,
    names: &'a mut NamePool,
}

impl<'s, 'a> LineParser<'s, 'a> {
    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<Token<'s>> {
        self.tokens.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<Token<'s>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::parse_error(message, self.location.clone())
    }

    fn parse(mut self) -> CompileResult<IrLine> {
        let mut line = IrLine::default();
        while let (Some(Token::Ident(label)), Some(Token::Colon)) = (self.peek(), self.peek_at(1)) {
            line.labels.push(truncate(label).to_string());
            self.pos += 2;
        }

        let keyword = match self.bump() {
            None => return Ok(line),
            Some(Token::Ident(keyword)) => keyword,
            Some(_) => return Err(self.error("expected a keyword")),
        };

        if is_float_keyword(keyword) {
            return Err(CompilerError::Unsupported {
                what: format!("floating point ({})", keyword.to_ascii_uppercase()),
            });
        }

        let statement = if let Some(command) = CommandKind::from_keyword(keyword) {
            IrStatement::Command {
                command,
                args: self.parse_args()?,
            }
        } else if keyword.eq_ignore_ascii_case(NULL_KEYWORD) {
            if self.peek().is_some() {
                return Err(self.error("NULL takes no arguments"));
            }
            IrStatement::Node {
                opcode: None,
                args: None,
            }
        } else if let Some(opcode) = Opcode::from_keyword(keyword) {
            IrStatement::Node {
                opcode: Some(opcode),
                args: self.parse_args()?,
            }
        } else {
            return Err(self.error(format!("unknown keyword '{keyword}'")));
        };

        line.statement = Some(statement);
        Ok(line)
    }

    fn parse_args(&mut self) -> CompileResult<Option<ArgRef>> {
        let mut leaves = Vec::new();
        while self.peek().is_some() {
            let arg = self.parse_arg()?;
            leaves.push(self.args.push(arg)?);
            match self.bump() {
                None => break,
                Some(Token::Comma) => {}
                Some(_) => return Err(self.error("expected ','")),
            }
        }
        self.args.push_list(&leaves)
    }

    fn parse_arg(&mut self) -> CompileResult<Argument> {
        match self.bump() {
            Some(Token::Ident(name)) => {
                let name = self.names.intern(truncate(name))?;
                match (self.peek(), self.peek_at(1)) {
                    (Some(Token::Plus), Some(Token::Number(n))) => {
                        self.pos += 2;
                        Ok(Argument::Offset(name, word(n)))
                    }
                    (Some(Token::Minus), Some(Token::Number(n))) => {
                        self.pos += 2;
                        Ok(Argument::Offset(name, word(n).wrapping_neg()))
                    }
                    _ => Ok(Argument::Name(name)),
                }
            }
            Some(Token::Number(n)) => match (self.peek(), self.peek_at(1)) {
                (Some(Token::Plus), Some(Token::Ident(name))) => {
                    self.pos += 2;
                    let name = self.names.intern(truncate(name))?;
                    Ok(Argument::Offset(name, word(n)))
                }
                (Some(Token::Minus), Some(Token::Ident(_))) => {
                    Err(self.error("cannot subtract a name"))
                }
                _ => Ok(Argument::Constant(word(n))),
            },
            Some(Token::Minus) => match self.bump() {
                Some(Token::Number(n)) => Ok(Argument::Constant(word(n).wrapping_neg())),
                _ => Err(self.error("expected a number after '-'")),
            },
            _ => Err(self.error("expected an argument")),
        }
    }
}

/// Parse one IR line, storing its arguments and names in the given pools
pub fn parse_line(
    text: &str,
    location: &SourceLocation,
    args: &mut ArgStore,
    names: &mut NamePool,
) -> CompileResult<IrLine> {
    let tokens = tokenize(text, location)?;
    LineParser {
        tokens,
        pos: 0,
        location,
        args,
        names,
    }
    .parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Pools {
        args: ArgStore,
        names: NamePool,
    }

    impl Pools {
        fn new() -> Self {
            Self {
                args: ArgStore::new(1024),
                names: NamePool::new(2304),
            }
        }

        fn parse(&mut self, text: &str) -> CompileResult<IrLine> {
            parse_line(text, &SourceLocation::new("t.ir", 1), &mut self.args, &mut self.names)
        }

        fn leaves(&self, args: Option<ArgRef>) -> Vec<String> {
            self.args
                .leaves(args)
                .iter()
                .map(|a| match *a {
                    Argument::Constant(c) => c.to_string(),
                    Argument::Name(n) => self.names.resolve(n).to_string(),
                    Argument::Offset(n, c) => format!("{}{:+}", self.names.resolve(n), c),
                    Argument::List(..) => "list".to_string(),
                })
                .collect()
        }
    }

    fn command_args(line: &IrLine) -> Option<ArgRef> {
        match line.statement {
            Some(IrStatement::Command { args, .. }) | Some(IrStatement::Node { args, .. }) => args,
            None => None,
        }
    }

    #[test]
    fn test_labels_and_command() {
        let mut pools = Pools::new();
        let line = pools.parse("L1: L2:\tjmp L3 ; comment").unwrap();
        assert_eq!(line.labels, vec!["L1", "L2"]);
        assert!(matches!(
            line.statement,
            Some(IrStatement::Command {
                command: CommandKind::Jmp,
                ..
            })
        ));
        assert_eq!(pools.leaves(command_args(&line)), vec!["L3"]);
    }

    #[test]
    fn test_blank_and_label_only_lines() {
        let mut pools = Pools::new();
        assert_eq!(pools.parse("   ; nothing").unwrap(), IrLine::default());
        let line = pools.parse("_main:").unwrap();
        assert_eq!(line.labels, vec!["_main"]);
        assert_eq!(line.statement, None);
    }

    #[test]
    fn test_argument_forms() {
        let mut pools = Pools::new();
        let line = pools.parse("WORD _a, 12, _b+4, _c-2, 6+_d, -3,").unwrap();
        assert_eq!(
            pools.leaves(command_args(&line)),
            vec!["_a", "12", "_b+4", "_c-2", "_d+6", "-3"]
        );
    }

    #[test]
    fn test_numbers_wrap_to_words() {
        let mut pools = Pools::new();
        let line = pools.parse("CON 65535").unwrap();
        assert_eq!(pools.leaves(command_args(&line)), vec!["-1"]);

        let err = pools.parse("CON 65536").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at t.ir:1: number out of range");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let mut pools = Pools::new();
        let line = pools.parse("add").unwrap();
        assert_eq!(
            line.statement,
            Some(IrStatement::Node {
                opcode: Some(Opcode::Add),
                args: None
            })
        );
        let line = pools.parse("Null").unwrap();
        assert_eq!(
            line.statement,
            Some(IrStatement::Node {
                opcode: None,
                args: None
            })
        );
    }

    #[test]
    fn test_names_are_truncated() {
        let mut pools = Pools::new();
        let line = pools.parse("JMP abcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(pools.leaves(command_args(&line)), vec!["abcdefghijklmnop"]);
    }

    #[test]
    fn test_rejections() {
        let mut pools = Pools::new();
        let err = pools.parse("WORD 4-_x").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at t.ir:1: cannot subtract a name");

        let err = pools.parse("FRET").unwrap_err();
        assert!(matches!(err, CompilerError::Unsupported { .. }));

        let err = pools.parse("FROB 1").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at t.ir:1: unknown keyword 'FROB'");

        let err = pools.parse("WORD 1 2").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at t.ir:1: expected ','");

        assert!(pools.parse("CON 3 # 4").is_err());
    }
}
