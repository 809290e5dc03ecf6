//! Lexer implementation for the query parser
//!
//! 把查询文本一次性切分为 token 序列，末尾总有一个 `Eof`。

use std::iter::Peekable;
use std::str::CharIndices;

use crate::core::error::{QueryError, QueryResult};
use crate::query::parser::token::{dump_tokens, Token, TokenKind as Tk};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> QueryResult<Vec<Token>> {
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }
            if ch.is_alphabetic() || ch == '_' {
                let word = self.read_identifier(offset);
                let kind = Tk::keyword(word).unwrap_or(Tk::Identifier);
                self.tokens.push(Token::new(kind, word, offset));
                continue;
            }
            self.chars.next();
            let kind = match ch {
                '-' => {
                    if self.next_is('>') {
                        Tk::Arrow
                    } else {
                        Tk::Minus
                    }
                }
                '<' => {
                    if self.next_is('-') {
                        Tk::LeftArrow
                    } else {
                        return Err(self.error(offset, "expected '-' after '<'"));
                    }
                }
                '[' => Tk::LBracket,
                ']' => Tk::RBracket,
                '(' => Tk::LParen,
                ')' => Tk::RParen,
                ':' => Tk::Colon,
                ',' => Tk::Comma,
                '.' => Tk::Dot,
                '*' => Tk::Star,
                ';' => Tk::Semicolon,
                other => {
                    return Err(self.error(offset, &format!("unexpected character '{}'", other)));
                }
            };
            let end = self.chars.peek().map_or(self.input.len(), |&(i, _)| i);
            self.tokens
                .push(Token::new(kind, &self.input[offset..end], offset));
        }
        self.tokens.push(Token::new(Tk::Eof, "", self.input.len()));
        Ok(self.tokens)
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.chars.next_if(|&(_, ch)| ch == expected).is_some()
    }

    fn read_identifier(&mut self, start: usize) -> &'a str {
        let mut end = start;
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                end = offset + ch.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        &self.input[start..end]
    }

    fn error(&self, offset: usize, message: &str) -> QueryError {
        QueryError::Parse {
            message: format!("{} at byte {}", message, offset),
            position: self.tokens.len(),
            tokens: dump_tokens(&self.tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Tk> {
        Lexer::new(input)
            .tokenize()
            .expect("tokenize should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("select MaTcH group By"),
            vec![Tk::Select, Tk::Match, Tk::Group, Tk::By, Tk::Eof]
        );
    }

    #[test]
    fn test_edge_symbols() {
        assert_eq!(
            kinds("(a)-[e]->(b)<-(c)-(d)"),
            vec![
                Tk::LParen,
                Tk::Identifier,
                Tk::RParen,
                Tk::Minus,
                Tk::LBracket,
                Tk::Identifier,
                Tk::RBracket,
                Tk::Arrow,
                Tk::LParen,
                Tk::Identifier,
                Tk::RParen,
                Tk::LeftArrow,
                Tk::LParen,
                Tk::Identifier,
                Tk::RParen,
                Tk::Minus,
                Tk::LParen,
                Tk::Identifier,
                Tk::RParen,
                Tk::Eof,
            ]
        );
    }

    #[test]
    fn test_offsets_and_lexemes() {
        let tokens = Lexer::new("SELECT x.age").tokenize().expect("tokenize should succeed");
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].offset, 7);
        assert_eq!(tokens[3].lexeme, "age");
        assert_eq!(tokens[3].end(), 12);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("SELECT x MATCH (x) WHERE x.a = 1")
            .tokenize()
            .expect_err("'=' is not part of the grammar");
        match err {
            QueryError::Parse { position, tokens, .. } => {
                assert_eq!(position, 10);
                assert!(tokens.contains("WHERE"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
