//! Token definitions for the query parser

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Select,
    Match,
    Group,
    Order,
    By,
    As,
    Asc,
    Desc,

    Identifier,

    // Symbols
    Minus,
    Arrow,
    LeftArrow,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Dot,
    Star,
    Semicolon,

    Eof,
}

impl TokenKind {
    /// 关键字不区分大小写
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word.to_ascii_uppercase().as_str() {
            "SELECT" => TokenKind::Select,
            "MATCH" => TokenKind::Match,
            "GROUP" => TokenKind::Group,
            "ORDER" => TokenKind::Order,
            "BY" => TokenKind::By,
            "AS" => TokenKind::As,
            "ASC" => TokenKind::Asc,
            "DESC" => TokenKind::Desc,
            _ => return None,
        };
        Some(kind)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Select => "SELECT",
            TokenKind::Match => "MATCH",
            TokenKind::Group => "GROUP",
            TokenKind::Order => "ORDER",
            TokenKind::By => "BY",
            TokenKind::As => "AS",
            TokenKind::Asc => "ASC",
            TokenKind::Desc => "DESC",
            TokenKind::Identifier => "identifier",
            TokenKind::Minus => "'-'",
            TokenKind::Arrow => "'->'",
            TokenKind::LeftArrow => "'<-'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Star => "'*'",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 在输入中的字节偏移
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            offset,
        }
    }

    /// 该 token 之后的字节偏移
    pub fn end(&self) -> usize {
        self.offset + self.lexeme.len()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "<eof>"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}

/// 出错时附带的完整 token 转储，格式为 `[0:SELECT 1:x ...]`
pub fn dump_tokens(tokens: &[Token]) -> String {
    let parts: Vec<String> = tokens
        .iter()
        .enumerate()
        .map(|(i, token)| format!("{}:{}", i, token))
        .collect();
    format!("[{}]", parts.join(" "))
}
