//! 查询解析
//!
//! 词法分析、递归下降语法分析和语法树定义。

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    EdgePattern, Expr, ExprKind, NodePattern, OrderItem, PathPattern, QueryAst, SelectClause,
    SelectItem,
};
pub use lexer::Lexer;
pub use parser::{parse_query, Parser};
pub use token::{Token, TokenKind};
