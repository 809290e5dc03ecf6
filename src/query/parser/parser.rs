//! 递归下降解析器
//!
//! ```text
//! query   := SELECT (* | item (, item)*) MATCH path (, path)*
//!            (GROUP BY expr (, expr)*)? (ORDER BY expr (ASC|DESC)? (, ...)*)? ;?
//! item    := expr (AS ident)?
//! expr    := ident | ident.ident | AGG( * | ident | ident.ident )
//! path    := node (edge node)*
//! node    := ( ident? (: ident)? )
//! edge    := -[..]-> | <-[..]- | -[..]- | -> | <- | -
//! ```

use crate::core::error::{QueryError, QueryResult};
use crate::expression::AggregateFunction;
use crate::query::matcher::EdgeDirection;
use crate::query::parser::ast::{
    EdgePattern, Expr, ExprKind, NodePattern, OrderItem, PathPattern, QueryAst, SelectClause,
    SelectItem,
};
use crate::query::parser::lexer::Lexer;
use crate::query::parser::token::{dump_tokens, Token, TokenKind as Tk};

pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

/// 解析整条查询
pub fn parse_query(input: &str) -> QueryResult<QueryAst> {
    Parser::new(input)?.parse()
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> QueryResult<Self> {
        Ok(Self {
            input,
            tokens: Lexer::new(input).tokenize()?,
            position: 0,
        })
    }

    pub fn parse(mut self) -> QueryResult<QueryAst> {
        self.expect(Tk::Select)?;
        let select = if self.match_token(Tk::Star) {
            SelectClause::Star
        } else {
            SelectClause::Items(self.comma_separated(Self::parse_select_item)?)
        };

        self.expect(Tk::Match)?;
        let patterns = self.comma_separated(Self::parse_path)?;

        let mut group_by = Vec::new();
        if self.match_token(Tk::Group) {
            self.expect(Tk::By)?;
            group_by = self.comma_separated(Self::parse_expr)?;
        }

        let mut order_by = Vec::new();
        if self.match_token(Tk::Order) {
            self.expect(Tk::By)?;
            order_by = self.comma_separated(Self::parse_order_item)?;
        }

        self.match_token(Tk::Semicolon);
        if !self.check(Tk::Eof) {
            return Err(self.error(format!("unexpected {}", self.current().kind)));
        }
        Ok(QueryAst {
            select,
            patterns,
            group_by,
            order_by,
        })
    }

    fn current(&self) -> &Token {
        // tokens 末尾总是 Eof，position 不会越过它
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: Tk) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != Tk::Eof {
            self.position += 1;
        }
        token
    }

    fn match_token(&mut self, kind: Tk) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Tk) -> QueryResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}, found {}", kind, self.current().kind)))
        }
    }

    fn error(&self, message: String) -> QueryError {
        QueryError::Parse {
            message,
            position: self.position,
            tokens: dump_tokens(&self.tokens),
        }
    }

    fn comma_separated<T>(&mut self, mut item: impl FnMut(&mut Self) -> QueryResult<T>) -> QueryResult<Vec<T>> {
        let mut items = vec![item(self)?];
        while self.match_token(Tk::Comma) {
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> QueryResult<SelectItem> {
        let expr = self.parse_expr()?;
        let alias = if self.match_token(Tk::As) {
            Some(self.expect(Tk::Identifier)?.lexeme)
        } else {
            None
        };
        Ok(SelectItem { expr, alias })
    }

    fn parse_order_item(&mut self) -> QueryResult<OrderItem> {
        let expr = self.parse_expr()?;
        let descending = if self.match_token(Tk::Desc) {
            true
        } else {
            self.match_token(Tk::Asc);
            false
        };
        Ok(OrderItem { expr, descending })
    }

    fn parse_expr(&mut self) -> QueryResult<Expr> {
        let first = self.expect(Tk::Identifier)?;
        if self.check(Tk::LParen) {
            let function: AggregateFunction = first.lexeme.parse()?;
            self.advance();
            let argument = if self.match_token(Tk::Star) {
                None
            } else {
                Some(Box::new(self.parse_reference()?))
            };
            let close = self.expect(Tk::RParen)?;
            return Ok(Expr {
                kind: ExprKind::Aggregate { function, argument },
                text: self.input[first.offset..close.end()].to_string(),
            });
        }
        self.finish_reference(first)
    }

    /// `ident` 或 `ident.ident`
    fn parse_reference(&mut self) -> QueryResult<Expr> {
        let first = self.expect(Tk::Identifier)?;
        self.finish_reference(first)
    }

    fn finish_reference(&mut self, variable: Token) -> QueryResult<Expr> {
        if self.match_token(Tk::Dot) {
            let property = self.expect(Tk::Identifier)?;
            return Ok(Expr {
                text: self.input[variable.offset..property.end()].to_string(),
                kind: ExprKind::Property {
                    variable: variable.lexeme,
                    property: property.lexeme,
                },
            });
        }
        Ok(Expr {
            text: variable.lexeme.clone(),
            kind: ExprKind::Variable(variable.lexeme),
        })
    }

    fn parse_path(&mut self) -> QueryResult<PathPattern> {
        let start = self.parse_node()?;
        let mut hops = Vec::new();
        while matches!(self.current().kind, Tk::Minus | Tk::Arrow | Tk::LeftArrow) {
            let edge = self.parse_edge()?;
            let node = self.parse_node()?;
            hops.push((edge, node));
        }
        Ok(PathPattern { start, hops })
    }

    fn parse_node(&mut self) -> QueryResult<NodePattern> {
        self.expect(Tk::LParen)?;
        let (variable, label) = self.parse_element_body()?;
        self.expect(Tk::RParen)?;
        Ok(NodePattern { variable, label })
    }

    /// 节点和边括号内部的 `ident? (: ident)?`
    fn parse_element_body(&mut self) -> QueryResult<(Option<String>, Option<String>)> {
        let variable = if self.check(Tk::Identifier) {
            Some(self.advance().lexeme)
        } else {
            None
        };
        let label = if self.match_token(Tk::Colon) {
            Some(self.expect(Tk::Identifier)?.lexeme)
        } else {
            None
        };
        Ok((variable, label))
    }

    fn parse_edge(&mut self) -> QueryResult<EdgePattern> {
        let opening = self.advance();
        if !self.check(Tk::LBracket) {
            let direction = match opening.kind {
                Tk::Arrow => EdgeDirection::Out,
                Tk::LeftArrow => EdgeDirection::In,
                _ => EdgeDirection::Any,
            };
            return Ok(EdgePattern {
                variable: None,
                label: None,
                direction,
            });
        }
        if opening.kind == Tk::Arrow {
            return Err(self.error("'->' cannot open an edge body".to_string()));
        }
        self.advance();
        let (variable, label) = self.parse_element_body()?;
        self.expect(Tk::RBracket)?;
        let direction = match (opening.kind, self.current().kind) {
            (Tk::Minus, Tk::Arrow) => EdgeDirection::Out,
            (Tk::Minus, Tk::Minus) => EdgeDirection::Any,
            (Tk::LeftArrow, Tk::Minus) => EdgeDirection::In,
            (_, found) => return Err(self.error(format!("unexpected {} after edge body", found))),
        };
        self.advance();
        Ok(EdgePattern {
            variable,
            label,
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(variable: Option<&str>, label: Option<&str>) -> NodePattern {
        NodePattern {
            variable: variable.map(str::to_string),
            label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_full_query() {
        let ast = parse_query(
            "SELECT x.name AS n, COUNT(*) MATCH (x:Person)-[e:knows]->(y), (y)<-(z) \
             GROUP BY x.name ORDER BY COUNT(*) DESC, x.name;",
        )
        .expect("parse should succeed");

        let SelectClause::Items(items) = &ast.select else {
            panic!("expected select items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].alias.as_deref(), Some("n"));
        assert_eq!(items[1].expr.text, "COUNT(*)");
        assert!(matches!(
            items[1].expr.kind,
            ExprKind::Aggregate {
                function: AggregateFunction::Count,
                argument: None
            }
        ));

        assert_eq!(ast.patterns.len(), 2);
        assert_eq!(ast.patterns[0].start, node(Some("x"), Some("Person")));
        let (edge, target) = &ast.patterns[0].hops[0];
        assert_eq!(edge.variable.as_deref(), Some("e"));
        assert_eq!(edge.label.as_deref(), Some("knows"));
        assert_eq!(edge.direction, EdgeDirection::Out);
        assert_eq!(*target, node(Some("y"), None));
        assert_eq!(ast.patterns[1].hops[0].0.direction, EdgeDirection::In);

        assert_eq!(ast.group_by.len(), 1);
        assert_eq!(ast.order_by.len(), 2);
        assert!(ast.order_by[0].descending);
        assert!(!ast.order_by[1].descending);
    }

    #[test]
    fn test_edge_forms() {
        let ast = parse_query("SELECT * MATCH ()-[]-()<-[:t]-(:V)-(a)->(b)<-(c)")
            .expect("parse should succeed");
        assert_eq!(ast.select, SelectClause::Star);
        let directions: Vec<EdgeDirection> = ast.patterns[0]
            .hops
            .iter()
            .map(|(edge, _)| edge.direction)
            .collect();
        assert_eq!(
            directions,
            vec![
                EdgeDirection::Any,
                EdgeDirection::In,
                EdgeDirection::Any,
                EdgeDirection::Out,
                EdgeDirection::In,
            ]
        );
        assert_eq!(ast.patterns[0].hops[1].0.label.as_deref(), Some("t"));
        assert_eq!(ast.patterns[0].hops[1].1, node(None, Some("V")));
    }

    #[test]
    fn test_expression_text_kept_as_written() {
        let ast = parse_query("select avg( x.age ), x MATCH (x)").expect("parse should succeed");
        let SelectClause::Items(items) = &ast.select else {
            panic!("expected select items");
        };
        assert_eq!(items[0].expr.text, "avg( x.age )");
        assert_eq!(items[1].expr.text, "x");
    }

    #[test]
    fn test_unknown_aggregate() {
        let err = parse_query("SELECT MEDIAN(x.age) MATCH (x)").expect_err("MEDIAN is unknown");
        assert_eq!(err, QueryError::UnknownAggregate("MEDIAN".to_string()));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_query("SELECT x MATCH (x) x").expect_err("trailing token");
        match err {
            QueryError::Parse { position, tokens, .. } => {
                assert_eq!(position, 6);
                assert!(tokens.starts_with("[0:SELECT"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_edge() {
        assert!(parse_query("SELECT * MATCH (a)-[e]>(b)").is_err());
        assert!(parse_query("SELECT * MATCH (a)<-[e]->(b)").is_err());
        assert!(parse_query("SELECT * MATCH (a)-[e(b)").is_err());
    }
}
