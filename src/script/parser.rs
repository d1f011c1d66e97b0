//=====================================================
// File: script/parser.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Recursive descent parser for the Python subset
// Objective: Transform token streams into AST nodes consumed by the
//            interpreter and the evaluator's trailing-expression split
//=====================================================

//=====================================================
//            Section 1: Imports
//=====================================================

use std::rc::Rc;

use super::ast::{
    AssignTarget, BinaryOp, BoolOp, CompareOp, ExceptHandler, Expr, FunctionDecl, Literal,
    Parameter, Program, Stmt, UnaryOp,
};
use super::tokenizer::{tokenize, Position, Token, TokenKind};

//=====================================================
//            Section 2: Parse Errors
//=====================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::InvalidSyntax { position, .. } => *position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => write!(
                f,
                "expected {} but found {} at line {}, column {}",
                expected, found, position.line, position.column
            ),
            ParseError::UnexpectedEndOfInput { expected, position } => write!(
                f,
                "unexpected end of input, expected {} at line {}, column {}",
                expected, position.line, position.column
            ),
            ParseError::InvalidSyntax { message, position } => write!(
                f,
                "invalid syntax: {} at line {}, column {}",
                message, position.line, position.column
            ),
        }
    }
}

impl std::error::Error for ParseError {}

//=====================================================
//            Section 3: Parser State
//=====================================================

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    expr_depth: usize,
}

const MAX_EXPRESSION_DEPTH: usize = 512;

/// Tokenize and parse a whole module.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(tokenize(source)?).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            expr_depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            statements.extend(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    //=====================================================
    //            Section 4: Statements
    //=====================================================

    /// One logical line may hold several `;` separated simple statements.
    fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.peek().kind {
            TokenKind::If => Ok(vec![self.parse_if_statement()?]),
            TokenKind::While => Ok(vec![self.parse_while_statement()?]),
            TokenKind::For => Ok(vec![self.parse_for_statement()?]),
            TokenKind::Def => Ok(vec![self.parse_function_definition()?]),
            TokenKind::Try => Ok(vec![self.parse_try_statement()?]),
            TokenKind::Indent => Err(ParseError::InvalidSyntax {
                message: "unexpected indent".to_string(),
                position: self.current_position(),
            }),
            _ => self.parse_simple_line(),
        }
    }

    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = vec![self.parse_simple_statement()?];
        while self.match_kind(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
            statements.push(self.parse_simple_statement()?);
        }
        self.consume_statement_terminator()?;
        Ok(statements)
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        match self.peek().kind.clone() {
            TokenKind::Pass => {
                self.advance();
                Ok(Stmt::Pass { position })
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break { position })
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt::Continue { position })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_simple_statement_end() {
                    None
                } else {
                    Some(self.parse_expression_list()?)
                };
                Ok(Stmt::Return { value, position })
            }
            TokenKind::Raise => {
                self.advance();
                let exception = if self.at_simple_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Stmt::Raise {
                    exception,
                    position,
                })
            }
            TokenKind::Global => {
                self.advance();
                let mut names = vec![self.consume_identifier("name after 'global'")?];
                while self.match_kind(&TokenKind::Comma) {
                    names.push(self.consume_identifier("name after ','")?);
                }
                Ok(Stmt::Global { names, position })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let first = self.parse_expression_list()?;

        if let Some(operator) = self.match_augmented_assignment() {
            let target = self.assignment_target_from_expr(first)?;
            if matches!(target, AssignTarget::Unpack(_)) {
                return Err(ParseError::InvalidSyntax {
                    message: "illegal expression for augmented assignment".to_string(),
                    position,
                });
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::AugAssign {
                target,
                operator,
                value,
                position,
            });
        }

        if !self.check(&TokenKind::Assign) {
            return Ok(Stmt::Expression {
                expr: first,
                position,
            });
        }

        let mut chain = vec![first];
        while self.match_kind(&TokenKind::Assign) {
            chain.push(self.parse_expression_list()?);
        }
        let value = chain.pop().ok_or_else(|| ParseError::InvalidSyntax {
            message: "assignment without value".to_string(),
            position,
        })?;
        let targets = chain
            .into_iter()
            .map(|expr| self.assignment_target_from_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Stmt::Assign {
            targets,
            value,
            position,
        })
    }

    fn match_augmented_assignment(&mut self) -> Option<BinaryOp> {
        let operator = match self.peek().kind {
            TokenKind::PlusAssign => BinaryOp::Add,
            TokenKind::MinusAssign => BinaryOp::Sub,
            TokenKind::StarAssign => BinaryOp::Mul,
            TokenKind::SlashAssign => BinaryOp::Div,
            TokenKind::DoubleSlashAssign => BinaryOp::FloorDiv,
            TokenKind::PercentAssign => BinaryOp::Mod,
            _ => return None,
        };
        self.advance();
        Some(operator)
    }

    fn assignment_target_from_expr(&self, expr: Expr) -> Result<AssignTarget, ParseError> {
        match expr {
            Expr::Name { name, .. } => Ok(AssignTarget::Name(name)),
            Expr::Attribute { object, name, .. } => Ok(AssignTarget::Attribute {
                object: *object,
                name,
            }),
            Expr::Subscript { object, index, .. } => Ok(AssignTarget::Subscript {
                object: *object,
                index: *index,
            }),
            Expr::Tuple { elements, .. } | Expr::List { elements, .. } => {
                let targets = elements
                    .into_iter()
                    .map(|element| self.assignment_target_from_expr(element))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AssignTarget::Unpack(targets))
            }
            other => Err(ParseError::InvalidSyntax {
                message: "cannot assign to expression".to_string(),
                position: other.position(),
            }),
        }
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let mut branches = Vec::new();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        branches.push((condition, body));

        let mut else_body = None;
        loop {
            if self.match_kind(&TokenKind::Elif) {
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push((condition, body));
            } else if self.match_kind(&TokenKind::Else) {
                else_body = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If {
            branches,
            else_body,
            position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            condition,
            body,
            position,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let mut targets = vec![self.parse_postfix()?];
        while self.match_kind(&TokenKind::Comma) {
            if self.check(&TokenKind::In) {
                break;
            }
            targets.push(self.parse_postfix()?);
        }
        let target_expr = if targets.len() == 1 {
            targets.remove(0)
        } else {
            Expr::Tuple {
                elements: targets,
                position,
            }
        };
        let target = self.assignment_target_from_expr(target_expr)?;
        self.consume(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expression_list()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            target,
            iterable,
            body,
            position,
        })
    }

    fn parse_function_definition(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let name = self.consume_identifier("function name")?;
        self.consume(&TokenKind::LeftParen, "'('")?;
        let params = self.parse_parameters(&TokenKind::RightParen)?;
        self.consume(&TokenKind::RightParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::FunctionDef {
            decl: Rc::new(FunctionDecl {
                name,
                params,
                body,
                position,
            }),
            position,
        })
    }

    fn parse_parameters(&mut self, terminator: &TokenKind) -> Result<Vec<Parameter>, ParseError> {
        let mut params: Vec<Parameter> = Vec::new();
        while !self.check(terminator) {
            let position = self.current_position();
            let name = self.consume_identifier("parameter name")?;
            if params.iter().any(|param| param.name == name) {
                return Err(ParseError::InvalidSyntax {
                    message: format!("duplicate argument '{name}' in function definition"),
                    position,
                });
            }
            let default = if self.match_kind(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                if params.iter().any(|param| param.default.is_some()) {
                    return Err(ParseError::InvalidSyntax {
                        message: "non-default argument follows default argument".to_string(),
                        position,
                    });
                }
                None
            };
            params.push(Parameter { name, default });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_try_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance();
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.check(&TokenKind::Except) {
            let handler_position = self.current_position();
            self.advance();
            let (exception_type, binding) = if self.check(&TokenKind::Colon) {
                (None, None)
            } else {
                let exception_type = self.parse_expression()?;
                let binding = if self.match_kind(&TokenKind::As) {
                    Some(self.consume_identifier("name after 'as'")?)
                } else {
                    None
                };
                (Some(exception_type), binding)
            };
            let body = self.parse_block()?;
            handlers.push(ExceptHandler {
                exception_type,
                binding,
                body,
                position: handler_position,
            });
        }

        let else_body = if !handlers.is_empty() && self.match_kind(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let finally_body = if self.match_kind(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handlers.is_empty() && finally_body.is_none() {
            return Err(ParseError::InvalidSyntax {
                message: "expected 'except' or 'finally' block".to_string(),
                position,
            });
        }
        Ok(Stmt::Try {
            body,
            handlers,
            else_body,
            finally_body,
            position,
        })
    }

    /// `:` followed by either an indented suite or simple statements on the same line.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(&TokenKind::Colon, "':'")?;
        if !self.match_kind(&TokenKind::Newline) {
            return self.parse_simple_line();
        }
        if !self.match_kind(&TokenKind::Indent) {
            return Err(ParseError::InvalidSyntax {
                message: "expected an indented block".to_string(),
                position: self.current_position(),
            });
        }
        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            body.extend(self.parse_statement()?);
            self.skip_newlines();
        }
        self.match_kind(&TokenKind::Dedent);
        Ok(body)
    }

    //=====================================================
    //            Section 5: Expressions
    //=====================================================

    fn enter_expression(&mut self) -> Result<(), ParseError> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPRESSION_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: "expression nesting too deep".to_string(),
                position: self.current_position(),
            });
        }
        Ok(())
    }

    fn exit_expression(&mut self) {
        self.expr_depth = self.expr_depth.saturating_sub(1);
    }

    /// Expression, or a bare tuple when commas follow: `a, b`.
    fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut elements = vec![first];
        while self.match_kind(&TokenKind::Comma) {
            if self.at_expression_list_end() {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple { elements, position })
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter_expression()?;
        let result = if self.check(&TokenKind::Lambda) {
            self.parse_lambda()
        } else {
            self.parse_conditional()
        };
        self.exit_expression();
        result
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.advance();
        let params = self.parse_parameters(&TokenKind::Colon)?;
        self.consume(&TokenKind::Colon, "':' after lambda parameters")?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            body: Rc::new(body),
            position,
        })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let then_branch = self.parse_or()?;
        if !self.match_kind(&TokenKind::If) {
            return Ok(then_branch);
        }
        let condition = self.parse_or()?;
        self.consume(&TokenKind::Else, "'else' in conditional expression")?;
        let else_branch = self.parse_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            position,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_and()?;
            expr = Expr::Logical {
                operator: BoolOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_not()?;
        while self.check(&TokenKind::And) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_not()?;
            expr = Expr::Logical {
                operator: BoolOp::And,
                left: Box::new(expr),
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            let position = self.current_position();
            self.advance();
            self.enter_expression()?;
            let operand = self.parse_not();
            self.exit_expression();
            return Ok(Expr::Unary {
                operator: UnaryOp::Not,
                operand: Box::new(operand?),
                position,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let left = self.parse_arithmetic()?;
        let mut comparisons = Vec::new();
        while let Some(operator) = self.match_comparison_operator() {
            comparisons.push((operator, self.parse_arithmetic()?));
        }
        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            comparisons,
            position,
        })
    }

    fn match_comparison_operator(&mut self) -> Option<CompareOp> {
        let operator = match self.peek().kind {
            TokenKind::EqualEqual => CompareOp::Eq,
            TokenKind::NotEqual => CompareOp::NotEq,
            TokenKind::Less => CompareOp::Less,
            TokenKind::LessEqual => CompareOp::LessEq,
            TokenKind::Greater => CompareOp::Greater,
            TokenKind::GreaterEqual => CompareOp::GreaterEq,
            TokenKind::In => CompareOp::In,
            TokenKind::Not if self.peek_next().kind == TokenKind::In => {
                self.advance();
                CompareOp::NotIn
            }
            TokenKind::Is => {
                if self.peek_next().kind == TokenKind::Not {
                    self.advance();
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(operator)
    }

    fn parse_arithmetic(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        let position = self.current_position();
        self.advance();
        self.enter_expression()?;
        let operand = self.parse_unary();
        self.exit_expression();
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand?),
            position,
        })
    }

    /// `**` binds tighter than unary minus on its left and is right associative.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if !self.check(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        let position = self.current_position();
        self.advance();
        self.enter_expression()?;
        let exponent = self.parse_unary();
        self.exit_expression();
        Ok(Expr::Binary {
            left: Box::new(base),
            operator: BinaryOp::Pow,
            right: Box::new(exponent?),
            position,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            let position = self.current_position();
            if self.match_kind(&TokenKind::LeftParen) {
                let (args, kwargs) = self.parse_call_arguments()?;
                self.consume(&TokenKind::RightParen, "')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    kwargs,
                    position,
                };
            } else if self.match_kind(&TokenKind::Dot) {
                let name = self.consume_identifier("attribute name after '.'")?;
                expr = Expr::Attribute {
                    object: Box::new(expr),
                    name,
                    position,
                };
            } else if self.match_kind(&TokenKind::LeftBracket) {
                let index = self.parse_expression_list()?;
                self.consume(&TokenKind::RightBracket, "']' after index")?;
                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                    position,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            let position = self.current_position();
            let keyword = match (&self.peek().kind, &self.peek_next().kind) {
                (TokenKind::Identifier(name), TokenKind::Assign) => Some(name.clone()),
                _ => None,
            };
            if let Some(name) = keyword {
                self.advance();
                self.advance();
                if kwargs.iter().any(|(existing, _)| existing == &name) {
                    return Err(ParseError::InvalidSyntax {
                        message: format!("keyword argument repeated: {name}"),
                        position,
                    });
                }
                kwargs.push((name, self.parse_expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(ParseError::InvalidSyntax {
                        message: "positional argument follows keyword argument".to_string(),
                        position,
                    });
                }
                args.push(self.parse_expression()?);
            }
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(literal(Literal::Int(value), position))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(literal(Literal::Float(value), position))
            }
            TokenKind::Str(mut value) => {
                self.advance();
                // Adjacent literals concatenate.
                while let TokenKind::Str(next) = &self.peek().kind {
                    value.push_str(next);
                    self.advance();
                }
                Ok(literal(Literal::Str(value), position))
            }
            TokenKind::True => {
                self.advance();
                Ok(literal(Literal::Bool(true), position))
            }
            TokenKind::False => {
                self.advance();
                Ok(literal(Literal::Bool(false), position))
            }
            TokenKind::None => {
                self.advance();
                Ok(literal(Literal::None, position))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Name { name, position })
            }
            TokenKind::LeftParen => {
                self.advance();
                if self.match_kind(&TokenKind::RightParen) {
                    return Ok(Expr::Tuple {
                        elements: Vec::new(),
                        position,
                    });
                }
                let first = self.parse_expression()?;
                if self.match_kind(&TokenKind::RightParen) {
                    return Ok(first);
                }
                let mut elements = vec![first];
                while self.match_kind(&TokenKind::Comma) {
                    if self.check(&TokenKind::RightParen) {
                        break;
                    }
                    elements.push(self.parse_expression()?);
                }
                self.consume(&TokenKind::RightParen, "')'")?;
                Ok(Expr::Tuple { elements, position })
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RightBracket) {
                    elements.push(self.parse_expression()?);
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(&TokenKind::RightBracket, "']'")?;
                Ok(Expr::List { elements, position })
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RightBrace) {
                    let key = self.parse_expression()?;
                    self.consume(&TokenKind::Colon, "':' in dict display")?;
                    let value = self.parse_expression()?;
                    entries.push((key, value));
                    if !self.match_kind(&TokenKind::Comma) {
                        break;
                    }
                }
                self.consume(&TokenKind::RightBrace, "'}'")?;
                Ok(Expr::Dict { entries, position })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position,
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other,
                position,
            }),
        }
    }

    //=====================================================
    //            Section 6: Token Navigation
    //=====================================================

    fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn peek_next(&self) -> &Token {
        let index = (self.current + 1).min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn advance(&mut self) -> &Token {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[index]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.unexpected(expected))
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(name);
        }
        Err(self.unexpected(expected))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: token.position,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.clone(),
                position: token.position,
            }
        }
    }

    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        if self.match_kind(&TokenKind::Newline)
            || self.is_at_end()
            || self.check(&TokenKind::Dedent)
        {
            return Ok(());
        }
        Err(self.unexpected("end of statement"))
    }

    fn at_simple_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn at_expression_list_end(&self) -> bool {
        self.at_simple_statement_end()
            || matches!(
                self.peek().kind,
                TokenKind::Assign
                    | TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::Colon
            )
            || self.match_augmented_peek()
    }

    fn match_augmented_peek(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::DoubleSlashAssign
                | TokenKind::PercentAssign
        )
    }

    fn skip_newlines(&mut self) {
        while self.match_kind(&TokenKind::Newline) {}
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn current_position(&self) -> Position {
        self.peek().position
    }
}

fn literal(value: Literal, position: Position) -> Expr {
    Expr::Literal { value, position }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_program(source).expect("parse")
    }

    #[test]
    fn splits_trailing_expression() {
        let program = parse("x = 1\nx + 1\n");
        let (rest, tail) = program.split_trailing_expression();
        assert_eq!(rest.statements.len(), 1);
        match tail {
            Some(Expr::Binary {
                operator: BinaryOp::Add,
                ..
            }) => {}
            other => panic!("unexpected tail: {other:?}"),
        }
    }

    #[test]
    fn no_tail_when_last_statement_is_assignment() {
        let (_, tail) = parse("x = 1").split_trailing_expression();
        assert!(tail.is_none());
    }

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        let program = parse("-2 ** 2");
        match &program.statements[0] {
            Stmt::Expression {
                expr:
                    Expr::Unary {
                        operator: UnaryOp::Neg,
                        operand,
                        ..
                    },
                ..
            } => assert!(matches!(
                operand.as_ref(),
                Expr::Binary {
                    operator: BinaryOp::Pow,
                    ..
                }
            )),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_chained_and_tuple_assignment() {
        let program = parse("a = b = 1\nx, y = y, x\n");
        match &program.statements[0] {
            Stmt::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("unexpected statement: {other:?}"),
        }
        match &program.statements[1] {
            Stmt::Assign { targets, value, .. } => {
                assert!(matches!(&targets[0], AssignTarget::Unpack(items) if items.len() == 2));
                assert!(matches!(value, Expr::Tuple { elements, .. } if elements.len() == 2));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_compound_statements() {
        let source = "\
def f(a, b=2):
    if a > b:
        return a
    elif a == b:
        pass
    else:
        return b
try:
    f(1)
except ValueError as err:
    pass
finally:
    done = True
for i, v in pairs: total += v
";
        let program = parse(source);
        assert_eq!(program.statements.len(), 3);
        match &program.statements[1] {
            Stmt::Try {
                handlers,
                finally_body,
                ..
            } => {
                assert_eq!(handlers[0].binding.as_deref(), Some("err"));
                assert!(finally_body.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
        assert_eq!(program.statements[2].line(), 14);
    }

    #[test]
    fn parses_chained_comparisons_and_membership() {
        let program = parse("1 < x <= 3 and y not in z and w is not None");
        match &program.statements[0] {
            Stmt::Expression {
                expr: Expr::Logical { .. },
                ..
            } => {}
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_keyword_arguments_and_lambda() {
        let program = parse("f(1, sep='-')\ng = lambda x, y=1: x + y");
        match &program.statements[0] {
            Stmt::Expression {
                expr: Expr::Call { args, kwargs, .. },
                ..
            } => {
                assert_eq!(args.len(), 1);
                assert_eq!(kwargs[0].0, "sep");
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = parse_program("x = (1,\ny = 2").expect_err("unbalanced");
        assert!(err.position().line >= 1);
        let err = parse_program("if x\n    y").expect_err("missing colon");
        match err {
            ParseError::UnexpectedToken { expected, .. } => assert_eq!(expected, "':'"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//=====================================================
// End of file
//=====================================================
