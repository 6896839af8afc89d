//! Arithmetic cost expressions.
//!
//! A formula is tokenized and parsed once, at load time; evaluation is total
//! and never fails. Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | variable | function '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::fmt;

use strum::{Display, EnumIter, EnumString};

use crate::error::ConfigError;

// ============================================================================
// Names
// ============================================================================

/// Values a formula can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Variable {
    /// Sum of the primary bundle's levels.
    Level,
    /// Number of kinds in the primary bundle.
    Effects,
    /// Highest level in the primary bundle.
    MaxLevel,
    InputLevel,
    InputEffects,
    ResultLevel,
    ResultEffects,
    Binding,
    UpkeepReduction,
    /// Applicable catalyst enchantments on the second input.
    Catalysts,
    Tier,
    /// The vanilla-curve cost of the same context.
    Vanilla,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Function {
    Min,
    Max,
    Floor,
    Ceil,
    Round,
    Abs,
}

impl Function {
    fn accepts(self, arity: usize) -> bool {
        match self {
            Function::Min | Function::Max => arity >= 1,
            _ => arity == 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div if rhs == 0.0 => 0.0,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Rem if rhs == 0.0 => 0.0,
            BinaryOp::Rem => lhs % rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }
}

// ============================================================================
// Expression Tree
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(Variable),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn evaluate(&self, vars: &dyn Fn(Variable) -> f64) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Var(variable) => vars(*variable),
            Expr::Neg(inner) => -inner.evaluate(vars),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.evaluate(vars), rhs.evaluate(vars)),
            Expr::Call { function, args } => {
                let mut values = args.iter().map(|arg| arg.evaluate(vars));
                match function {
                    Function::Min => values.fold(f64::INFINITY, f64::min),
                    Function::Max => values.fold(f64::NEG_INFINITY, f64::max),
                    Function::Floor => values.next().map_or(0.0, f64::floor),
                    Function::Ceil => values.next().map_or(0.0, f64::ceil),
                    Function::Round => values.next().map_or(0.0, f64::round),
                    Function::Abs => values.next().map_or(0.0, f64::abs),
                }
            }
        }
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LeftParen,
    RightParen,
    Comma,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..end];
                let value = text
                    .parse()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(source[start..end].to_ascii_lowercase()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::LeftParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RightParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            other => return Err(format!("unexpected character '{other}' at {start}")),
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

/// Deepest expression tree a formula may build.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {expected:?}, found {token:?}")),
            None => Err(format!("expected {expected:?}, found end of input")),
        }
    }

    fn deepen(&mut self) -> Result<(), String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("nested deeper than {MAX_DEPTH} levels"));
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let base = self.depth;
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            self.deepen()?;
            let rhs = self.term()?;
            let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            lhs = binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let base = self.depth;
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            self.deepen()?;
            let rhs = self.unary()?;
            let op = match op {
                '*' => BinaryOp::Mul,
                '/' => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            lhs = binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat_op(&['-']).is_some() {
            self.deepen()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, String> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            self.deepen()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LeftParen) => {
                self.deepen()?;
                let inner = self.expr()?;
                self.expect(Token::RightParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LeftParen) {
                    self.call(&name)
                } else {
                    name.parse()
                        .map(Expr::Var)
                        .map_err(|_| format!("unknown variable '{name}'"))
                }
            }
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, String> {
        let function: Function = name
            .parse()
            .map_err(|_| format!("unknown function '{name}'"))?;
        self.expect(Token::LeftParen)?;
        self.deepen()?;

        let mut args = vec![self.expr()?];
        while self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(Token::RightParen)?;
        self.depth -= 1;

        if !function.accepts(args.len()) {
            return Err(format!(
                "{function} does not take {} argument(s)",
                args.len()
            ));
        }
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Parses a complete expression.
pub fn parse_expr(source: &str) -> Result<Expr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidFormula {
        formula: source.to_string(),
        reason,
    };

    let tokens = tokenize(source).map_err(invalid)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr().map_err(invalid)?;
    if let Some(token) = parser.peek() {
        return Err(invalid(format!("trailing {token:?}")));
    }
    Ok(expr)
}

// ============================================================================
// Bounded Formula
// ============================================================================

/// A parsed formula with an optional floor and ceiling.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicFormula {
    source: String,
    expr: Expr,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DynamicFormula {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: parse_expr(source)?,
            min: None,
            max: None,
        })
    }

    /// Sets the bounds, rejecting an inverted range.
    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Result<Self, ConfigError> {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(ConfigError::InvalidFormula {
                formula: self.source,
                reason: format!("min {lo} is greater than max {hi}"),
            });
        }
        self.min = min;
        self.max = max;
        Ok(self)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates to a non-negative whole number. Non-finite results fall
    /// back to the floor.
    pub fn evaluate(&self, vars: &dyn Fn(Variable) -> f64) -> u32 {
        let floor = self.min.unwrap_or(0.0);
        let mut value = self.expr.evaluate(vars);
        if !value.is_finite() {
            value = floor;
        }
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value.round().max(0.0) as u32
    }
}

impl fmt::Display for DynamicFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(variable: Variable) -> f64 {
        match variable {
            Variable::Level => 4.0,
            Variable::Effects => 2.0,
            Variable::Tier => 3.0,
            _ => 0.0,
        }
    }

    fn eval(source: &str) -> f64 {
        parse_expr(source).unwrap().evaluate(&vars)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("-2 ^ 2"), -4.0);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("7 % 4"), 3.0);
    }

    #[test]
    fn variables_and_functions() {
        assert_eq!(eval("level * effects + tier"), 11.0);
        assert_eq!(eval("max(level, tier, 10)"), 10.0);
        assert_eq!(eval("min(level, tier)"), 3.0);
        assert_eq!(eval("floor(level / 3)"), 1.0);
        assert_eq!(eval("CEIL(level / 3)"), 2.0);
        assert_eq!(eval("abs(-tier)"), 3.0);
    }

    #[test]
    fn division_by_zero_yields_zero() {
        assert_eq!(eval("level / 0"), 0.0);
        assert_eq!(eval("level % (tier - 3)"), 0.0);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let negations = format!("{}1", "-".repeat(10_000));
        let powers = format!("{}2", "2^".repeat(10_000));
        let sums = format!("{}1", "1+".repeat(10_000));
        let calls = format!("{}1{}", "abs(".repeat(10_000), ")".repeat(10_000));

        for source in [parens, negations, powers, sums, calls] {
            let err = parse_expr(&source).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidFormula { reason, .. } if reason.contains("nested")),
                "{err}"
            );
        }

        let nested = format!("{}level{}", "(".repeat(32), ")".repeat(32));
        assert_eq!(eval(&nested), 4.0);
        assert_eq!(eval(&format!("{}1", "1+".repeat(100))), 101.0);
    }

    #[test]
    fn malformed_formulas_are_rejected_at_parse_time() {
        for source in ["", "1 +", "(1", "level level", "speed * 2", "sqrt(4)", "floor(1, 2)", "1 $ 2"] {
            assert!(
                matches!(parse_expr(source), Err(ConfigError::InvalidFormula { .. })),
                "{source} should not parse"
            );
        }
    }

    #[test]
    fn bounds_clamp_and_round() {
        let formula = DynamicFormula::parse("level * 2.6")
            .unwrap()
            .with_bounds(Some(1.0), Some(10.0))
            .unwrap();
        assert_eq!(formula.evaluate(&vars), 10);

        let formula = DynamicFormula::parse("level / 3").unwrap();
        assert_eq!(formula.evaluate(&vars), 1);

        let negative = DynamicFormula::parse("0 - level").unwrap();
        assert_eq!(negative.evaluate(&vars), 0);

        let infinite = DynamicFormula::parse("10 ^ 400")
            .unwrap()
            .with_bounds(Some(5.0), None)
            .unwrap();
        assert_eq!(infinite.evaluate(&vars), 5);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let formula = DynamicFormula::parse("level").unwrap();
        assert!(formula.with_bounds(Some(5.0), Some(1.0)).is_err());
    }
}
