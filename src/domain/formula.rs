// Formula evaluation - constrained arithmetic over substituted tag values
//
// KPI formulas reference tags positionally (T1, T2, ...) or by display name.
// After substitution the expression may contain only numeric literals and
// + - * / ( ). It is parsed to an AST and tree-walked; the string is never
// handed to anything that could execute code. Any failure degrades to 0.
use crate::domain::tag::TagId;
use std::collections::HashMap;

const MAX_NESTING_DEPTH: usize = 64;

/// Evaluate a user formula against the current values of `tag_ids`.
/// Missing or non-numeric tags substitute as 0. Returns 0 on any lex,
/// parse, or arithmetic failure (including non-finite results); never
/// panics or propagates an error.
pub fn evaluate(
    formula: &str,
    tag_ids: &[TagId],
    values: &HashMap<TagId, f64>,
    display_names: &HashMap<TagId, String>,
) -> f64 {
    let substituted = substitute(formula, tag_ids, values, display_names);
    let Some(tokens) = tokenize(&substituted) else {
        return 0.0;
    };
    let Some(expr) = Parser::parse(&tokens) else {
        return 0.0;
    };
    let result = expr.eval();
    if result.is_finite() { result } else { 0.0 }
}

/// Replace positional placeholders first (highest index first, so T12 is
/// not clobbered by T1), then literal display-name occurrences (longest
/// name first). Substituted values are parenthesized so negatives stay
/// well-formed.
fn substitute(
    formula: &str,
    tag_ids: &[TagId],
    values: &HashMap<TagId, f64>,
    display_names: &HashMap<TagId, String>,
) -> String {
    let value_of = |tag_id: &TagId| values.get(tag_id).copied().unwrap_or(0.0);

    let mut expr = formula.to_string();
    for index in (0..tag_ids.len()).rev() {
        let placeholder = format!("T{}", index + 1);
        expr = expr.replace(&placeholder, &format!("({})", value_of(&tag_ids[index])));
    }

    let mut named: Vec<(&str, f64)> = tag_ids
        .iter()
        .filter_map(|tag_id| {
            display_names
                .get(tag_id)
                .map(|name| (name.as_str(), value_of(tag_id)))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect();
    named.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
    for (name, value) in named {
        expr = expr.replace(name, &format!("({value})"));
    }

    expr
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(literal.parse().ok()?));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

#[derive(Debug)]
enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    fn eval(&self) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Neg(inner) => -inner.eval(),
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (lhs.eval(), rhs.eval());
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                }
            }
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Parse a complete expression; `None` on malformed or trailing input.
    fn parse(tokens: &'a [Token]) -> Option<Expr> {
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr(0)?;
        (parser.pos == tokens.len()).then_some(expr)
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self, depth: usize) -> Option<Expr> {
        let mut lhs = self.term(depth)?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term(depth)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Some(lhs)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self, depth: usize) -> Option<Expr> {
        let mut lhs = self.factor(depth)?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.factor(depth)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Some(lhs)
    }

    // factor := NUMBER | '(' expr ')' | '-' factor
    fn factor(&mut self, depth: usize) -> Option<Expr> {
        if depth > MAX_NESTING_DEPTH {
            return None;
        }
        match self.advance()? {
            Token::Number(n) => Some(Expr::Number(n)),
            Token::Minus => Some(Expr::Neg(Box::new(self.factor(depth + 1)?))),
            Token::LParen => {
                let inner = self.expr(depth + 1)?;
                matches!(self.advance(), Some(Token::RParen)).then_some(inner)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(ids: &[&str]) -> Vec<TagId> {
        ids.iter().map(|id| TagId::new(*id)).collect()
    }

    fn values(pairs: &[(&str, f64)]) -> HashMap<TagId, f64> {
        pairs
            .iter()
            .map(|(id, v)| (TagId::new(*id), *v))
            .collect()
    }

    #[test]
    fn test_positional_substitution_and_precedence() {
        let tag_ids = tags(&["a", "b"]);
        let current = values(&[("a", 4.0), ("b", 2.0)]);
        let names = HashMap::new();

        assert_eq!(evaluate("T1 / T2 + 1", &tag_ids, &current, &names), 3.0);
        assert_eq!(evaluate("T1 + T2 * 3", &tag_ids, &current, &names), 10.0);
        assert_eq!(evaluate("(T1 + T2) * 3", &tag_ids, &current, &names), 18.0);
    }

    #[test]
    fn test_division_by_zero_degrades_to_zero() {
        let tag_ids = tags(&["a"]);
        let current = values(&[("a", 4.0)]);
        assert_eq!(evaluate("T1 / 0", &tag_ids, &current, &HashMap::new()), 0.0);
        assert_eq!(evaluate("0 / 0", &tag_ids, &current, &HashMap::new()), 0.0);
    }

    #[test]
    fn test_non_arithmetic_input_evaluates_to_zero() {
        let tag_ids = tags(&["a"]);
        let current = values(&[("a", 1.0)]);
        let names = HashMap::new();

        assert_eq!(evaluate("alert(1)", &tag_ids, &current, &names), 0.0);
        assert_eq!(evaluate("T1; drop", &tag_ids, &current, &names), 0.0);
        assert_eq!(evaluate("", &tag_ids, &current, &names), 0.0);
        assert_eq!(evaluate("1 +", &tag_ids, &current, &names), 0.0);
        assert_eq!(evaluate("(1", &tag_ids, &current, &names), 0.0);
        assert_eq!(evaluate("1 2", &tag_ids, &current, &names), 0.0);
    }

    #[test]
    fn test_high_positional_indices_are_not_clobbered() {
        let tag_ids: Vec<TagId> = (0..12).map(|i| TagId::from(i as i64)).collect();
        let mut current = HashMap::new();
        current.insert(TagId::from(0_i64), 1.0); // T1
        current.insert(TagId::from(11_i64), 5.0); // T12

        assert_eq!(
            evaluate("T12 - T1", &tag_ids, &current, &HashMap::new()),
            4.0
        );
    }

    #[test]
    fn test_missing_tag_substitutes_zero() {
        let tag_ids = tags(&["a", "b"]);
        let current = values(&[("a", 7.0)]);
        assert_eq!(
            evaluate("T1 + T2", &tag_ids, &current, &HashMap::new()),
            7.0
        );
    }

    #[test]
    fn test_display_name_substitution() {
        let tag_ids = tags(&["a", "b"]);
        let current = values(&[("a", 80.0), ("b", 2.0)]);
        let mut names = HashMap::new();
        names.insert(TagId::new("a"), "Oven Temperature".to_string());
        names.insert(TagId::new("b"), "Oven".to_string());

        // Longest name substitutes first, so "Oven Temperature" is not
        // torn apart by the shorter "Oven".
        assert_eq!(
            evaluate("Oven Temperature / Oven", &tag_ids, &current, &names),
            40.0
        );
    }

    #[test]
    fn test_negative_values_stay_well_formed() {
        let tag_ids = tags(&["a"]);
        let current = values(&[("a", -5.0)]);
        assert_eq!(
            evaluate("3 * T1", &tag_ids, &current, &HashMap::new()),
            -15.0
        );
        assert_eq!(
            evaluate("-T1", &tag_ids, &current, &HashMap::new()),
            5.0
        );
    }

    #[test]
    fn test_pathological_nesting_is_rejected() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(evaluate(&deep, &[], &HashMap::new(), &HashMap::new()), 0.0);
    }
}
