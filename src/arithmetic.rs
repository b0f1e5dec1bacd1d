use thiserror::Error;

/// Parentheses nested deeper than this are refused instead of recursing.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ArithmeticError {
    #[error("expression is empty")]
    Empty,
    #[error("character {0:?} is not allowed in an arithmetic expression")]
    InvalidCharacter(char),
    #[error("malformed number {0:?}")]
    MalformedNumber(String),
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("expression is nested too deeply")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
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

/// The arithmetic alphabet: ASCII digits, `.`, `+ - * /`, parentheses and
/// whitespace.
fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | '+' | '-' | '*' | '/' | '(' | ')')
}

/// Evaluate a restricted arithmetic expression.
///
/// The input is validated against the arithmetic alphabet before any parsing
/// happens, so text outside of it is rejected without being interpreted.
pub fn evaluate(expr: &str) -> Result<f64, ArithmeticError> {
    if let Some(bad) = expr.chars().find(|c| !is_allowed(*c)) {
        return Err(ArithmeticError::InvalidCharacter(bad));
    }

    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ArithmeticError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    match parser.peek() {
        None => {}
        Some(Token::RParen) => return Err(ArithmeticError::UnbalancedParens),
        Some(_) => return Err(ArithmeticError::UnexpectedToken(parser.pos)),
    }

    if !value.is_finite() {
        return Err(ArithmeticError::NonFinite);
    }
    Ok(value)
}

/// Print a result the way a person would write it: no trailing `.0` on
/// integral values and no negative zero.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ArithmeticError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                let mut dots = 0;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        end = i + 1;
                    } else if d == '.' {
                        dots += 1;
                        end = i + 1;
                    } else {
                        break;
                    }
                    chars.next();
                }
                let literal = &expr[start..end];
                if dots > 1 || literal == "." {
                    return Err(ArithmeticError::MalformedNumber(literal.to_string()));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ArithmeticError::MalformedNumber(literal.to_string()))?;
                tokens.push(Token::Number(value));
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(ArithmeticError::InvalidCharacter(other)),
                };
                tokens.push(token);
                chars.next();
            }
        }
    }

    Ok(tokens)
}

// expr  := term (('+' | '-') term)*
// term  := unary (('*' | '/') unary)*
// unary := ('+' | '-') unary | primary
// primary := number | '(' expr ')'
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ArithmeticError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ArithmeticError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, ArithmeticError> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            acc = if op == Token::Plus { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, ArithmeticError> {
        let mut acc = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.advance();
            let rhs = self.unary()?;
            acc = if op == Token::Star {
                acc * rhs
            } else {
                if rhs == 0.0 {
                    return Err(ArithmeticError::DivisionByZero);
                }
                acc / rhs
            };
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<f64, ArithmeticError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.descend()?;
                let v = self.unary();
                self.depth -= 1;
                v
            }
            Some(Token::Minus) => {
                self.advance();
                self.descend()?;
                let v = self.unary().map(|v| -v);
                self.depth -= 1;
                v
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, ArithmeticError> {
        let at = self.pos;
        match self.advance() {
            Some(Token::Number(v)) => Ok(v),
            Some(Token::LParen) => {
                self.descend()?;
                let v = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(v),
                    _ => Err(ArithmeticError::UnbalancedParens),
                }
            }
            Some(Token::RParen) => Err(ArithmeticError::UnbalancedParens),
            Some(_) => Err(ArithmeticError::UnexpectedToken(at)),
            None => Err(ArithmeticError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        assert_eq!(evaluate("2+2"), Ok(4.0));
        assert_eq!(evaluate("10 - 4"), Ok(6.0));
        assert_eq!(evaluate("3 * 7"), Ok(21.0));
        assert_eq!(evaluate("9 / 2"), Ok(4.5));
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(evaluate("2 + 3 * 4"), Ok(14.0));
        assert_eq!(evaluate("(2 + 3) * 4"), Ok(20.0));
        assert_eq!(evaluate("10 - 4 - 3"), Ok(3.0));
        assert_eq!(evaluate("100 / 10 / 5"), Ok(2.0));
        assert_eq!(evaluate("2 * (3 + (4 - 1)) / 3"), Ok(4.0));
    }

    #[test]
    fn test_unary_and_decimals() {
        assert_eq!(evaluate("-5 + 2"), Ok(-3.0));
        assert_eq!(evaluate("2 * -3"), Ok(-6.0));
        assert_eq!(evaluate("--4"), Ok(4.0));
        assert_eq!(evaluate(".5 + 1.25"), Ok(1.75));
        assert_eq!(evaluate("5. * 2"), Ok(10.0));
    }

    #[test]
    fn test_rejects_non_arithmetic_text() {
        assert_eq!(
            evaluate("alert(1)+1"),
            Err(ArithmeticError::InvalidCharacter('a'))
        );
        assert_eq!(
            evaluate("2 ** 3; drop"),
            Err(ArithmeticError::InvalidCharacter(';'))
        );
        assert_eq!(evaluate("2^3"), Err(ArithmeticError::InvalidCharacter('^')));
        assert_eq!(
            evaluate("process.exit()"),
            Err(ArithmeticError::InvalidCharacter('p'))
        );
        assert_eq!(evaluate(" (1 + 2) * 3.5 "), Ok(10.5));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(evaluate(""), Err(ArithmeticError::Empty));
        assert_eq!(evaluate("   "), Err(ArithmeticError::Empty));
        assert_eq!(evaluate("+"), Err(ArithmeticError::UnexpectedEnd));
        assert_eq!(evaluate("2 +"), Err(ArithmeticError::UnexpectedEnd));
        assert_eq!(evaluate("(2 + 3"), Err(ArithmeticError::UnbalancedParens));
        assert_eq!(evaluate("2 + 3)"), Err(ArithmeticError::UnbalancedParens));
        assert_eq!(evaluate("()"), Err(ArithmeticError::UnbalancedParens));
        assert_eq!(evaluate("2 3"), Err(ArithmeticError::UnexpectedToken(1)));
        assert_eq!(evaluate("* 2"), Err(ArithmeticError::UnexpectedToken(0)));
        assert_eq!(
            evaluate("1.2.3"),
            Err(ArithmeticError::MalformedNumber("1.2.3".to_string()))
        );
        assert_eq!(
            evaluate(". + 1"),
            Err(ArithmeticError::MalformedNumber(".".to_string()))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0"), Err(ArithmeticError::DivisionByZero));
        assert_eq!(evaluate("1 / (2 - 2)"), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&deep), Err(ArithmeticError::TooDeep));

        let ok = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&ok), Ok(1.0));

        let negations = "-".repeat(MAX_DEPTH + 1) + "1";
        assert_eq!(evaluate(&negations), Err(ArithmeticError::TooDeep));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333333333");
    }
}
