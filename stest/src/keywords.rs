//! Keyword expressions for selecting tests.
//!
//! An expression is made of keywords combined with `and`, `or`, `not` and
//! parentheses. Adjacent keywords are implicitly joined with `and`, so
//! `"aragorn gff3"` selects the tests tagged with both words. Precedence from
//! tightest to loosest is `not`, `and`, `or`.

use crate::error::KeywordError;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordExpr {
    /// Matches every test
    Any,
    Word(String),
    Not(Box<KeywordExpr>),
    And(Box<KeywordExpr>, Box<KeywordExpr>),
    Or(Box<KeywordExpr>, Box<KeywordExpr>),
}

impl KeywordExpr {
    pub fn parse(input: &str) -> Result<Self, KeywordError> {
        let tokens = tokenize(input);
        if tokens.is_empty() {
            return Ok(KeywordExpr::Any);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(Token::Close) => Err(KeywordError::UnbalancedParens),
            Some(token) => Err(KeywordError::UnexpectedToken {
                token: token.to_string(),
            }),
        }
    }

    /// Evaluate against a whitespace separated keyword list.
    pub fn matches(&self, keywords: &str) -> bool {
        let set: HashSet<&str> = keywords.split_whitespace().collect();
        self.eval(&set)
    }

    fn eval(&self, set: &HashSet<&str>) -> bool {
        match self {
            KeywordExpr::Any => true,
            KeywordExpr::Word(word) => set.contains(word.as_str()),
            KeywordExpr::Not(inner) => !inner.eval(set),
            KeywordExpr::And(lhs, rhs) => lhs.eval(set) && rhs.eval(set),
            KeywordExpr::Or(lhs, rhs) => lhs.eval(set) || rhs.eval(set),
        }
    }
}

impl Default for KeywordExpr {
    fn default() -> Self {
        KeywordExpr::Any
    }
}

impl FromStr for KeywordExpr {
    type Err = KeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::Word(word) => write!(f, "{}", word),
        }
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Word(word.clone()),
        };
        tokens.push(token);
        word.clear();
    };

    for c in input.chars() {
        match c {
            '(' | ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(if c == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);

    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
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

    fn parse_or(&mut self) -> Result<KeywordExpr, KeywordError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = KeywordExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<KeywordExpr, KeywordError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.next();
                }
                Some(Token::Word(_)) | Some(Token::Not) | Some(Token::Open) => {}
                _ => break,
            }
            let rhs = self.parse_unary()?;
            lhs = KeywordExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<KeywordExpr, KeywordError> {
        match self.next() {
            Some(Token::Not) => Ok(KeywordExpr::Not(Box::new(self.parse_unary()?))),
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(KeywordError::UnbalancedParens),
                }
            }
            Some(Token::Word(word)) => Ok(KeywordExpr::Word(word)),
            Some(token) => Err(KeywordError::UnexpectedToken {
                token: token.to_string(),
            }),
            None => Err(KeywordError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARAGORN: &str = "aragorn aragorn_to_gff3";
    const NCRNA: &str = "ncrna infernal infernal_to_gff3";

    #[test]
    fn test_empty_selects_everything() {
        let expr = KeywordExpr::parse("   ").unwrap();
        assert_eq!(expr, KeywordExpr::Any);
        assert!(expr.matches(ARAGORN));
        assert!(expr.matches(""));
    }

    #[test]
    fn test_single_word() {
        let expr = KeywordExpr::parse("aragorn").unwrap();
        assert!(expr.matches(ARAGORN));
        assert!(!expr.matches(NCRNA));
    }

    #[test]
    fn test_word_must_match_whole_keyword() {
        let expr = KeywordExpr::parse("gff3").unwrap();
        assert!(!expr.matches(ARAGORN));
    }

    #[test]
    fn test_juxtaposition_is_and() {
        let expr = KeywordExpr::parse("ncrna infernal").unwrap();
        assert!(expr.matches(NCRNA));
        assert!(!expr.matches("ncrna"));
    }

    #[test]
    fn test_precedence() {
        // not > and > or
        let expr = KeywordExpr::parse("aragorn or ncrna and not infernal").unwrap();
        assert!(expr.matches(ARAGORN));
        assert!(!expr.matches(NCRNA));
        assert!(expr.matches("ncrna"));

        let expr = KeywordExpr::parse("(aragorn or ncrna) and not infernal").unwrap();
        assert!(expr.matches(ARAGORN));
        assert!(!expr.matches(NCRNA));
    }

    #[test]
    fn test_parens_without_spaces() {
        let expr = KeywordExpr::parse("not(aragorn)").unwrap();
        assert!(!expr.matches(ARAGORN));
        assert!(expr.matches(NCRNA));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            KeywordExpr::parse("aragorn and"),
            Err(KeywordError::UnexpectedEnd)
        );
        assert_eq!(
            KeywordExpr::parse("(aragorn"),
            Err(KeywordError::UnbalancedParens)
        );
        assert_eq!(
            KeywordExpr::parse("aragorn)"),
            Err(KeywordError::UnbalancedParens)
        );
        assert_eq!(
            KeywordExpr::parse("or aragorn"),
            Err(KeywordError::UnexpectedToken {
                token: "or".to_string()
            })
        );
    }

    #[test]
    fn test_from_str() {
        let expr: KeywordExpr = "infernal".parse().unwrap();
        assert!(expr.matches(NCRNA));
    }
}
