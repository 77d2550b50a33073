//! SPDX license expressions.
//!
//! Parses expressions such as `CC-BY-4.0`, `MIT OR Apache-2.0` or
//! `GPL-2.0-or-later WITH Classpath-exception-2.0` against the SPDX license
//! list shipped with the `spdx` crate, and renders them back in canonical
//! form.

use std::fmt;

use thiserror::Error;

/// Deepest parenthesis nesting accepted in an expression.
pub const MAX_NESTING: usize = 64;

/// Longest input [`suggest`] compares against the vocabulary.
const MAX_SUGGESTION_INPUT: usize = 128;

/// Every SPDX license identifier, canonical casing, deprecated ids included.
pub fn license_ids() -> impl Iterator<Item = &'static str> {
    spdx::identifiers::LICENSES.iter().map(|(id, _, _)| *id)
}

/// Every SPDX license exception identifier.
pub fn exception_ids() -> impl Iterator<Item = &'static str> {
    spdx::identifiers::EXCEPTIONS.iter().map(|(id, _)| *id)
}

/// Errors raised while parsing a license expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    #[error("empty license expression")]
    Empty,

    #[error("Unknown license key(s): {}", .0.join(", "))]
    UnknownKeys(Vec<String>),

    #[error("Unknown license exception: {0}")]
    UnknownException(String),

    #[error("Invalid expression: {0}")]
    Syntax(String),
}

/// A parsed license expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseExpr {
    License { id: String, or_later: bool },
    /// `LicenseRef-*` or `DocumentRef-*:LicenseRef-*`.
    Reference(String),
    With { license: Box<LicenseExpr>, exception: String },
    And(Vec<LicenseExpr>),
    Or(Vec<LicenseExpr>),
}

impl LicenseExpr {
    /// Canonical rendering, parenthesising nested compound terms.
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn is_compound(&self) -> bool {
        matches!(self, LicenseExpr::And(_) | LicenseExpr::Or(_))
    }
}

impl fmt::Display for LicenseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseExpr::License { id, or_later } => {
                write!(f, "{id}")?;
                if *or_later {
                    write!(f, "+")?;
                }
                Ok(())
            }
            LicenseExpr::Reference(r) => write!(f, "{r}"),
            LicenseExpr::With { license, exception } => write!(f, "{license} WITH {exception}"),
            LicenseExpr::And(terms) | LicenseExpr::Or(terms) => {
                let op = if matches!(self, LicenseExpr::And(_)) { " AND " } else { " OR " };
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(op)?;
                    }
                    if term.is_compound() {
                        write!(f, "({term})")?;
                    } else {
                        write!(f, "{term}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    With,
    Word(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.to_uppercase().as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "WITH" => Token::With,
            _ => Token::Word(word.clone()),
        };
        tokens.push(token);
        word.clear();
    };
    for ch in input.chars() {
        match ch {
            '(' | ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(if ch == '(' { Token::Open } else { Token::Close });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

fn canonical_license(key: &str) -> Option<&'static str> {
    license_ids().find(|id| id.eq_ignore_ascii_case(key))
}

fn canonical_exception(key: &str) -> Option<&'static str> {
    exception_ids().find(|id| id.eq_ignore_ascii_case(key))
}

fn is_reference(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    let tail = match lower.split_once(':') {
        Some((doc, rest)) if doc.starts_with("documentref-") && doc.len() > "documentref-".len() => rest,
        Some(_) => return false,
        None => lower.as_str(),
    };
    tail.starts_with("licenseref-")
        && tail.len() > "licenseref-".len()
        && tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    unknown: Vec<String>,
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

    fn or_expr(&mut self) -> Result<LicenseExpr, LicenseError> {
        let mut terms = vec![self.and_expr()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.and_expr()?);
        }
        Ok(flatten(terms, false))
    }

    fn and_expr(&mut self) -> Result<LicenseExpr, LicenseError> {
        let mut terms = vec![self.with_expr()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.with_expr()?);
        }
        Ok(flatten(terms, true))
    }

    fn with_expr(&mut self) -> Result<LicenseExpr, LicenseError> {
        let license = self.primary()?;
        if self.peek() != Some(&Token::With) {
            return Ok(license);
        }
        self.pos += 1;
        if license.is_compound() {
            return Err(LicenseError::Syntax("WITH must follow a single license".to_string()));
        }
        match self.next() {
            Some(Token::Word(word)) => {
                let exception = canonical_exception(&word).ok_or(LicenseError::UnknownException(word))?;
                Ok(LicenseExpr::With {
                    license: Box::new(license),
                    exception: exception.to_string(),
                })
            }
            _ => Err(LicenseError::Syntax("WITH must be followed by an exception".to_string())),
        }
    }

    fn primary(&mut self) -> Result<LicenseExpr, LicenseError> {
        match self.next() {
            Some(Token::Open) => {
                if self.depth >= MAX_NESTING {
                    return Err(LicenseError::Syntax("expression nested too deeply".to_string()));
                }
                self.depth += 1;
                let inner = self.or_expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(LicenseError::Syntax("unbalanced parenthesis".to_string())),
                }
            }
            Some(Token::Word(word)) => Ok(self.license(word)),
            Some(Token::Close) => Err(LicenseError::Syntax("unbalanced parenthesis".to_string())),
            Some(Token::And) => Err(LicenseError::Syntax("unexpected AND".to_string())),
            Some(Token::Or) => Err(LicenseError::Syntax("unexpected OR".to_string())),
            Some(Token::With) => Err(LicenseError::Syntax("unexpected WITH".to_string())),
            None => Err(LicenseError::Syntax("expression ends with an operator".to_string())),
        }
    }

    fn license(&mut self, word: String) -> LicenseExpr {
        if is_reference(&word) {
            return LicenseExpr::Reference(word);
        }
        let (key, or_later) = match word.strip_suffix('+') {
            Some(base) => (base, true),
            None => (word.as_str(), false),
        };
        match canonical_license(key) {
            Some(id) => LicenseExpr::License {
                id: id.to_string(),
                or_later,
            },
            None => {
                self.unknown.push(word.clone());
                LicenseExpr::License { id: word, or_later: false }
            }
        }
    }
}

/// Merge directly nested terms of the same operator: `(A OR B) OR C` is
/// `A OR B OR C`.
fn flatten(terms: Vec<LicenseExpr>, conjunction: bool) -> LicenseExpr {
    let mut flat = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            LicenseExpr::And(inner) if conjunction => flat.extend(inner),
            LicenseExpr::Or(inner) if !conjunction => flat.extend(inner),
            other => flat.push(other),
        }
    }
    match (flat.len(), conjunction) {
        (1, _) => flat.remove(0),
        (_, true) => LicenseExpr::And(flat),
        (_, false) => LicenseExpr::Or(flat),
    }
}

/// Parse and validate an SPDX license expression.
pub fn parse(input: &str) -> Result<LicenseExpr, LicenseError> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Err(LicenseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        unknown: Vec::new(),
    };
    let expr = parser.or_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(LicenseError::Syntax("unexpected trailing symbols".to_string()));
    }
    if !parser.unknown.is_empty() {
        return Err(LicenseError::UnknownKeys(parser.unknown));
    }
    Ok(expr)
}

/// Parse and render in canonical form.
pub fn normalize(input: &str) -> Result<String, LicenseError> {
    parse(input).map(|e| e.render())
}

/// Up to `max` known identifiers similar to `value`, best first.
///
/// Similarity is the normalised Levenshtein ratio on upper-cased strings;
/// only candidates at or above `cutoff` are returned.
pub fn suggest(value: &str, max: usize, cutoff: f64) -> Vec<&'static str> {
    let needle = value.trim().to_uppercase();
    // No identifier is anywhere near this long.
    if needle.len() > MAX_SUGGESTION_INPUT {
        return Vec::new();
    }
    let mut scored: Vec<(f64, &'static str)> = license_ids()
        .map(|id| (strsim::normalized_levenshtein(&needle, &id.to_uppercase()), id))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(max).map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_identifier_is_canonicalised() {
        assert_eq!(normalize("cc-by-4.0").unwrap(), "CC-BY-4.0");
        assert_eq!(normalize("  MIT ").unwrap(), "MIT");
        assert_eq!(normalize("GPL-2.0+").unwrap(), "GPL-2.0+");
    }

    #[test]
    fn test_compound_expressions() {
        assert_eq!(normalize("mit or apache-2.0").unwrap(), "MIT OR Apache-2.0");
        assert_eq!(
            normalize("MIT OR (Apache-2.0 AND BSD-3-Clause)").unwrap(),
            "MIT OR (Apache-2.0 AND BSD-3-Clause)"
        );
        assert_eq!(normalize("(MIT OR ISC) OR Zlib").unwrap(), "MIT OR ISC OR Zlib");
        assert_eq!(
            normalize("GPL-2.0-or-later with classpath-exception-2.0").unwrap(),
            "GPL-2.0-or-later WITH Classpath-exception-2.0"
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("MIT AND ISC OR Zlib").unwrap();
        assert!(matches!(expr, LicenseExpr::Or(ref terms) if terms.len() == 2));
        assert_eq!(expr.render(), "(MIT AND ISC) OR Zlib");
    }

    #[test]
    fn test_references() {
        assert_eq!(normalize("LicenseRef-DMI-Open").unwrap(), "LicenseRef-DMI-Open");
        assert!(parse("DocumentRef-spdx:LicenseRef-1").is_ok());
        assert!(parse("LicenseRef-").is_err());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(LicenseError::Empty));
        assert_eq!(parse("CC-BY"), Err(LicenseError::UnknownKeys(vec!["CC-BY".to_string()])));
        assert!(matches!(parse("MIT AND"), Err(LicenseError::Syntax(_))));
        assert!(matches!(parse("(MIT"), Err(LicenseError::Syntax(_))));
        assert!(matches!(parse("MIT ISC"), Err(LicenseError::Syntax(_))));
        assert!(matches!(parse("MIT WITH Nope"), Err(LicenseError::UnknownException(_))));
    }

    #[test]
    fn test_full_spdx_list() {
        assert_eq!(normalize("etalab-2.0").unwrap(), "etalab-2.0");
        assert_eq!(normalize("cc-by-3.0-de").unwrap(), "CC-BY-3.0-DE");
        assert_eq!(normalize("Etalab-2.0 OR cc-by-4.0").unwrap(), "etalab-2.0 OR CC-BY-4.0");
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deep = format!("{}MIT{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(
            parse(&deep),
            Err(LicenseError::Syntax("expression nested too deeply".to_string()))
        );
        let ok = format!("{}MIT{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(normalize(&ok).unwrap(), "MIT");
    }

    #[test]
    fn test_suggestions() {
        let s = suggest("CC-BY-4", 3, 0.6);
        assert_eq!(s.first(), Some(&"CC-BY-4.0"));
        assert!(s.len() <= 3);
        assert!(suggest("completely different", 3, 0.6).is_empty());
        assert!(suggest(&"CC-BY-4.0".repeat(100), 3, 0.0).is_empty());
    }
}
