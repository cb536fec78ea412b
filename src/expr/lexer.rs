use crate::error::ParseError;

/// Infix lexeme together with its byte offset in the source text.
#[derive(Clone, Debug, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LexemeKind {
    Number(f64),
    Identifier(String),
    /// One of `+ - * / ^ @ ( )`.
    Operator(char),
}

impl LexemeKind {
    /// Text used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Identifier(name) => name.clone(),
            Self::Operator(c) => c.to_string(),
        }
    }
}

const OPERATORS: &[char] = &['+', '-', '*', '/', '^', '@', '(', ')'];

/// Splits infix text into lexemes.
///
/// Numbers start with a digit or `.` and hold at most one `.`; identifiers are an
/// ASCII letter followed by letters or digits. Whitespace separates lexemes.
pub fn tokenize(text: &str) -> Result<Vec<Lexeme>, ParseError> {
    let bytes = text.as_bytes();
    let mut lexemes = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            let mut seen_dot = false;
            while i < bytes.len() {
                let d = bytes[i] as char;
                if d.is_ascii_digit() {
                    i += 1;
                } else if d == '.' && !seen_dot {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            // "1.2.3" would otherwise lex as two adjacent numbers
            if i < bytes.len() && bytes[i] == b'.' {
                return Err(ParseError::MalformedNumber { position: start });
            }
            let value = text[start..i]
                .parse::<f64>()
                .map_err(|_| ParseError::MalformedNumber { position: start })?;
            lexemes.push(Lexeme {
                kind: LexemeKind::Number(value),
                position: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                i += 1;
            }
            lexemes.push(Lexeme {
                kind: LexemeKind::Identifier(text[start..i].to_string()),
                position: start,
            });
            continue;
        }

        if OPERATORS.contains(&c) {
            lexemes.push(Lexeme {
                kind: LexemeKind::Operator(c),
                position: i,
            });
            i += 1;
            continue;
        }

        // report the full (possibly multi-byte) character
        let character = text[i..].chars().next().unwrap_or(c);
        return Err(ParseError::UnexpectedCharacter {
            character,
            position: i,
        });
    }

    Ok(lexemes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<LexemeKind> {
        tokenize(text).unwrap().into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn splits_numbers_identifiers_and_operators() {
        assert_eq!(
            kinds("40/sqrt((x+22)^2)"),
            vec![
                LexemeKind::Number(40.0),
                LexemeKind::Operator('/'),
                LexemeKind::Identifier("sqrt".into()),
                LexemeKind::Operator('('),
                LexemeKind::Operator('('),
                LexemeKind::Identifier("x".into()),
                LexemeKind::Operator('+'),
                LexemeKind::Number(22.0),
                LexemeKind::Operator(')'),
                LexemeKind::Operator('^'),
                LexemeKind::Number(2.0),
                LexemeKind::Operator(')'),
            ]
        );
    }

    #[test]
    fn leading_and_trailing_dots() {
        assert_eq!(kinds(".5"), vec![LexemeKind::Number(0.5)]);
        assert_eq!(kinds("5."), vec![LexemeKind::Number(5.0)]);
    }

    #[test]
    fn identifiers_may_contain_digits() {
        assert_eq!(
            kinds("r2 * a1b"),
            vec![
                LexemeKind::Identifier("r2".into()),
                LexemeKind::Operator('*'),
                LexemeKind::Identifier("a1b".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert_eq!(
            tokenize("x + 1.2.3"),
            Err(ParseError::MalformedNumber { position: 4 })
        );
        assert_eq!(tokenize("."), Err(ParseError::MalformedNumber { position: 0 }));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert_eq!(
            tokenize("x % 2"),
            Err(ParseError::UnexpectedCharacter {
                character: '%',
                position: 2
            })
        );
        assert!(matches!(
            tokenize("x²"),
            Err(ParseError::UnexpectedCharacter { character: '²', .. })
        ));
    }
}
