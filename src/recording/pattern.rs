//! Filename pattern rendering.
//!
//! Patterns use `{name}` placeholders, e.g.
//! `videos/{account}_{year}-{month}-{day}_{sequence}`. `{{` and `}}` produce
//! literal braces.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::error::TemplateError;

/// One parsed piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Account,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Sequence,
}

impl Token {
    fn placeholder(name: &str) -> Option<Self> {
        match name {
            "account" | "username" => Some(Self::Account),
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            "second" => Some(Self::Second),
            "sequence" => Some(Self::Sequence),
            _ => None,
        }
    }
}

/// Values a pattern is rendered against.
#[derive(Debug, Clone)]
pub struct NameFields<'a> {
    pub account: &'a str,
    pub started_at: NaiveDateTime,
    pub sequence: u64,
}

/// A validated filename pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<Token>,
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedClose { offset }),
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed { offset });
                    }
                    let token = Token::placeholder(name.trim()).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.clone(),
                            offset,
                        }
                    })?;
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        if tokens.is_empty() {
            return Err(TemplateError::Empty);
        }

        Ok(Self { tokens })
    }

    /// Render the pattern. Deterministic for equal inputs.
    pub fn render(&self, fields: &NameFields<'_>) -> String {
        let t = &fields.started_at;
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Account => out.push_str(fields.account),
                Token::Year => out.push_str(&format!("{:04}", t.year())),
                Token::Month => out.push_str(&format!("{:02}", t.month())),
                Token::Day => out.push_str(&format!("{:02}", t.day())),
                Token::Hour => out.push_str(&format!("{:02}", t.hour())),
                Token::Minute => out.push_str(&format!("{:02}", t.minute())),
                Token::Second => out.push_str(&format!("{:02}", t.second())),
                Token::Sequence => out.push_str(&fields.sequence.to_string()),
            }
        }
        out
    }
}

/// Parse and render in one step.
pub fn generate_filename(pattern: &str, fields: &NameFields<'_>) -> Result<String, TemplateError> {
    let name = NamePattern::parse(pattern)?.render(fields);
    if name.is_empty() {
        return Err(TemplateError::Empty);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn fields(account: &str, sequence: u64) -> NameFields<'_> {
        NameFields {
            account,
            started_at: start(),
            sequence,
        }
    }

    #[test]
    fn test_render_account_date_sequence() {
        let name =
            generate_filename("{account}_{year}{month}{day}_{sequence}", &fields("alice", 0))
                .unwrap();
        assert_eq!(name, "alice_20240102_0");
    }

    #[test]
    fn test_render_time_fields_zero_padded() {
        let name = generate_filename("{hour}-{minute}-{second}", &fields("bob", 7)).unwrap();
        assert_eq!(name, "03-04-05");
    }

    #[test]
    fn test_username_alias_and_directories() {
        let name = generate_filename("videos/{username}/{sequence}", &fields("carol", 12)).unwrap();
        assert_eq!(name, "videos/carol/12");
    }

    #[test]
    fn test_escaped_braces() {
        let name = generate_filename("{{{account}}}", &fields("dave", 0)).unwrap();
        assert_eq!(name, "{dave}");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = NamePattern::parse("{account}_{week}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder {
                name: "week".to_string(),
                offset: 10
            }
        );
    }

    #[test]
    fn test_unclosed_and_stray_braces_rejected() {
        assert_eq!(
            NamePattern::parse("{account").unwrap_err(),
            TemplateError::Unclosed { offset: 0 }
        );
        assert_eq!(
            NamePattern::parse("a}b").unwrap_err(),
            TemplateError::UnmatchedClose { offset: 1 }
        );
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert_eq!(NamePattern::parse("").unwrap_err(), TemplateError::Empty);
        assert_eq!(
            generate_filename("{account}", &fields("", 0)).unwrap_err(),
            TemplateError::Empty
        );
    }

    #[test]
    fn test_render_is_repeatable() {
        let pattern = NamePattern::parse("{account}_{sequence}").unwrap();
        let f = fields("eve", 3);
        assert_eq!(pattern.render(&f), pattern.render(&f));
    }
}
