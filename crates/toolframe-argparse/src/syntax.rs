//! Flag spellings such as `-v`, `--[no-]color`, `-o FILE` or `--level[=N]`.

use crate::error::SpecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagType {
    Boolean,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Required,
    Optional,
}

/// How a value is joined to the flag spelling on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDelim {
    /// `-oFILE` (short flags only)
    Attached,
    /// `-o FILE`, `--output FILE`
    Space,
    /// `--output=FILE`
    Equals,
}

/// One parsed invocation syntax of a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSyntax {
    original: String,
    style: FlagStyle,
    positive: String,
    negative: Option<String>,
    flag_type: FlagType,
    value_type: Option<ValueType>,
    value_delim: Option<ValueDelim>,
    value_label: Option<String>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_name_char(c: char) -> bool {
    is_word_char(c) || c == '-' || c == '?'
}

/// Whether `name` (without leading dashes) is a valid long flag name.
pub(crate) fn is_long_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_word_char(c)) && chars.all(is_name_char)
}

fn label(raw: &str, original: &str) -> Result<String, SpecError> {
    if !raw.is_empty() && raw.chars().all(is_word_char) {
        Ok(raw.to_string())
    } else {
        Err(SpecError::InvalidSyntax(original.to_string()))
    }
}

fn bracketed(raw: &str) -> Option<&str> {
    raw.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
}

impl FlagSyntax {
    /// Parse a flag spelling.
    ///
    /// Supported forms:
    /// - `-a`, `--abc`, `--[no-]abc`
    /// - `-aVAL`, `-a VAL`, `-a[VAL]`, `-a [VAL]`, `-a[ VAL]`
    /// - `--abc VAL`, `--abc=VAL`, `--abc [VAL]`, `--abc=[VAL]`, `--abc[=VAL]`, `--abc[ VAL]`
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let original = raw.trim();
        let invalid = || SpecError::InvalidSyntax(original.to_string());

        if let Some(rest) = original.strip_prefix("--") {
            if let Some(name) = rest.strip_prefix("[no-]") {
                if !is_long_name(name) {
                    return Err(invalid());
                }
                return Ok(Self::boolean(
                    original,
                    FlagStyle::Long,
                    format!("--{name}"),
                    Some(format!("--no-{name}")),
                ));
            }

            let name_end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
            let (name, tail) = rest.split_at(name_end);
            if !is_long_name(name) {
                return Err(invalid());
            }
            let positive = format!("--{name}");
            if tail.is_empty() {
                return Ok(Self::boolean(original, FlagStyle::Long, positive, None));
            }

            let (delim, value_type, value_label) = if let Some(inner) = bracketed(tail) {
                let (delim, rest) = split_delim(inner).ok_or_else(invalid)?;
                (delim, ValueType::Optional, label(rest, original)?)
            } else {
                let (delim, rest) = split_delim(tail).ok_or_else(invalid)?;
                match bracketed(rest) {
                    Some(inner) => (delim, ValueType::Optional, label(inner, original)?),
                    None => (delim, ValueType::Required, label(rest, original)?),
                }
            };
            return Ok(Self::valued(
                original,
                FlagStyle::Long,
                positive,
                value_type,
                delim,
                value_label,
            ));
        }

        let rest = original.strip_prefix('-').ok_or_else(invalid)?;
        let mut chars = rest.chars();
        let flag_char = chars
            .next()
            .filter(|c| is_word_char(*c) || *c == '?')
            .ok_or_else(invalid)?;
        let positive = format!("-{flag_char}");
        let tail = chars.as_str();
        if tail.is_empty() {
            return Ok(Self::boolean(original, FlagStyle::Short, positive, None));
        }

        let (delim, after) = match tail.strip_prefix(' ') {
            Some(after) => (ValueDelim::Space, after),
            None => (ValueDelim::Attached, tail),
        };
        let (delim, value_type, value_label) = match bracketed(after) {
            Some(inner) => match inner.strip_prefix(' ') {
                Some(inner) if delim == ValueDelim::Attached => {
                    (ValueDelim::Space, ValueType::Optional, label(inner, original)?)
                }
                Some(_) => return Err(invalid()),
                None => (delim, ValueType::Optional, label(inner, original)?),
            },
            None => (delim, ValueType::Required, label(after, original)?),
        };
        Ok(Self::valued(
            original,
            FlagStyle::Short,
            positive,
            value_type,
            delim,
            value_label,
        ))
    }

    fn boolean(original: &str, style: FlagStyle, positive: String, negative: Option<String>) -> Self {
        Self {
            original: original.to_string(),
            style,
            positive,
            negative,
            flag_type: FlagType::Boolean,
            value_type: None,
            value_delim: None,
            value_label: None,
        }
    }

    fn valued(
        original: &str,
        style: FlagStyle,
        positive: String,
        value_type: ValueType,
        delim: ValueDelim,
        value_label: String,
    ) -> Self {
        Self {
            original: original.to_string(),
            style,
            positive,
            negative: None,
            flag_type: FlagType::Value,
            value_type: Some(value_type),
            value_delim: Some(delim),
            value_label: Some(value_label),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn style(&self) -> FlagStyle {
        self.style
    }

    /// The plain spelling, e.g. `--color` or `-c`.
    pub fn positive(&self) -> &str {
        &self.positive
    }

    /// The negated spelling for `--[no-]x` syntaxes.
    pub fn negative(&self) -> Option<&str> {
        self.negative.as_deref()
    }

    pub fn flag_type(&self) -> FlagType {
        self.flag_type
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn value_delim(&self) -> Option<ValueDelim> {
        self.value_delim
    }

    pub fn value_label(&self) -> Option<&str> {
        self.value_label.as_deref()
    }

    /// All spellings this syntax answers to, paired with whether the spelling is negated.
    pub fn spellings(&self) -> impl Iterator<Item = (&str, bool)> {
        std::iter::once((self.positive.as_str(), false))
            .chain(self.negative.as_deref().map(|n| (n, true)))
    }
}

fn split_delim(raw: &str) -> Option<(ValueDelim, &str)> {
    if let Some(rest) = raw.strip_prefix('=') {
        Some((ValueDelim::Equals, rest))
    } else {
        raw.strip_prefix(' ').map(|rest| (ValueDelim::Space, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_forms() {
        let s = FlagSyntax::parse("-v").unwrap();
        assert_eq!(s.style(), FlagStyle::Short);
        assert_eq!(s.flag_type(), FlagType::Boolean);
        assert_eq!(s.positive(), "-v");

        let s = FlagSyntax::parse("--[no-]color").unwrap();
        assert_eq!(s.style(), FlagStyle::Long);
        assert_eq!(s.positive(), "--color");
        assert_eq!(s.negative(), Some("--no-color"));
        let spellings: Vec<_> = s.spellings().collect();
        assert_eq!(spellings, vec![("--color", false), ("--no-color", true)]);
    }

    #[test]
    fn parses_long_value_forms() {
        let s = FlagSyntax::parse("--output FILE").unwrap();
        assert_eq!(s.value_type(), Some(ValueType::Required));
        assert_eq!(s.value_delim(), Some(ValueDelim::Space));
        assert_eq!(s.value_label(), Some("FILE"));

        let s = FlagSyntax::parse("--output=FILE").unwrap();
        assert_eq!(s.value_delim(), Some(ValueDelim::Equals));

        let s = FlagSyntax::parse("--level[=N]").unwrap();
        assert_eq!(s.value_type(), Some(ValueType::Optional));
        assert_eq!(s.value_delim(), Some(ValueDelim::Equals));

        let s = FlagSyntax::parse("--level [N]").unwrap();
        assert_eq!(s.value_type(), Some(ValueType::Optional));
        assert_eq!(s.value_delim(), Some(ValueDelim::Space));
        assert_eq!(s.positive(), "--level");
    }

    #[test]
    fn parses_short_value_forms() {
        let s = FlagSyntax::parse("-oFILE").unwrap();
        assert_eq!(s.value_delim(), Some(ValueDelim::Attached));
        assert_eq!(s.value_type(), Some(ValueType::Required));

        let s = FlagSyntax::parse("-o FILE").unwrap();
        assert_eq!(s.value_delim(), Some(ValueDelim::Space));

        let s = FlagSyntax::parse("-l[ N]").unwrap();
        assert_eq!(s.value_delim(), Some(ValueDelim::Space));
        assert_eq!(s.value_type(), Some(ValueType::Optional));

        let s = FlagSyntax::parse("-l[N]").unwrap();
        assert_eq!(s.value_delim(), Some(ValueDelim::Attached));
    }

    #[test]
    fn rejects_malformed_spellings() {
        for bad in ["", "v", "---x", "--", "--=x", "-", "--out=", "--out FILE extra", "--[no-]"] {
            assert!(FlagSyntax::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
