//! Value validators for Object and Fact values.
//!
//! Every ObjectType and FactType carries a validator reference that is applied
//! to entity values at creation time. Patterns are compiled once, when the
//! type is registered, and reused for every validation.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Validator reference as declared on a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "parameter")]
pub enum Validator {
    /// Accept every value, including the empty string.
    TrueAlways,
    /// Accept values fully matching the given regular expression.
    Regex(String),
}

impl Default for Validator {
    fn default() -> Self {
        Validator::TrueAlways
    }
}

/// A validator compiled for repeated use.
#[derive(Debug, Clone)]
pub enum CompiledValidator {
    TrueAlways,
    Regex(Regex),
}

impl CompiledValidator {
    /// Compile a validator reference. Regex patterns are anchored so the
    /// whole value must match, not just a substring.
    pub fn compile(validator: &Validator) -> Result<Self, regex::Error> {
        match validator {
            Validator::TrueAlways => Ok(CompiledValidator::TrueAlways),
            Validator::Regex(pattern) => {
                let anchored = format!("^(?:{pattern})$");
                Ok(CompiledValidator::Regex(Regex::new(&anchored)?))
            }
        }
    }

    /// Whether the given value passes this validator.
    pub fn is_valid(&self, value: &str) -> bool {
        match self {
            CompiledValidator::TrueAlways => true,
            CompiledValidator::Regex(regex) => regex.is_match(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_always_accepts_everything() {
        let v = CompiledValidator::compile(&Validator::TrueAlways).unwrap();
        assert!(v.is_valid(""));
        assert!(v.is_valid("anything at all"));
    }

    #[test]
    fn regex_matches_whole_value() {
        let v = CompiledValidator::compile(&Validator::Regex(r"\d{1,3}(\.\d{1,3}){3}".into()))
            .unwrap();
        assert!(v.is_valid("1.2.3.4"));
        assert!(!v.is_valid("not-an-ip"));
        // Substring matches are not enough.
        assert!(!v.is_valid("x1.2.3.4y"));
    }

    #[test]
    fn invalid_pattern_fails_compilation() {
        assert!(CompiledValidator::compile(&Validator::Regex("(unclosed".into())).is_err());
    }
}
