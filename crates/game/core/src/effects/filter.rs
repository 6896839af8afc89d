//! Effect filters used by administrative allow/block edits.
//!
//! Syntax: `kind` matches any level, `kind<op>N` compares the level, where
//! `<op>` is one of `=`, `!=`, `>`, `>=`, `<`, `<=`.

use core::fmt;
use core::str::FromStr;

use super::kind::EffectKind;
use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    // Two-character operators first so `>=` is not read as `>`.
    const OPERATORS: [(&'static str, Comparison); 6] = [
        (">=", Comparison::Ge),
        ("<=", Comparison::Le),
        ("!=", Comparison::Ne),
        ("=", Comparison::Eq),
        (">", Comparison::Gt),
        ("<", Comparison::Lt),
    ];

    fn test(self, level: u32, expected: u32) -> bool {
        match self {
            Comparison::Eq => level == expected,
            Comparison::Ne => level != expected,
            Comparison::Gt => level > expected,
            Comparison::Ge => level >= expected,
            Comparison::Lt => level < expected,
            Comparison::Le => level <= expected,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// Matches an effect kind, optionally constrained by level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectFilter {
    pub kind: EffectKind,
    pub constraint: Option<(Comparison, u32)>,
}

impl EffectFilter {
    pub fn any_level(kind: EffectKind) -> Self {
        Self {
            kind,
            constraint: None,
        }
    }

    pub fn matches(&self, kind: EffectKind, level: u32) -> bool {
        kind == self.kind
            && self
                .constraint
                .is_none_or(|(comparison, expected)| comparison.test(level, expected))
    }
}

impl FromStr for EffectFilter {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        for (symbol, comparison) in Comparison::OPERATORS {
            if let Some((kind, level)) = input.split_once(symbol) {
                let level = level.trim().parse::<u32>().map_err(|e| {
                    ConfigError::invalid_value(input, format!("invalid level: {e}"))
                })?;
                return Ok(Self {
                    kind: EffectKind::parse(kind)?,
                    constraint: Some((comparison, level)),
                });
            }
        }
        Ok(Self::any_level(EffectKind::parse(input)?))
    }
}

impl fmt::Display for EffectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.constraint {
            Some((comparison, level)) => {
                write!(f, "{}{}{}", self.kind, comparison.symbol(), level)
            }
            None => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectSet;

    #[test]
    fn parses_operators() {
        let filter: EffectFilter = "speed>=2".parse().unwrap();
        assert_eq!(filter.constraint, Some((Comparison::Ge, 2)));
        assert!(filter.matches(EffectKind::Speed, 2));
        assert!(!filter.matches(EffectKind::Speed, 1));
        assert!(!filter.matches(EffectKind::Haste, 3));

        let any: EffectFilter = "haste".parse().unwrap();
        assert!(any.matches(EffectKind::Haste, 9));
        assert_eq!(any.to_string(), "haste");

        assert!("speed>x".parse::<EffectFilter>().is_err());
        assert!("wings=1".parse::<EffectFilter>().is_err());
    }

    #[test]
    fn whitelist_and_blacklist_filtering() {
        let source = EffectSet::from_effects([
            (EffectKind::Speed, 3),
            (EffectKind::Haste, 1),
            (EffectKind::Poison, 1),
        ]);
        let filters = ["speed>1".parse().unwrap(), "poison".parse().unwrap()];

        let mut allowed = source.clone();
        allowed.filter(&filters, true);
        assert_eq!(allowed.len(), 2);
        assert!(!allowed.contains(EffectKind::Haste));

        let mut blocked = source.clone();
        blocked.filter(&filters, false);
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked.get(EffectKind::Haste), Some(1));
    }
}
