//! Input rules for property drafts.
//!
//! # Design Decisions
//! - Rules are assembled explicitly with a builder; nothing is registered
//!   globally
//! - Validation returns every violation, not just the first

use serde::Deserialize;

use crate::error::CoreError;

/// The structured `data` part of a property-creation or upload-request form.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PropertyDraft {
    pub name: String,
    pub symbol: String,
    /// Whole units.
    pub valuation: u64,
    /// Whole tokens.
    pub token_supply: u64,
    /// Owner for admin-created properties; ignored for upload requests.
    #[serde(default)]
    pub owner_wallet: Option<String>,
}

type Rule = Box<dyn Fn(&PropertyDraft) -> Option<String> + Send + Sync>;

/// An ordered set of named rules.
#[derive(Default)]
pub struct DraftValidator {
    rules: Vec<(&'static str, Rule)>,
}

impl DraftValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule<F>(mut self, field: &'static str, check: F) -> Self
    where
        F: Fn(&PropertyDraft) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push((field, Box::new(check)));
        self
    }

    /// Name, symbol (3-4 alphanumerics), positive valuation and supply.
    pub fn standard() -> Self {
        Self::new()
            .rule("name", |d| {
                d.name.trim().is_empty().then(|| "must not be empty".to_string())
            })
            .rule("symbol", |d| {
                let ok = (3..=4).contains(&d.symbol.len())
                    && d.symbol.chars().all(|c| c.is_ascii_alphanumeric());
                (!ok).then(|| "must be 3-4 alphanumeric characters".to_string())
            })
            .rule("valuation", |d| {
                (d.valuation == 0).then(|| "must be greater than zero".to_string())
            })
            .rule("token_supply", |d| {
                if d.token_supply == 0 {
                    Some("must be greater than zero".to_string())
                } else if d.token_supply > i64::MAX as u64 {
                    Some("is too large".to_string())
                } else {
                    None
                }
            })
    }

    pub fn validate(&self, draft: &PropertyDraft) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .rules
            .iter()
            .filter_map(|(field, check)| check(draft).map(|msg| format!("{} {}", field, msg)))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate) as a `BadRequest`.
    pub fn check(&self, draft: &PropertyDraft) -> Result<(), CoreError> {
        self.validate(draft)
            .map_err(|errors| CoreError::BadRequest(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PropertyDraft {
        PropertyDraft {
            name: "House A".into(),
            symbol: "HSA".into(),
            valuation: 100_000,
            token_supply: 1000,
            owner_wallet: None,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(DraftValidator::standard().validate(&draft()).is_ok());
    }

    #[test]
    fn test_symbol_rules() {
        let v = DraftValidator::standard();
        for bad in ["HS", "HOUSE", "HS-A", ""] {
            let d = PropertyDraft { symbol: bad.into(), ..draft() };
            assert!(v.validate(&d).is_err(), "{bad} should be rejected");
        }
        let d = PropertyDraft { symbol: "HS42".into(), ..draft() };
        assert!(v.validate(&d).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let d = PropertyDraft { valuation: 0, token_supply: 0, ..draft() };
        let errors = DraftValidator::standard().validate(&d).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("valuation"));
    }

    #[test]
    fn test_custom_rule() {
        let v = DraftValidator::new().rule("name", |d| {
            (d.name.len() > 5).then(|| "too long".to_string())
        });
        assert_eq!(v.validate(&draft()).unwrap_err(), vec!["name too long".to_string()]);
    }

    #[test]
    fn test_deserialize_data_field() {
        let d: PropertyDraft = serde_json::from_str(
            r#"{"name":"House A","symbol":"HSA","valuation":100000,"token_supply":1000,
                "owner_wallet":"0x00000000000000000000000000000000000000aa"}"#,
        )
        .unwrap();
        assert_eq!(d.token_supply, 1000);
        assert!(d.owner_wallet.is_some());
    }
}
