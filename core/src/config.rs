//! Ambient configuration layer (§10.3): assembles a running system from a config source
//! before `Strategy::on_init` is invoked. This layer loads and validates; it does not render
//! an editing UI (that remains out of scope as a feature — see `vantage_strategies::schema`
//! for the typed control tree the UI layer would render).

use std::collections::HashMap;

use crate::error::RuntimeError;

/// A strategy's account/instrument list plus its free-form key-value config bag, as
/// consumed by `Strategy::on_init` (mirrors the original `IStrategy::Configuration`).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrategyConfig {
    /// Account ids this strategy instance operates against.
    pub accounts: Vec<String>,
    /// Instrument ids this strategy instance trades.
    pub instruments: Vec<String>,
    /// Free-form key-value config, as rendered by the control tree in
    /// `vantage_strategies::schema`.
    pub values: HashMap<String, String>,
}

impl StrategyConfig {
    pub fn new(accounts: Vec<String>, instruments: Vec<String>) -> Self {
        Self {
            accounts,
            instruments,
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Fetches a required string field, surfacing `RuntimeError::ConfigInvalid` if absent.
    pub fn require_str(&self, key: &str) -> Result<&str, RuntimeError> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| RuntimeError::ConfigInvalid(format!("missing required field '{key}'")))
    }

    /// Fetches a required numeric field, parsed as `rust_decimal::Decimal`, surfacing
    /// `RuntimeError::ConfigInvalid` on missing or unparseable input.
    pub fn require_decimal(&self, key: &str) -> Result<rust_decimal::Decimal, RuntimeError> {
        let raw = self.require_str(key)?;
        raw.parse().map_err(|_| {
            RuntimeError::ConfigInvalid(format!("field '{key}' is not a valid number: '{raw}'"))
        })
    }

    /// Fetches an optional numeric field bounded to `[min, max]`, surfacing
    /// `RuntimeError::ConfigInvalid` if it's present but out of range.
    pub fn decimal_in_range(
        &self,
        key: &str,
        min: rust_decimal::Decimal,
        max: rust_decimal::Decimal,
    ) -> Result<Option<rust_decimal::Decimal>, RuntimeError> {
        let Some(raw) = self.values.get(key) else {
            return Ok(None);
        };
        let value: rust_decimal::Decimal = raw.parse().map_err(|_| {
            RuntimeError::ConfigInvalid(format!("field '{key}' is not a valid number: '{raw}'"))
        })?;
        if value < min || value > max {
            return Err(RuntimeError::ConfigInvalid(format!(
                "field '{key}' = {value} out of range [{min}, {max}]"
            )));
        }
        Ok(Some(value))
    }

    /// Validates that at least one account and one instrument are configured. Strategies
    /// with further structural requirements extend this with their own checks before
    /// `on_init` runs.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.accounts.is_empty() {
            return Err(RuntimeError::ConfigInvalid("no accounts configured".into()));
        }
        if self.instruments.is_empty() {
            return Err(RuntimeError::ConfigInvalid("no instruments configured".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validate_rejects_empty_accounts_or_instruments() {
        let cfg = StrategyConfig::new(vec![], vec!["PETR4".into()]);
        assert!(matches!(cfg.validate(), Err(RuntimeError::ConfigInvalid(_))));

        let cfg = StrategyConfig::new(vec!["ACC1".into()], vec![]);
        assert!(matches!(cfg.validate(), Err(RuntimeError::ConfigInvalid(_))));

        let cfg = StrategyConfig::new(vec!["ACC1".into()], vec!["PETR4".into()]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn require_decimal_parses_or_fails() {
        let cfg = StrategyConfig::new(vec!["A".into()], vec!["I".into()])
            .with_value("max_size", "10.5");
        assert_eq!(cfg.require_decimal("max_size").unwrap(), dec!(10.5));
        assert!(cfg.require_decimal("missing").is_err());
    }

    #[test]
    fn decimal_in_range_flags_out_of_bounds() {
        let cfg = StrategyConfig::new(vec!["A".into()], vec!["I".into()])
            .with_value("leverage", "50");
        let result = cfg.decimal_in_range("leverage", dec!(1), dec!(20));
        assert!(matches!(result, Err(RuntimeError::ConfigInvalid(_))));
    }
}
