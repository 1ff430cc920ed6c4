use crate::error::{AppError, Result};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 汇率源返回的原始结构
///
/// 兼容 `{ base, rates, time_last_update }` 与 open.er-api 的 `base_code` / `time_last_update_utc` 字段名。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTableResponse {
    #[serde(alias = "base_code")]
    pub base: String,
    pub rates: IndexMap<String, f64>,
    #[serde(default, alias = "time_last_update_utc")]
    pub time_last_update: String,
}

/// 单一基准币种的汇率表, 所有汇率都相对于 `base`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateTable {
    pub base: String,
    pub rates: IndexMap<String, f64>,
    pub time_last_update: String,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRateTable {
    /// 校验并构建汇率表: 基准币种必须在表内且为 1, 其余汇率必须为有限正数
    pub fn from_response(response: RateTableResponse) -> Result<Self> {
        let base = response.base.trim().to_uppercase();
        if base.is_empty() {
            return Err(AppError::InvalidRateTable("empty base currency".to_string()));
        }

        let mut rates = IndexMap::with_capacity(response.rates.len());
        for (code, rate) in response.rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(AppError::InvalidRateTable(format!("rate for {} is {}", code, rate)));
            }
            rates.insert(code.trim().to_uppercase(), rate);
        }

        match rates.get(&base) {
            Some(r) if *r == 1.0 => {}
            Some(r) => {
                return Err(AppError::InvalidRateTable(format!("base {} has rate {}", base, r)));
            }
            None => {
                return Err(AppError::InvalidRateTable(format!("base {} missing from rates", base)));
            }
        }

        Ok(Self {
            base,
            rates,
            time_last_update: response.time_last_update,
            fetched_at: Utc::now(),
        })
    }

    /// 相对基准币种的汇率 (十进制), 币种不存在时返回 None
    pub fn rate(&self, currency: &str) -> Option<BigDecimal> {
        let rate = self.rates.get(currency)?;
        // f64 的 Display 输出最短往返表示, 655.96 不会变成 655.9599999...
        BigDecimal::from_str(&rate.to_string()).ok()
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.rates.contains_key(currency)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(base: &str, rates: &[(&str, f64)]) -> RateTableResponse {
        RateTableResponse {
            base: base.to_string(),
            rates: rates.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
            time_last_update: "Mon, 19 Oct 2026 00:00:01 +0000".to_string(),
        }
    }

    #[test]
    fn test_accepts_valid_table() {
        let table = ExchangeRateTable::from_response(response(
            "EUR",
            &[("EUR", 1.0), ("XOF", 655.96), ("USD", 1.08)],
        ))
        .unwrap();
        assert_eq!(table.base, "EUR");
        assert_eq!(table.rate("XOF").unwrap().to_string(), "655.96");
        assert!(table.rate("ZZZ").is_none());
        assert_eq!(table.currencies().collect::<Vec<_>>(), vec!["EUR", "XOF", "USD"]);
    }

    #[test]
    fn test_rejects_missing_base() {
        let err = ExchangeRateTable::from_response(response("EUR", &[("USD", 1.08)])).unwrap_err();
        assert!(matches!(err, AppError::InvalidRateTable(_)));
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let err = ExchangeRateTable::from_response(response("EUR", &[("EUR", 1.0), ("USD", 0.0)]))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRateTable(_)));
    }

    #[test]
    fn test_accepts_open_er_api_shape() {
        let json = r#"{
            "result": "success",
            "base_code": "EUR",
            "time_last_update_utc": "Mon, 19 Oct 2026 00:00:01 +0000",
            "rates": {"EUR": 1, "XOF": 655.957}
        }"#;
        let parsed: RateTableResponse = serde_json::from_str(json).unwrap();
        let table = ExchangeRateTable::from_response(parsed).unwrap();
        assert_eq!(table.time_last_update, "Mon, 19 Oct 2026 00:00:01 +0000");
        assert!(table.contains("XOF"));
    }
}
