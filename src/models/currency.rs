use serde::Serialize;

/// 币种元数据 (符号、名称、小数位与分隔符)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u32,
    /// 符号在金额之前 ($1,234.56) 还是之后 (1 234,56 €)
    pub symbol_before: bool,
    pub thousands_separator: &'static str,
    pub decimal_separator: &'static str,
}

const fn after(
    code: &'static str,
    symbol: &'static str,
    name: &'static str,
    decimals: u32,
) -> CurrencyInfo {
    CurrencyInfo {
        code,
        symbol,
        name,
        decimals,
        symbol_before: false,
        thousands_separator: " ",
        decimal_separator: ",",
    }
}

const fn before(
    code: &'static str,
    symbol: &'static str,
    name: &'static str,
    decimals: u32,
) -> CurrencyInfo {
    CurrencyInfo {
        code,
        symbol,
        name,
        decimals,
        symbol_before: true,
        thousands_separator: ",",
        decimal_separator: ".",
    }
}

pub static CURRENCIES: &[CurrencyInfo] = &[
    after("XOF", "FCFA", "Franc CFA (BCEAO)", 0),
    after("XAF", "FCFA", "Franc CFA (BEAC)", 0),
    after("EUR", "€", "Euro", 2),
    before("USD", "$", "Dollar américain", 2),
    before("GBP", "£", "Livre sterling", 2),
    before("CAD", "CA$", "Dollar canadien", 2),
    CurrencyInfo {
        code: "CHF",
        symbol: "CHF",
        name: "Franc suisse",
        decimals: 2,
        symbol_before: true,
        thousands_separator: "'",
        decimal_separator: ".",
    },
    after("MAD", "DH", "Dirham marocain", 2),
    after("TND", "DT", "Dinar tunisien", 3),
    after("DZD", "DA", "Dinar algérien", 2),
    after("GNF", "FG", "Franc guinéen", 0),
    after("CDF", "FC", "Franc congolais", 2),
    before("NGN", "₦", "Naira nigérian", 2),
    before("GHS", "GH₵", "Cedi ghanéen", 2),
    before("CNY", "¥", "Yuan renminbi", 2),
    before("JPY", "¥", "Yen japonais", 0),
];

/// 按币种代码查找元数据 (不区分大小写)
pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let info = currency_info("xof").unwrap();
        assert_eq!(info.symbol, "FCFA");
        assert_eq!(info.decimals, 0);
        assert!(currency_info("ZZZ").is_none());
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in CURRENCIES.iter().enumerate() {
            assert!(CURRENCIES[i + 1..].iter().all(|b| b.code != a.code), "duplicate {}", a.code);
        }
    }
}
