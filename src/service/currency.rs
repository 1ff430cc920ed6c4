use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{currency_info, ExchangeRateTable};
use crate::rates::RateSource;
use crate::service::totals::{round2, round_half_up};
use arc_swap::{ArcSwap, ArcSwapOption};
use bigdecimal::BigDecimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 汇率缓存与换算服务
///
/// 整个进程共享一张汇率表, 以基准币种为键: 请求的基准与缓存不一致即视为过期并重新拉取。
/// 读取走原子快照, 不会看到替换到一半的表; 拉取由一把异步锁串行化,
/// 等锁的调用方拿到锁后先复查快照, 并发请求只会触发一次网络调用。
pub struct CurrencyService {
    source: Arc<dyn RateSource>,
    base_currency: String,
    default_currency: String,
    table: ArcSwapOption<ExchangeRateTable>,
    display_currency: ArcSwap<String>,
    fetch_lock: Mutex<()>,
    loading: AtomicBool,
}

impl CurrencyService {
    pub fn new(
        source: Arc<dyn RateSource>,
        base_currency: &str,
        display_currency: &str,
        default_currency: &str,
    ) -> Self {
        Self {
            source,
            base_currency: base_currency.to_uppercase(),
            default_currency: default_currency.to_uppercase(),
            table: ArcSwapOption::empty(),
            display_currency: ArcSwap::from_pointee(display_currency.to_uppercase()),
            fetch_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn from_config(source: Arc<dyn RateSource>, config: &AppConfig) -> Self {
        Self::new(
            source,
            &config.rates.base_currency,
            &config.currency.display_currency,
            &config.currency.default_currency,
        )
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// 是否有拉取正在进行
    pub fn loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// 当前缓存的汇率表 (不触发拉取)
    pub fn cached_table(&self) -> Option<Arc<ExchangeRateTable>> {
        self.table.load_full()
    }

    pub fn display_currency(&self) -> String {
        self.display_currency.load().as_ref().clone()
    }

    /// 切换展示币种, 只接受元数据表中登记的币种
    pub fn set_display_currency(&self, code: &str) -> Result<()> {
        let info = currency_info(code).ok_or_else(|| AppError::UnknownCurrency(code.to_string()))?;
        self.display_currency.store(Arc::new(info.code.to_string()));
        tracing::info!("Display currency set to {}", info.code);
        Ok(())
    }

    /// 获取汇率表: 缓存命中直接返回; 否则拉取并替换缓存
    ///
    /// 拉取失败只记录日志, 返回失败前的缓存 (可能过期或为空)。
    pub async fn fetch_rates(&self, base: &str) -> Option<Arc<ExchangeRateTable>> {
        match self.try_fetch_rates(base).await {
            Ok(table) => Some(table),
            Err(_) => self.cached_table(),
        }
    }

    /// 与 `fetch_rates` 相同, 但把拉取错误交给调用方
    pub async fn try_fetch_rates(&self, base: &str) -> Result<Arc<ExchangeRateTable>> {
        let base = base.to_uppercase();
        if let Some(table) = self.cached_for(&base) {
            tracing::debug!("Exchange rate cache hit for {}", base);
            return Ok(table);
        }

        let _guard = self.fetch_lock.lock().await;
        // 等锁期间其他调用方可能已经拉取完成
        if let Some(table) = self.cached_for(&base) {
            tracing::debug!("Exchange rate fetched by a concurrent caller for {}", base);
            return Ok(table);
        }

        self.fetch_and_store(&base).await
    }

    /// 强制刷新: 清空缓存后按配置的基准币种重新拉取
    pub async fn refresh_rates(&self) -> Option<Arc<ExchangeRateTable>> {
        self.try_refresh_rates().await.ok()
    }

    pub async fn try_refresh_rates(&self) -> Result<Arc<ExchangeRateTable>> {
        let _guard = self.fetch_lock.lock().await;
        self.table.store(None);
        tracing::info!("Exchange rate cache invalidated");
        let base = self.base_currency.clone();
        self.fetch_and_store(&base).await
    }

    fn cached_for(&self, base: &str) -> Option<Arc<ExchangeRateTable>> {
        self.table.load_full().filter(|t| t.base == base)
    }

    /// 调用方必须持有 fetch_lock
    async fn fetch_and_store(&self, base: &str) -> Result<Arc<ExchangeRateTable>> {
        let loading = LoadingGuard::set(&self.loading);
        tracing::info!("Fetching exchange rates for base {}", base);

        let result = self
            .source
            .get_exchange_rates(base)
            .await
            .and_then(ExchangeRateTable::from_response);

        drop(loading);

        match result {
            Ok(table) => {
                let table = Arc::new(table);
                tracing::info!(
                    "Exchange rates loaded: base {}, {} currencies, updated {}",
                    table.base,
                    table.rates.len(),
                    table.time_last_update
                );
                self.table.store(Some(table.clone()));
                Ok(table)
            }
            Err(e) => {
                tracing::error!("Failed to fetch exchange rates for {}: {}", base, e);
                Err(e)
            }
        }
    }

    /// 金额换算 (经基准币种交叉换算), 结果保留两位小数
    ///
    /// 同币种原样返回, 不取整。没有汇率表或任一币种缺失时也原样返回。
    pub fn convert_amount(&self, amount: &BigDecimal, from: &str, to: &str) -> BigDecimal {
        if from.eq_ignore_ascii_case(to) {
            return amount.clone();
        }

        let Some(table) = self.table.load_full() else {
            tracing::debug!("No exchange rates loaded, {} -> {} left unconverted", from, to);
            return amount.clone();
        };

        let (from, to) = (from.to_uppercase(), to.to_uppercase());
        match (table.rate(&from), table.rate(&to)) {
            (Some(rate_from), Some(rate_to)) => round2(&(amount / &rate_from * &rate_to)),
            _ => {
                tracing::warn!(
                    "Missing exchange rate for {} -> {} (base {}), amount left unconverted",
                    from,
                    to,
                    table.base
                );
                amount.clone()
            }
        }
    }

    /// 换算到展示币种
    pub fn to_display(&self, amount: &BigDecimal, from: Option<&str>) -> BigDecimal {
        let from = from.unwrap_or(self.default_currency.as_str());
        self.convert_amount(amount, from, &self.display_currency())
    }

    /// 换算到展示币种并格式化
    pub fn display_amount(&self, amount: &BigDecimal, from: Option<&str>) -> String {
        let to = self.display_currency();
        let from = from.unwrap_or(self.default_currency.as_str());
        format_money(&self.convert_amount(amount, from, &to), &to)
    }
}

/// 拉取期间置位 loading, 析构时复位 (包括 future 被取消的情况)
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 按币种规则格式化金额 (符号、小数位、千分位)
///
/// 未登记的币种保留两位小数, 币种代码作后缀。
pub fn format_money(amount: &BigDecimal, currency: &str) -> String {
    let (symbol, decimals, before, thousands, decimal) = match currency_info(currency) {
        Some(info) => (
            info.symbol.to_string(),
            info.decimals,
            info.symbol_before,
            info.thousands_separator,
            info.decimal_separator,
        ),
        None => (currency.to_uppercase(), 2, false, " ", ","),
    };

    let rounded = round_half_up(amount, decimals as i64);
    let negative = rounded < BigDecimal::from(0);
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (digits, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push_str(thousands);
        }
        grouped.push(c);
    }

    let number = match frac_part {
        Some(f) if decimals > 0 => format!("{}{}{}", grouped, decimal, f),
        _ => grouped,
    };
    let sign = if negative { "-" } else { "" };

    if before {
        // 字母符号 (CHF) 与数字之间留空格
        let spacer = if symbol.ends_with(|c: char| c.is_alphabetic()) { " " } else { "" };
        format!("{}{}{}{}", sign, symbol, spacer, number)
    } else {
        format!("{}{} {}", sign, number, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::StaticRateSource;
    use std::str::FromStr;
    use std::time::Duration;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn source() -> Arc<StaticRateSource> {
        Arc::new(StaticRateSource::new(
            "EUR",
            &[("EUR", 1.0), ("XOF", 655.96), ("USD", 1.08)],
        ))
    }

    fn service(source: Arc<StaticRateSource>) -> CurrencyService {
        CurrencyService::new(source, "EUR", "XOF", "XOF")
    }

    #[tokio::test]
    async fn test_fetch_hits_cache_for_same_base() {
        let src = source();
        let svc = service(src.clone());

        let first = svc.fetch_rates("EUR").await.unwrap();
        let second = svc.fetch_rates("EUR").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(src.calls(), 1);
        assert!(!svc.loading());
    }

    #[tokio::test]
    async fn test_base_mismatch_replaces_cache() {
        let src = source();
        let svc = service(src.clone());

        svc.fetch_rates("EUR").await.unwrap();
        let usd = svc.fetch_rates("usd").await.unwrap();
        assert_eq!(usd.base, "USD");
        assert_eq!(svc.cached_table().unwrap().base, "USD");
        assert_eq!(src.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_always_refetches() {
        let src = source();
        let svc = service(src.clone());

        svc.fetch_rates("EUR").await.unwrap();
        src.set_rate("USD", 1.10);
        let refreshed = svc.refresh_rates().await.unwrap();
        assert_eq!(refreshed.rates["USD"], 1.10);
        assert_eq!(src.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_table() {
        let src = source();
        let svc = service(src.clone());

        svc.fetch_rates("EUR").await.unwrap();
        src.set_failing(true);

        // 基准不一致触发拉取, 失败后仍返回旧表
        let stale = svc.fetch_rates("USD").await.unwrap();
        assert_eq!(stale.base, "EUR");
        assert!(svc.try_fetch_rates("USD").await.is_err());
        assert!(!svc.loading());
    }

    #[tokio::test]
    async fn test_failed_fetch_on_empty_cache() {
        let src = source();
        src.set_failing(true);
        let svc = service(src);

        assert!(svc.fetch_rates("EUR").await.is_none());
        assert_eq!(svc.convert_amount(&dec("100"), "EUR", "USD"), dec("100"));
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_empty() {
        let src = source();
        let svc = service(src.clone());
        svc.fetch_rates("EUR").await.unwrap();

        src.set_failing(true);
        assert!(svc.refresh_rates().await.is_none());
        assert!(svc.cached_table().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_fetches_coalesce() {
        let src = Arc::new(
            StaticRateSource::new("EUR", &[("EUR", 1.0), ("USD", 1.08)])
                .with_delay(Duration::from_millis(50)),
        );
        let svc = Arc::new(service(src.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.fetch_rates("EUR").await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_some());
        }
        assert_eq!(src.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_clears_loading() {
        let src = Arc::new(
            StaticRateSource::new("EUR", &[("EUR", 1.0), ("USD", 1.08)])
                .with_delay(Duration::from_millis(200)),
        );
        let svc = service(src.clone());

        let timed_out = tokio::time::timeout(Duration::from_millis(20), svc.fetch_rates("EUR")).await;
        assert!(timed_out.is_err());
        assert!(!svc.loading());
        assert!(svc.cached_table().is_none());

        // 取消后锁已释放, 下一次拉取正常完成
        assert!(svc.fetch_rates("EUR").await.is_some());
        assert!(!svc.loading());
    }

    #[tokio::test]
    async fn test_same_currency_is_exact_passthrough() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;

        let amount = dec("12.3456");
        let out = svc.convert_amount(&amount, "XOF", "XOF");
        assert_eq!(out.to_string(), "12.3456");
    }

    #[tokio::test]
    async fn test_cross_rate_conversion() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;

        assert_eq!(svc.convert_amount(&dec("1000"), "XOF", "EUR"), dec("1.52"));
        assert_eq!(svc.convert_amount(&dec("100"), "USD", "XOF"), dec("60737.04"));
        assert_eq!(svc.convert_amount(&dec("100"), "EUR", "USD").to_string(), "108.00");
    }

    #[tokio::test]
    async fn test_round_trip_within_one_cent() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;

        for (amount, from, via) in [("100", "USD", "XOF"), ("250.75", "EUR", "USD"), ("19.99", "USD", "EUR")] {
            let original = dec(amount);
            let there = svc.convert_amount(&original, from, via);
            let back = svc.convert_amount(&there, via, from);
            assert!((back - &original).abs() <= dec("0.01"), "{} {} via {}", amount, from, via);
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_cents_drifts() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;

        // 中间金额先取整到分, 返程放大误差
        let usd = svc.convert_amount(&dec("1000"), "XOF", "USD");
        assert_eq!(usd, dec("1.65"));
        let back = svc.convert_amount(&usd, "USD", "XOF");
        assert_eq!(back, dec("1002.16"));
        assert!((back - dec("1000")).abs() > dec("0.01"));
    }

    #[tokio::test]
    async fn test_missing_currency_falls_back() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;
        assert_eq!(svc.convert_amount(&dec("100"), "ZZZ", "EUR").to_string(), "100");
    }

    #[tokio::test]
    async fn test_display_amount() {
        let svc = service(source());
        svc.fetch_rates("EUR").await;

        assert_eq!(svc.display_amount(&dec("100"), Some("USD")), "60 737 FCFA");
        assert_eq!(svc.display_amount(&dec("1500"), None), "1 500 FCFA");

        svc.set_display_currency("eur").unwrap();
        assert_eq!(svc.display_currency(), "EUR");
        assert_eq!(svc.display_amount(&dec("655960"), None), "1 000,00 €");
        assert!(svc.set_display_currency("ZZZ").is_err());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(&dec("1234567.891"), "EUR"), "1 234 567,89 €");
        assert_eq!(format_money(&dec("1234567.891"), "USD"), "$1,234,567.89");
        assert_eq!(format_money(&dec("-5"), "USD"), "-$5.00");
        assert_eq!(format_money(&dec("999.5"), "XOF"), "1 000 FCFA");
        assert_eq!(format_money(&dec("1234.5"), "CHF"), "CHF 1'234.50");
        assert_eq!(format_money(&dec("12.5"), "ZZZ"), "12,50 ZZZ");
        assert_eq!(format_money(&dec("0"), "EUR"), "0,00 €");
    }
}
