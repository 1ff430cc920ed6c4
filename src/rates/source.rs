use crate::error::{AppError, Result};
use crate::models::RateTableResponse;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 汇率源: 返回相对 `base` 的完整汇率表 (含 `rates[base] == 1`)
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_exchange_rates(&self, base: &str) -> Result<RateTableResponse>;
}

/// 内存汇率源, 用于离线运行和测试
///
/// 表按构造时的基准币种存放, 请求其他基准时按交叉汇率重新折算。
pub struct StaticRateSource {
    base: String,
    rates: Mutex<IndexMap<String, f64>>,
    delay: Duration,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl StaticRateSource {
    pub fn new(base: &str, rates: &[(&str, f64)]) -> Self {
        Self {
            base: base.to_string(),
            rates: Mutex::new(rates.iter().map(|(c, r)| (c.to_string(), *r)).collect()),
            delay: Duration::ZERO,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// 模拟网络延迟
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 之后的请求是否失败
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_rate(&self, currency: &str, rate: f64) {
        if let Ok(mut guard) = self.rates.lock() {
            guard.insert(currency.to_string(), rate);
        }
    }

    /// 已收到的请求次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn get_exchange_rates(&self, base: &str) -> Result<RateTableResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::RateTransport("static source set to fail".to_string()));
        }

        let rates = self
            .rates
            .lock()
            .map(|g| g.clone())
            .map_err(|e| AppError::RateTransport(e.to_string()))?;

        let pivot = *rates
            .get(base)
            .ok_or_else(|| AppError::RateHttp { status: 404, body: format!("unsupported base {}", base) })?;

        let rebased = rates
            .into_iter()
            .map(|(code, rate)| {
                let value = if code == base { 1.0 } else { rate / pivot };
                (code, value)
            })
            .collect();

        Ok(RateTableResponse {
            base: base.to_string(),
            rates: rebased,
            time_last_update: format!("static ({})", self.base),
        })
    }
}
