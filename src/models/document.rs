use crate::models::{ColorOverrides, DocumentTotals, ExtractedColors, ImageSource, LineItem};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn zero() -> BigDecimal {
    BigDecimal::zero()
}

/// 单据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Quote,
}

impl DocumentKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Invoice => "FACTURE",
            Self::Quote => "DEVIS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// 单据 (发票 / 报价单)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub number: String,
    pub kind: DocumentKind,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub client: Client,
    /// 单据编制币种
    pub currency: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default = "zero")]
    pub labor_cost: BigDecimal,
    #[serde(default = "zero")]
    pub tax_rate: BigDecimal,
    #[serde(default = "zero")]
    pub withholding_rate: BigDecimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub logo: Option<ImageSource>,
    #[serde(default)]
    pub color_overrides: ColorOverrides,
}

impl Document {
    /// 重算明细行后返回汇总 (单据币种)
    pub fn totals(&mut self) -> DocumentTotals {
        for item in &mut self.items {
            item.recompute();
        }
        DocumentTotals::compute(&self.items, &self.labor_cost, &self.tax_rate, &self.withholding_rate)
    }
}

/// 一行已换算、已格式化的金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMoney {
    pub amount: BigDecimal,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedLine {
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: DisplayMoney,
    pub total: DisplayMoney,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTotals {
    pub subtotal: DisplayMoney,
    pub labor_cost: DisplayMoney,
    pub tax_rate: BigDecimal,
    pub tax_amount: DisplayMoney,
    pub withholding_rate: BigDecimal,
    pub withholding_amount: DisplayMoney,
    pub total: DisplayMoney,
}

/// 品牌主题: 生效配色 + 派生的文字色与浅色背景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTheme {
    pub colors: ExtractedColors,
    pub text_on_primary: String,
    pub background_tint: String,
}

/// 可直接渲染的单据模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub title: String,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub client: Client,
    pub source_currency: String,
    pub currency: String,
    pub lines: Vec<RenderedLine>,
    pub totals: RenderedTotals,
    pub theme: DocumentTheme,
    pub notes: Option<String>,
}
