use crate::error::Result;
use crate::models::{
    BrandPalette, DisplayMoney, Document, DocumentTheme, ExtractedColors, RenderedDocument,
    RenderedLine, RenderedTotals,
};
use crate::service::color::{hex_to_rgb, lighten_color, rgb_to_hex, text_color_for, ColorExtractor};
use crate::service::currency::{format_money, CurrencyService};
use bigdecimal::BigDecimal;
use std::sync::Arc;

/// 背景浅色 = 主色向白色插值 90%
const BACKGROUND_TINT: f64 = 0.9;

/// 单据组装: 汇总计算 + 展示币种换算 + 品牌配色
pub struct DocumentAssembler {
    currency: Arc<CurrencyService>,
    colors: ColorExtractor,
}

impl DocumentAssembler {
    pub fn new(currency: Arc<CurrencyService>, colors: ColorExtractor) -> Self {
        Self { currency, colors }
    }

    /// 生成可渲染的单据模型
    ///
    /// `currency` 为空时使用服务的展示币种。汇率不可用时金额保持单据币种原值。
    pub async fn render(&self, mut document: Document, currency: Option<&str>) -> Result<RenderedDocument> {
        let overrides = document.color_overrides.normalized()?;

        let source_currency = document.currency.to_uppercase();
        let target = currency
            .map(str::to_uppercase)
            .unwrap_or_else(|| self.currency.display_currency());

        if source_currency != target {
            // 首次使用时加载汇率, 失败也继续渲染
            self.currency.fetch_rates(self.currency.base_currency()).await;
        }

        let totals = document.totals();
        let money = |amount: &BigDecimal| {
            let converted = self.currency.convert_amount(amount, &source_currency, &target);
            let formatted = format_money(&converted, &target);
            DisplayMoney {
                amount: converted,
                formatted,
            }
        };

        let lines = document
            .items
            .iter()
            .map(|item| RenderedLine {
                description: item.description.clone(),
                quantity: item.quantity.clone(),
                unit_price: money(&item.unit_price),
                total: money(&item.total),
            })
            .collect();

        let rendered_totals = RenderedTotals {
            subtotal: money(&totals.subtotal),
            labor_cost: money(&totals.labor_cost),
            tax_rate: totals.tax_rate.clone(),
            tax_amount: money(&totals.tax_amount),
            withholding_rate: totals.withholding_rate.clone(),
            withholding_amount: money(&totals.withholding_amount),
            total: money(&totals.total),
        };

        let extracted = match &document.logo {
            Some(logo) => self.colors.extract_colors_from_image(logo).await,
            None => ExtractedColors::fallback(),
        };
        let mut palette = BrandPalette::new(document.logo.clone(), extracted);
        palette.overrides = overrides;
        let theme = build_theme(palette.effective());

        tracing::info!(
            "Rendered {} {} ({} lines, {} -> {})",
            document.kind.title(),
            document.number,
            document.items.len(),
            source_currency,
            target
        );

        Ok(RenderedDocument {
            title: document.kind.title().to_string(),
            number: document.number,
            issue_date: document.issue_date,
            due_date: document.due_date,
            client: document.client,
            source_currency,
            currency: target,
            lines,
            totals: rendered_totals,
            theme,
            notes: document.notes,
        })
    }
}

/// 由生效配色派生文字色与背景浅色
pub fn build_theme(colors: ExtractedColors) -> DocumentTheme {
    let text_on_primary = text_color_for(&colors.primary).to_string();
    let background_tint = hex_to_rgb(&colors.primary)
        .map(|rgb| rgb_to_hex(lighten_color(rgb, BACKGROUND_TINT)))
        .unwrap_or_else(|| "#ffffff".to_string());

    DocumentTheme {
        colors,
        text_on_primary,
        background_tint,
    }
}
