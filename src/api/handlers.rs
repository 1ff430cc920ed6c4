use crate::error::AppError;
use crate::models::{
    Document, DocumentTotals, ExchangeRateTable, ExtractedColors, ImageSource, LineItem, TotalsInput,
    CURRENCIES,
};
use crate::service::color::text_color_for;
use crate::service::{export_document_csv_string, format_money, ColorExtractor, CurrencyService, DocumentAssembler};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Response {
        let body = Self {
            success: true,
            message: message.into(),
            data: Some(data),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

fn error_response(e: &AppError) -> Response {
    let status = if e.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else if e.is_bad_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = ApiResponse::<()> {
        success: false,
        message: format!("Error: {}", e),
        data: None,
    };
    (status, Json(body)).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

// ---------------------------------------------------------------------------
// 单据
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub items: Vec<LineItem>,
    pub totals: DocumentTotals,
}

/// 重算明细行与单据汇总
pub async fn compute_totals(Json(input): Json<TotalsInput>) -> Response {
    let (items, totals) = input.evaluate();
    ApiResponse::ok(
        format!("Computed totals for {} items", items.len()),
        TotalsResponse { items, totals },
    )
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub document: Document,
    #[serde(default)]
    pub currency: Option<String>,
}

/// 生成可渲染的单据模型
pub async fn render_document(
    State(assembler): State<Arc<DocumentAssembler>>,
    Json(req): Json<RenderRequest>,
) -> Response {
    let number = req.document.number.clone();
    match assembler.render(req.document, req.currency.as_deref()).await {
        Ok(rendered) => ApiResponse::ok(format!("Rendered {}", number), rendered),
        Err(e) => {
            tracing::warn!("Rendering {} failed: {}", number, e);
            error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub document: Document,
}

/// 导出 CSV
pub async fn export_document(Json(req): Json<ExportRequest>) -> Response {
    match export_document_csv_string(&req.document) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("CSV export of {} failed: {}", req.document.number, e);
            error_response(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// 汇率
// ---------------------------------------------------------------------------

/// 当前汇率表 (必要时拉取)
pub async fn get_rates(State(service): State<Arc<CurrencyService>>) -> Response {
    match service.try_fetch_rates(service.base_currency()).await {
        Ok(table) => rates_response("Exchange rates", &table),
        Err(e) => error_response(&e),
    }
}

/// 强制刷新汇率
pub async fn refresh_rates(State(service): State<Arc<CurrencyService>>) -> Response {
    match service.try_refresh_rates().await {
        Ok(table) => rates_response("Exchange rates refreshed", &table),
        Err(e) => error_response(&e),
    }
}

fn rates_response(message: &str, table: &ExchangeRateTable) -> Response {
    ApiResponse::ok(
        format!("{}: base {}, {} currencies", message, table.base, table.rates.len()),
        table.clone(),
    )
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub amount: BigDecimal,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub amount: BigDecimal,
    pub from: String,
    pub to: String,
    pub converted: BigDecimal,
    pub formatted: String,
}

/// 金额换算; 汇率不可用时返回原金额
pub async fn convert(
    State(service): State<Arc<CurrencyService>>,
    Json(req): Json<ConvertRequest>,
) -> Response {
    if !req.from.eq_ignore_ascii_case(&req.to) {
        service.fetch_rates(service.base_currency()).await;
    }

    let converted = service.convert_amount(&req.amount, &req.from, &req.to);
    let formatted = format_money(&converted, &req.to);
    ApiResponse::ok(
        format!("Converted {} -> {}", req.from, req.to),
        ConvertResponse {
            amount: req.amount,
            from: req.from.to_uppercase(),
            to: req.to.to_uppercase(),
            converted,
            formatted,
        },
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayCurrency {
    pub currency: String,
}

pub async fn get_display_currency(State(service): State<Arc<CurrencyService>>) -> Response {
    ApiResponse::ok(
        "Display currency",
        DisplayCurrency {
            currency: service.display_currency(),
        },
    )
}

pub async fn set_display_currency(
    State(service): State<Arc<CurrencyService>>,
    Json(req): Json<DisplayCurrency>,
) -> Response {
    match service.set_display_currency(&req.currency) {
        Ok(()) => ApiResponse::ok(
            "Display currency updated",
            DisplayCurrency {
                currency: service.display_currency(),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// 支持的币种列表
pub async fn list_currencies() -> Response {
    ApiResponse::ok(format!("{} currencies", CURRENCIES.len()), CURRENCIES)
}

// ---------------------------------------------------------------------------
// 品牌色
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub source: ImageSource,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub colors: ExtractedColors,
    pub fallback: bool,
    pub text_color: String,
}

/// 从 Logo 提取品牌色, 总是返回一组有效颜色
pub async fn extract_colors(
    State(extractor): State<Arc<ColorExtractor>>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let colors = extractor.extract_colors_from_image(&req.source).await;
    let text_color = text_color_for(&colors.primary).to_string();
    ApiResponse::ok(
        "Colors extracted",
        ExtractResponse {
            fallback: colors.is_fallback(),
            colors,
            text_color,
        },
    )
}
