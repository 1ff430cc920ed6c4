pub mod handlers;

pub use handlers::*;

use crate::service::{ColorExtractor, CurrencyService, DocumentAssembler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// 共享状态: 汇率服务、配色提取、单据组装
#[derive(Clone)]
pub struct AppState {
    pub currency: Arc<CurrencyService>,
    pub colors: Arc<ColorExtractor>,
    pub assembler: Arc<DocumentAssembler>,
}

impl AppState {
    pub fn new(currency: Arc<CurrencyService>, colors: ColorExtractor) -> Self {
        let assembler = Arc::new(DocumentAssembler::new(currency.clone(), colors.clone()));
        Self {
            currency,
            colors: Arc::new(colors),
            assembler,
        }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    let document_routes = Router::new()
        .route("/api/documents/totals", post(handlers::compute_totals))
        .route("/api/documents/export", post(handlers::export_document))
        .route("/api/documents/render", post(handlers::render_document))
        .with_state(state.assembler);

    let currency_routes = Router::new()
        .route("/api/currency/rates", get(handlers::get_rates))
        .route("/api/currency/refresh", post(handlers::refresh_rates))
        .route("/api/currency/convert", post(handlers::convert))
        .route(
            "/api/currency/display",
            get(handlers::get_display_currency).put(handlers::set_display_currency),
        )
        .route("/api/currency/list", get(handlers::list_currencies))
        .with_state(state.currency);

    let color_routes = Router::new()
        .route("/api/colors/extract", post(handlers::extract_colors))
        .with_state(state.colors);

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(document_routes)
        .merge(currency_routes)
        .merge(color_routes)
        .layer(ServiceBuilder::new())
}
