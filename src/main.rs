use invoice_engine::{router, AppConfig, AppState, ColorExtractor, CurrencyService, HttpRateSource};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 汇率源与共享缓存
    let source = Arc::new(HttpRateSource::from_config(&config.rates)?);
    let currency = Arc::new(CurrencyService::from_config(source, &config));
    let colors = ColorExtractor::from_config(&config.colors)?;

    // 启动时预取汇率, 失败不影响服务启动
    if currency.fetch_rates(currency.base_currency()).await.is_none() {
        info!("Exchange rates unavailable at startup, amounts will render unconverted");
    }

    let app = router(AppState::new(currency, colors));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/documents/totals   - line items and totals");
    info!("  POST /api/documents/render   - renderable document model");
    info!("  POST /api/documents/export   - CSV export");
    info!("  GET  /api/currency/rates     - cached exchange rates");
    info!("  POST /api/currency/refresh   - force rate refresh");
    info!("  POST /api/currency/convert   - amount conversion");
    info!("  POST /api/colors/extract     - brand colors from logo");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
