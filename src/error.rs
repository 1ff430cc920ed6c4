use thiserror::Error;

/// 引擎错误
///
/// 金额换算与颜色提取的降级路径不会产生错误, 这里只覆盖汇率源、图像加载、配置与导出。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("rate source network error: {0}")]
    RateTransport(String),

    #[error("rate source http {status}: {body}")]
    RateHttp { status: u16, body: String },

    #[error("rate source decode error: {0}")]
    RateDecode(String),

    #[error("invalid rate table: {0}")]
    InvalidRateTable(String),

    #[error("image download failed: {0}")]
    ImageDownload(String),

    #[error("invalid data url: {0}")]
    DataUrl(String),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 是否为汇率源故障 (上游问题)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::RateTransport(_) | Self::RateHttp { .. } | Self::RateDecode(_) | Self::InvalidRateTable(_)
        )
    }

    /// 是否为调用方输入错误
    pub fn is_bad_input(&self) -> bool {
        matches!(self, Self::UnknownCurrency(_) | Self::InvalidColor(_) | Self::DataUrl(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
