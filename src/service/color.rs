use crate::config::ColorsConfig;
use crate::error::{AppError, Result};
use crate::models::palette::FALLBACK_ACCENT;
use crate::models::{ExtractedColors, Hsl, ImageSource, Rgb};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;
use reqwest::Client;
use std::time::Duration;

/// 采样尺寸: Logo 统一缩放到 64x64 再统计
pub const SAMPLE_SIZE: u32 = 64;
/// alpha 低于此值 (约 50% 不透明度) 的像素视为透明
const MIN_ALPHA: u8 = 128;
/// 通道极差低于此值视为灰色
const MIN_CHANNEL_SPREAD: u8 = 30;
const MAX_LIGHTNESS: f64 = 90.0;
const MIN_LIGHTNESS: f64 = 10.0;
/// 有效像素少于此数量时使用默认配色
const MIN_PIXELS: usize = 10;
const MAX_CLUSTERS: usize = 5;
const KMEANS_ITERATIONS: usize = 10;
/// 聚类中心饱和度不高于此值 (百分比) 时丢弃
const MIN_CENTROID_SATURATION: f64 = 10.0;
/// 没有第二个聚类时, 由主色各通道提亮得到辅色
const SECONDARY_OFFSET: u8 = 60;
/// 强调色与主色的最小色相差 (度)
const ACCENT_HUE_DISTANCE: f64 = 60.0;
/// 远程 Logo 默认大小上限
const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
/// 深色判定阈值 (加权亮度)
const DARK_LUMINANCE: f64 = 150.0;

// ---------------------------------------------------------------------------
// 颜色工具
// ---------------------------------------------------------------------------

pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

/// 解析 `#rrggbb` (不区分大小写, `#` 可省略)
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl {
        h: h * 60.0,
        s: s * 100.0,
        l: l * 100.0,
    }
}

/// RGB 空间欧氏距离
pub fn color_distance(a: Rgb, b: Rgb) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// 加权亮度 (0.299 / 0.587 / 0.114) 低于 150 视为深色
pub fn is_color_dark(rgb: Rgb) -> bool {
    let luminance = 0.299 * rgb.r as f64 + 0.587 * rgb.g as f64 + 0.114 * rgb.b as f64;
    luminance < DARK_LUMINANCE
}

/// 向白色线性插值, factor 取 0..=1
pub fn lighten_color(rgb: Rgb, factor: f64) -> Rgb {
    let factor = factor.clamp(0.0, 1.0);
    let mix = |c: u8| (c as f64 + (255.0 - c as f64) * factor).round() as u8;
    Rgb::new(mix(rgb.r), mix(rgb.g), mix(rgb.b))
}

/// 背景色上可读的文字颜色
pub fn text_color_for(background: &str) -> &'static str {
    match hex_to_rgb(background) {
        Some(rgb) if is_color_dark(rgb) => "#ffffff",
        _ => "#111827",
    }
}

fn hue_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

fn offset_channels(rgb: Rgb, offset: u8) -> Rgb {
    Rgb::new(
        rgb.r.saturating_add(offset),
        rgb.g.saturating_add(offset),
        rgb.b.saturating_add(offset),
    )
}

/// 灰色、近白、近黑的像素不代表品牌色
pub fn is_neutral(rgb: Rgb) -> bool {
    let max = rgb.r.max(rgb.g).max(rgb.b);
    let min = rgb.r.min(rgb.g).min(rgb.b);
    if max - min < MIN_CHANNEL_SPREAD {
        return true;
    }
    let l = rgb_to_hsl(rgb).l;
    l > MAX_LIGHTNESS || l < MIN_LIGHTNESS
}

// ---------------------------------------------------------------------------
// 提取算法
// ---------------------------------------------------------------------------

/// 过滤透明与中性像素, 保持扫描顺序
pub fn qualifying_pixels(sample: &RgbaImage) -> Vec<Rgb> {
    sample
        .pixels()
        .filter(|p| p.0[3] >= MIN_ALPHA)
        .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
        .filter(|rgb| !is_neutral(*rgb))
        .collect()
}

fn nearest_centroid(pixel: Rgb, centroids: &[Rgb]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = color_distance(pixel, *c);
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

/// k-means 聚类
///
/// 以前 k 个像素作为初始中心 (结果可复现), 固定迭代次数; 空簇保留原中心。
pub fn kmeans(pixels: &[Rgb], k: usize, iterations: usize) -> Vec<Rgb> {
    let k = k.min(pixels.len());
    let mut centroids: Vec<Rgb> = pixels[..k].to_vec();

    for _ in 0..iterations {
        let assignments: Vec<usize> = pixels
            .par_iter()
            .map(|p| nearest_centroid(*p, &centroids))
            .collect();

        let mut sums = vec![(0u64, 0u64, 0u64, 0u64); k];
        for (pixel, &cluster) in pixels.iter().zip(&assignments) {
            let sum = &mut sums[cluster];
            sum.0 += pixel.r as u64;
            sum.1 += pixel.g as u64;
            sum.2 += pixel.b as u64;
            sum.3 += 1;
        }

        for (centroid, (r, g, b, count)) in centroids.iter_mut().zip(sums) {
            if count == 0 {
                continue;
            }
            let avg = |sum: u64| (sum as f64 / count as f64).round() as u8;
            *centroid = Rgb::new(avg(r), avg(g), avg(b));
        }
    }

    centroids
}

/// 从聚类中心选出主色 / 辅色 / 强调色, 没有足够鲜艳的中心时返回 None
///
/// 强调色的色相差按色环计算 (350° 与 10° 相差 20°), 不是直接取差的绝对值。
pub fn select_palette(centroids: &[Rgb]) -> Option<ExtractedColors> {
    let mut vivid: Vec<(Rgb, Hsl)> = centroids
        .iter()
        .map(|c| (*c, rgb_to_hsl(*c)))
        .filter(|(_, hsl)| hsl.s > MIN_CENTROID_SATURATION)
        .collect();

    // 稳定排序, 饱和度相同时保持聚类顺序
    vivid.sort_by(|a, b| b.1.s.partial_cmp(&a.1.s).unwrap_or(std::cmp::Ordering::Equal));

    let (primary, primary_hsl) = *vivid.first()?;

    let secondary = vivid
        .get(1)
        .map(|(rgb, _)| *rgb)
        .unwrap_or_else(|| offset_channels(primary, SECONDARY_OFFSET));

    let accent = vivid[1..]
        .iter()
        .find(|(_, hsl)| hue_distance(hsl.h, primary_hsl.h) > ACCENT_HUE_DISTANCE)
        .map(|(rgb, _)| rgb_to_hex(*rgb))
        .unwrap_or_else(|| FALLBACK_ACCENT.to_string());

    Some(ExtractedColors {
        primary: rgb_to_hex(primary),
        secondary: rgb_to_hex(secondary),
        accent,
    })
}

/// 由有效像素计算配色
pub fn palette_from_pixels(pixels: &[Rgb]) -> ExtractedColors {
    if pixels.len() < MIN_PIXELS {
        tracing::info!("Only {} colored pixels in logo, using fallback palette", pixels.len());
        return ExtractedColors::fallback();
    }

    let k = MAX_CLUSTERS.min(pixels.len());
    let centroids = kmeans(pixels, k, KMEANS_ITERATIONS);

    match select_palette(&centroids) {
        Some(colors) => {
            tracing::debug!(
                "Extracted palette {} / {} / {} from {} pixels",
                colors.primary,
                colors.secondary,
                colors.accent,
                pixels.len()
            );
            colors
        }
        None => {
            tracing::info!("No saturated cluster in logo, using fallback palette");
            ExtractedColors::fallback()
        }
    }
}

/// 缩放到 64x64 后提取配色
pub fn extract_from_image(img: &DynamicImage) -> ExtractedColors {
    if img.width() == 0 || img.height() == 0 {
        return ExtractedColors::fallback();
    }
    let sample = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        .to_rgba8();
    palette_from_pixels(&qualifying_pixels(&sample))
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// 解码图像字节并提取配色, 解码失败返回默认配色
pub fn extract_from_bytes(bytes: &[u8]) -> ExtractedColors {
    match decode_image(bytes) {
        Ok(img) => extract_from_image(&img),
        Err(e) => {
            tracing::warn!("Failed to decode logo image: {}", e);
            ExtractedColors::fallback()
        }
    }
}

/// 解析 `data:<mime>;base64,<payload>`
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| AppError::DataUrl("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::DataUrl("missing payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(AppError::DataUrl("only base64 payloads are supported".to_string()));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(payload)
        .map_err(|e| AppError::DataUrl(e.to_string()))
}

// ---------------------------------------------------------------------------
// 异步提取服务
// ---------------------------------------------------------------------------

/// Logo 配色提取服务
///
/// 任何失败 (下载、超时、解码、有效像素不足) 都返回默认配色, 不会报错。
/// 超时覆盖下载和解码全过程; 远程图片超过 `max_bytes` 直接放弃。
#[derive(Debug, Clone)]
pub struct ColorExtractor {
    http: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl ColorExtractor {
    pub fn new(http: Client, timeout: Duration) -> Self {
        Self {
            http,
            timeout,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn from_config(config: &ColorsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.image_timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ImageDownload(e.to_string()))?;
        Ok(Self::new(http, timeout).with_max_bytes(config.max_image_bytes))
    }

    pub async fn extract_colors_from_image(&self, source: &ImageSource) -> ExtractedColors {
        let work = async {
            let bytes = match self.load(source).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Failed to load logo, using fallback palette: {}", e);
                    return ExtractedColors::fallback();
                }
            };

            match tokio::task::spawn_blocking(move || extract_from_bytes(&bytes)).await {
                Ok(colors) => colors,
                Err(e) => {
                    tracing::error!("Color extraction task failed: {}", e);
                    ExtractedColors::fallback()
                }
            }
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(colors) => colors,
            Err(_) => {
                tracing::warn!("Logo extraction timed out after {:?}, using fallback palette", self.timeout);
                ExtractedColors::fallback()
            }
        }
    }

    async fn load(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::DataUrl(url) => decode_data_url(url),
            ImageSource::Url(url) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(AppError::ImageDownload(format!("unsupported url: {}", url)));
                }
                let mut res = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| AppError::ImageDownload(e.to_string()))?;
                if let Some(len) = res.content_length() {
                    if len > self.max_bytes {
                        return Err(AppError::ImageDownload(format!(
                            "logo too large: {} bytes (max {})",
                            len, self.max_bytes
                        )));
                    }
                }

                // Content-Length 可能缺失或不实, 读取时再限制一次
                let mut bytes = Vec::new();
                while let Some(chunk) = res
                    .chunk()
                    .await
                    .map_err(|e| AppError::ImageDownload(e.to_string()))?
                {
                    if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                        return Err(AppError::ImageDownload(format!(
                            "logo exceeds {} bytes",
                            self.max_bytes
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                Ok(bytes)
            }
        }
    }
}
