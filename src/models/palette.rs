use crate::error::{AppError, Result};
use crate::service::color::{hex_to_rgb, rgb_to_hex};
use serde::{Deserialize, Serialize};

/// RGB 像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// HSL 颜色: h 为角度 (0-360), s 与 l 为百分比 (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// 从 Logo 提取的品牌色 (小写 #rrggbb)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

pub const FALLBACK_PRIMARY: &str = "#1e40af";
pub const FALLBACK_SECONDARY: &str = "#3b82f6";
pub const FALLBACK_ACCENT: &str = "#f59e0b";

impl ExtractedColors {
    /// 加载失败或有效像素不足时使用的固定配色
    pub fn fallback() -> Self {
        Self {
            primary: FALLBACK_PRIMARY.to_string(),
            secondary: FALLBACK_SECONDARY.to_string(),
            accent: FALLBACK_ACCENT.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}

impl Default for ExtractedColors {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Logo 图像来源: data URL 或远程 URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageSource {
    DataUrl(String),
    Url(String),
}

impl From<String> for ImageSource {
    fn from(value: String) -> Self {
        if value.trim_start().starts_with("data:") {
            Self::DataUrl(value)
        } else {
            Self::Url(value)
        }
    }
}

impl From<&str> for ImageSource {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ImageSource> for String {
    fn from(value: ImageSource) -> Self {
        match value {
            ImageSource::DataUrl(s) | ImageSource::Url(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRole {
    Primary,
    Secondary,
    Accent,
}

/// 用户手动覆盖的颜色, 未设置的字段沿用提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

impl ColorOverrides {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none() && self.accent.is_none()
    }

    /// 校验所有已设置的覆盖色并统一为小写
    pub fn normalized(&self) -> Result<Self> {
        let norm = |v: &Option<String>| v.as_deref().map(normalize_hex).transpose();
        Ok(Self {
            primary: norm(&self.primary)?,
            secondary: norm(&self.secondary)?,
            accent: norm(&self.accent)?,
        })
    }
}

/// 校验 #rrggbb 并转为小写
pub fn normalize_hex(hex: &str) -> Result<String> {
    hex_to_rgb(hex)
        .map(rgb_to_hex)
        .ok_or_else(|| AppError::InvalidColor(hex.to_string()))
}

/// 单据品牌配色: 提取结果 + 手动覆盖
///
/// 覆盖一直生效, 直到 Logo 换成另一张图。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandPalette {
    pub logo: Option<ImageSource>,
    pub extracted: ExtractedColors,
    pub overrides: ColorOverrides,
}

impl BrandPalette {
    pub fn new(logo: Option<ImageSource>, extracted: ExtractedColors) -> Self {
        Self {
            logo,
            extracted,
            overrides: ColorOverrides::default(),
        }
    }

    pub fn set_override(&mut self, role: ColorRole, hex: &str) -> Result<()> {
        let hex = normalize_hex(hex)?;
        match role {
            ColorRole::Primary => self.overrides.primary = Some(hex),
            ColorRole::Secondary => self.overrides.secondary = Some(hex),
            ColorRole::Accent => self.overrides.accent = Some(hex),
        }
        Ok(())
    }

    pub fn clear_override(&mut self, role: ColorRole) {
        match role {
            ColorRole::Primary => self.overrides.primary = None,
            ColorRole::Secondary => self.overrides.secondary = None,
            ColorRole::Accent => self.overrides.accent = None,
        }
    }

    /// 更换 Logo: 图源变化时清空所有覆盖, 同一图源重复提交则保留
    pub fn replace_logo(&mut self, logo: Option<ImageSource>, extracted: ExtractedColors) {
        if self.logo != logo {
            self.overrides = ColorOverrides::default();
        }
        self.logo = logo;
        self.extracted = extracted;
    }

    /// 实际生效的配色
    pub fn effective(&self) -> ExtractedColors {
        let pick = |o: &Option<String>, e: &String| o.clone().unwrap_or_else(|| e.clone());
        ExtractedColors {
            primary: pick(&self.overrides.primary, &self.extracted.primary),
            secondary: pick(&self.overrides.secondary, &self.extracted.secondary),
            accent: pick(&self.overrides.accent, &self.extracted.accent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(primary: &str) -> ExtractedColors {
        ExtractedColors {
            primary: primary.to_string(),
            secondary: "#222222".to_string(),
            accent: "#333333".to_string(),
        }
    }

    #[test]
    fn test_image_source_kind() {
        assert!(matches!(ImageSource::from("data:image/png;base64,AAAA"), ImageSource::DataUrl(_)));
        assert!(matches!(ImageSource::from("https://cdn.example.com/logo.png"), ImageSource::Url(_)));
    }

    #[test]
    fn test_override_wins_until_logo_changes() {
        let logo = Some(ImageSource::from("https://cdn.example.com/a.png"));
        let mut palette = BrandPalette::new(logo.clone(), extracted("#111111"));

        palette.set_override(ColorRole::Primary, "#ABCDEF").unwrap();
        assert_eq!(palette.effective().primary, "#abcdef");
        assert_eq!(palette.effective().secondary, "#222222");

        // 同一 Logo 重新提取, 覆盖保留
        palette.replace_logo(logo, extracted("#444444"));
        assert_eq!(palette.effective().primary, "#abcdef");

        // 换 Logo, 覆盖清空
        palette.replace_logo(Some(ImageSource::from("https://cdn.example.com/b.png")), extracted("#555555"));
        assert_eq!(palette.effective().primary, "#555555");
        assert!(palette.overrides.is_empty());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut palette = BrandPalette::default();
        assert!(palette.set_override(ColorRole::Accent, "red").is_err());
        assert!(palette.set_override(ColorRole::Accent, "#12345").is_err());
        assert!(palette.overrides.is_empty());
    }

    #[test]
    fn test_clear_override() {
        let mut palette = BrandPalette::default();
        palette.set_override(ColorRole::Secondary, "#000000").unwrap();
        palette.clear_override(ColorRole::Secondary);
        assert_eq!(palette.effective(), ExtractedColors::fallback());
    }
}
