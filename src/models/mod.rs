pub mod currency;
pub mod document;
pub mod exchange;
pub mod line_item;
pub mod palette;

pub use currency::{currency_info, CurrencyInfo, CURRENCIES};
pub use document::{
    Client, DisplayMoney, Document, DocumentKind, DocumentTheme, RenderedDocument, RenderedLine,
    RenderedTotals,
};
pub use exchange::{ExchangeRateTable, RateTableResponse};
pub use line_item::{DocumentTotals, LineItem, TotalsInput};
pub use palette::{
    BrandPalette, ColorOverrides, ColorRole, ExtractedColors, Hsl, ImageSource, Rgb,
};
