pub mod assembly;
pub mod color;
pub mod currency;
pub mod export;
pub mod totals;

pub use assembly::DocumentAssembler;
pub use color::ColorExtractor;
pub use currency::{format_money, CurrencyService};
pub use export::{export_document_csv, export_document_csv_string};
pub use totals::{compute_totals, round2, round_half_up};
