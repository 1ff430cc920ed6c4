use crate::error::Result;
use crate::models::Document;
use std::io::Write;

/// 导出单据明细与汇总为 CSV (单据币种)
///
/// 明细行之后写一行四个空字段作为分隔, 再依次写 subtotal / labor_cost / tax / withholding / total。
pub fn export_document_csv<W: Write>(document: &Document, writer: W) -> Result<()> {
    let mut document = document.clone();
    let totals = document.totals();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["description", "quantity", "unit_price", "total"])?;

    for item in &document.items {
        let quantity = item.quantity.to_string();
        let unit_price = item.unit_price.to_string();
        let total = item.total.to_string();
        wtr.write_record([
            item.description.as_str(),
            quantity.as_str(),
            unit_price.as_str(),
            total.as_str(),
        ])?;
    }

    wtr.write_record(["", "", "", ""])?;
    let summary = [
        ("subtotal", &totals.subtotal),
        ("labor_cost", &totals.labor_cost),
        ("tax", &totals.tax_amount),
        ("withholding", &totals.withholding_amount),
        ("total", &totals.total),
    ];
    for (label, amount) in summary {
        let amount = amount.to_string();
        wtr.write_record([label, "", "", amount.as_str()])?;
    }

    wtr.flush()?;
    tracing::debug!("Exported {} lines for {}", document.items.len(), document.number);
    Ok(())
}

/// 导出为字符串
pub fn export_document_csv_string(document: &Document) -> Result<String> {
    let mut buf = Vec::new();
    export_document_csv(document, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, ColorOverrides, DocumentKind, LineItem};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_export_lines_and_totals() {
        let document = Document {
            number: "DEV-7".to_string(),
            kind: DocumentKind::Quote,
            issue_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            due_date: None,
            client: Client {
                name: "Atelier, Dakar".to_string(),
                email: None,
                address: None,
            },
            currency: "XOF".to_string(),
            items: vec![
                LineItem::new("Peinture, murs", dec("2"), dec("15000")),
                LineItem::new("Enduit", dec("1"), dec("5000")),
            ],
            labor_cost: dec("10000"),
            tax_rate: dec("18"),
            withholding_rate: dec("5"),
            notes: None,
            logo: None,
            color_overrides: ColorOverrides::default(),
        };

        let csv = export_document_csv_string(&document).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "description,quantity,unit_price,total");
        assert_eq!(lines[1], "\"Peinture, murs\",2,15000,30000.00");
        assert_eq!(lines[2], "Enduit,1,5000,5000.00");
        assert_eq!(lines[3], ",,,");
        assert_eq!(lines[4], "subtotal,,,45000.00");
        assert_eq!(lines[6], "tax,,,8100.00");
        assert_eq!(lines[7], "withholding,,,2250.00");
        assert_eq!(lines[8], "total,,,50850.00");
    }
}
