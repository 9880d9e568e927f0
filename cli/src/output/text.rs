use anyhow::Result;
use pbix_inspect::{ArchiveEntry, Model};
use std::io::Write;

const RULE_WIDTH: usize = 80;

pub fn write_listing<W: Write>(
    w: &mut W,
    file_name: &str,
    entries: &[ArchiveEntry],
) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "Contents of {}:", file_name)?;
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;

    for entry in entries {
        writeln!(w, "{:<60} {:>15}", entry.name, format_size(entry.size_bytes))?;
    }

    writeln!(w)?;
    writeln!(w, "Total files: {}", entries.len())?;
    Ok(())
}

/// Writes the model block, or a single "not available" line when extraction
/// produced nothing. The cause of a failure is logged, not printed here.
pub fn write_model_section<W: Write>(w: &mut W, model: Option<&Model>) -> Result<()> {
    writeln!(w)?;
    let Some(model) = model else {
        writeln!(w, "Data model: not available")?;
        return Ok(());
    };

    writeln!(w, "Data model:")?;
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;

    writeln!(w, "Tables ({}):", model.tables.len())?;
    for table in &model.tables {
        writeln!(w, "  {} [{}]", table.name, table.table_type)?;
        if let Some(desc) = &table.description {
            writeln!(w, "    {}", desc)?;
        }
        for column in &table.columns {
            match &column.description {
                Some(desc) => writeln!(
                    w,
                    "    - {}: {} ({})",
                    column.name, column.data_type, desc
                )?,
                None => writeln!(w, "    - {}: {}", column.name, column.data_type)?,
            }
        }
    }

    writeln!(w)?;
    writeln!(w, "Relationships ({}):", model.relationships.len())?;
    for rel in &model.relationships {
        writeln!(
            w,
            "  {}.{} -> {}.{}",
            rel.source_table, rel.source_column, rel.target_table, rel.target_column
        )?;
    }

    writeln!(w)?;
    writeln!(w, "Measures ({}):", model.measures.len())?;
    for measure in &model.measures {
        writeln!(w, "  {}", measure.name)?;
        writeln!(w, "    Caption: {}", measure.caption)?;
        let mut lines = measure.expression.lines();
        writeln!(w, "    Expression: {}", lines.next().unwrap_or(""))?;
        for line in lines {
            writeln!(w, "      {}", line)?;
        }
    }

    Ok(())
}

/// `1234` -> `"1,234 bytes"`.
fn format_size(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{} bytes", grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbix_inspect::{Column, Measure, Relationship, Table};

    fn render_model(model: Option<&Model>) -> String {
        let mut out = Vec::new();
        write_model_section(&mut out, model).expect("render model");
        String::from_utf8(out).expect("utf8")
    }

    fn sales_model() -> Model {
        Model {
            tables: vec![Table {
                name: "Sales".to_string(),
                description: None,
                table_type: "TABLE".to_string(),
                columns: vec![
                    Column {
                        name: "OrderID".to_string(),
                        data_type: "int".to_string(),
                        description: None,
                    },
                    Column {
                        name: "Amount".to_string(),
                        data_type: "decimal".to_string(),
                        description: Some("Net amount".to_string()),
                    },
                ],
            }],
            relationships: vec![Relationship {
                source_table: "Customers".to_string(),
                source_column: "ID".to_string(),
                target_table: "Sales".to_string(),
                target_column: "CustomerID".to_string(),
            }],
            measures: vec![Measure {
                name: "TotalSales".to_string(),
                caption: "Total Sales".to_string(),
                expression: "SUM(Sales[Amount])".to_string(),
                is_visible: true,
            }],
        }
    }

    #[test]
    fn size_gets_thousands_separators() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1_234), "1,234 bytes");
        assert_eq!(format_size(12_345_678), "12,345,678 bytes");
    }

    #[test]
    fn listing_aligns_columns_and_counts_files() {
        let entries = vec![ArchiveEntry {
            name: "Report/Layout".to_string(),
            size_bytes: 500,
        }];
        let mut out = Vec::new();
        write_listing(&mut out, "report.pbix", &entries).expect("render listing");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("Contents of report.pbix:"));
        let row = format!("{:<60} {:>15}", "Report/Layout", "500 bytes");
        assert!(text.contains(&row), "row should be aligned: {text}");
        assert!(text.trim_end().ends_with("Total files: 1"));
    }

    #[test]
    fn model_block_lists_columns_in_order() {
        let text = render_model(Some(&sales_model()));

        let order_id = text.find("- OrderID: int").expect("OrderID listed");
        let amount = text.find("- Amount: decimal (Net amount)").expect("Amount listed");
        assert!(order_id < amount);
        assert!(text.contains("  Customers.ID -> Sales.CustomerID\n"));
        assert!(text.contains("  TotalSales\n    Caption: Total Sales\n"));
        assert!(text.contains("    Expression: SUM(Sales[Amount])"));
    }

    #[test]
    fn multi_line_expressions_are_indented() {
        let mut model = sales_model();
        model.measures[0].expression = "VAR x = 1\nRETURN x".to_string();
        let text = render_model(Some(&model));
        assert!(text.contains("    Expression: VAR x = 1\n      RETURN x\n"));
    }

    #[test]
    fn absent_model_prints_single_line() {
        let text = render_model(None);
        assert_eq!(text, "\nData model: not available\n");
    }
}
