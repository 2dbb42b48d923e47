use crate::normalize::collapse_whitespace;
use crate::types::Table;
use scraper::{Html, Selector};

/// Every `<table>` in document order as rows of `<td>`/`<th>` text.
///
/// Rows without cells and tables without rows are dropped. Nested tables are
/// visited on their own as well as contributing rows to their parent.
pub fn extract_tables(document: &Html) -> Vec<Table> {
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td, th"),
    ) else {
        return Vec::new();
    };

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        let rows: Vec<Vec<String>> = table
            .select(&row_sel)
            .map(|row| {
                row.select(&cell_sel)
                    .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();
        if !rows.is_empty() {
            tables.push(Table { rows });
        }
    }
    tables
}

/// Plain-text rendition appended to body text: a `Tables:` header, then one
/// `Table N:` block per table with cells joined by ` | `.
pub fn render_tables(tables: &[Table]) -> String {
    if tables.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\nTables:\n");
    for (i, table) in tables.iter().enumerate() {
        out.push_str(&format!("\nTable {}:\n", i + 1));
        for row in &table.rows {
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
    }
    out
}
