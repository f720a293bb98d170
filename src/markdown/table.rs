//! HTML tables as pipe tables

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use super::text::flatten;

static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

/// Convert `table` into a pipe table, the first row becoming the header.
/// With `tables` off the table degrades to plain text, one line per row.
pub fn convert(table: ElementRef<'_>, tables: bool) -> String {
    let rows: Vec<Vec<String>> = table
        .select(&ROWS)
        .filter(|row| owning_table(*row).is_some_and(|owner| owner.id() == table.id()))
        .map(cells)
        .filter(|cells| !cells.is_empty())
        .collect();

    if !tables {
        return flattened(table, &rows);
    }

    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(&row_line(header, width));
    out.push_str(&row_line(&vec!["---".to_string(); width], width));
    for row in body {
        out.push_str(&row_line(row, width));
    }
    out.push('\n');
    out
}

fn flattened(table: ElementRef<'_>, rows: &[Vec<String>]) -> String {
    let text = if rows.is_empty() {
        flatten(&table.text().collect::<String>())
    } else {
        rows.iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    };
    if text.is_empty() {
        text
    } else {
        format!("{text}\n\n")
    }
}

/// Nearest enclosing table, so rows of nested tables stay with their own.
fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
        .map(|cell| flatten(&cell.text().collect::<String>()))
        .collect()
}

fn row_line(cells: &[String], width: usize) -> String {
    let mut line = String::from("|");
    for i in 0..width {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        line.push(' ');
        line.push_str(&cell.replace('|', r"\|"));
        line.push_str(" |");
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn table(document: &Html) -> ElementRef<'_> {
        document.select(&Selector::parse("table").unwrap()).next().unwrap()
    }

    #[test]
    fn test_two_by_two() {
        let html = r#"
        <table>
            <thead><tr><th>A</th><th>B</th></tr></thead>
            <tbody><tr><td>1</td><td>2</td></tr></tbody>
        </table>
        "#;
        let document = Html::parse_fragment(html);
        assert_eq!(
            convert(table(&document), true),
            "| A | B |\n| --- | --- |\n| 1 | 2 |\n\n"
        );
    }

    #[test]
    fn test_pipes_escaped_and_rows_padded() {
        let html = r#"
        <table>
            <tr><td>a|b</td><td>multi
                line</td><td>c</td></tr>
            <tr><td>short</td></tr>
        </table>
        "#;
        let document = Html::parse_fragment(html);
        assert_eq!(
            convert(table(&document), true),
            "| a\\|b | multi line | c |\n| --- | --- | --- |\n| short |  |  |\n\n"
        );
    }

    #[test]
    fn test_nested_table_rows_not_merged() {
        let html = r#"
        <table>
            <tr><td>outer</td><td><table><tr><td>inner</td></tr></table></td></tr>
        </table>
        "#;
        let document = Html::parse_fragment(html);
        let out = convert(table(&document), true);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("| outer | inner |"));
    }

    #[test]
    fn test_tables_disabled() {
        let html = "<table><tr><td>A</td><td>B</td></tr><tr><td>1</td><td>2</td></tr></table>";
        let document = Html::parse_fragment(html);
        let out = convert(table(&document), false);
        assert_eq!(out, "A B\n1 2\n\n");
    }

    #[test]
    fn test_empty_table() {
        let document = Html::parse_fragment("<table></table>");
        assert_eq!(convert(table(&document), true), "");
    }
}
