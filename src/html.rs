// src/html.rs
//! Header and row extraction from the markup captured off the live table.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("row selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("cell selector"));

/// Collapse runs of whitespace and trim.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_ws(&cell.text().collect::<Vec<_>>().join(" "))
}

fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

/// Parse a captured `<thead>` into one label per column.
///
/// Stacked header rows are expanded over their `colspan`/`rowspan` and the
/// labels of each column are joined with a space, top to bottom.
pub fn parse_header(thead_html: &str) -> Vec<String> {
    // fragments are parsed in body context, which would drop bare table parts
    let doc = Html::parse_fragment(&format!("<table>{}</table>", thead_html));

    let mut grid: Vec<Vec<String>> = Vec::new();
    // per column: rows still covered by a rowspan, and the label to repeat
    let mut carry: Vec<Option<(usize, String)>> = Vec::new();

    for tr in doc.select(&ROW) {
        let mut line: Vec<String> = Vec::new();
        let mut cells = tr.select(&CELL);
        loop {
            let col = line.len();
            let carried = match carry.get_mut(col) {
                Some(Some((left, text))) => {
                    *left -= 1;
                    Some((text.clone(), *left == 0))
                }
                _ => None,
            };
            if let Some((text, exhausted)) = carried {
                if exhausted {
                    carry[col] = None;
                }
                line.push(text);
                continue;
            }

            let Some(cell) = cells.next() else { break };
            let text = cell_text(cell);
            let rowspan = span(cell, "rowspan");
            for _ in 0..span(cell, "colspan") {
                let col = line.len();
                if rowspan > 1 {
                    if carry.len() <= col {
                        carry.resize(col + 1, None);
                    }
                    carry[col] = Some((rowspan - 1, text.clone()));
                }
                line.push(text.clone());
            }
        }
        grid.push(line);
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|c| {
            let parts: Vec<&str> = grid
                .iter()
                .filter_map(|line| line.get(c))
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(" ")
        })
        .collect()
}

/// Parse the captured inner markup of a `<tbody>` into raw cell text, one
/// record per rendered `tr`, in DOM order.
///
/// Every row is kept, including the "No records found." placeholder, so the
/// result always lines up with the row count observed in the browser.
pub fn parse_rows(tbody_inner_html: &str) -> Vec<Vec<String>> {
    let doc = Html::parse_fragment(&format!(
        "<table><tbody>{}</tbody></table>",
        tbody_inner_html
    ));
    doc.select(&ROW)
        .map(|tr| tr.select(&CELL).map(cell_text).collect())
        .collect()
}
