// src/harvest/merge.rs
use serde::Serialize;

use crate::error::HarvestError;

/// Rows captured from one stabilized rendering of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    /// 1-based page the rows were captured from.
    pub page: usize,
    /// Raw cell text per row, in DOM order.
    pub rows: Vec<Vec<String>>,
}

/// Column labels, captured once per harvest from the first page.
pub type Header = Vec<String>;

/// Header plus every captured row, in page order then DOM order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalTable {
    pub header: Header,
    pub rows: Vec<Vec<String>>,
    /// Stabilized row count contributed by each page.
    pub page_rows: Vec<usize>,
}

impl LogicalTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn pages(&self) -> usize {
        self.page_rows.len()
    }
}

/// Concatenate `fragments` under `header` without reordering or filtering.
///
/// Fails with [`HarvestError::EmptyTable`] when nothing was captured, either
/// because no fragment was accumulated or because every fragment was empty.
pub fn merge(header: Option<Header>, fragments: Vec<Fragment>) -> Result<LogicalTable, HarvestError> {
    let total: usize = fragments.iter().map(|f| f.rows.len()).sum();
    let header = match header {
        Some(h) if total > 0 => h,
        _ => return Err(HarvestError::EmptyTable),
    };

    let mut rows = Vec::with_capacity(total);
    let mut page_rows = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        page_rows.push(fragment.rows.len());
        rows.extend(fragment.rows);
    }

    Ok(LogicalTable {
        header,
        rows,
        page_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(page: usize, cells: &[&str]) -> Fragment {
        Fragment {
            page,
            rows: cells.iter().map(|c| vec![c.to_string()]).collect(),
        }
    }

    #[test]
    fn test_preserves_page_then_row_order() {
        let table = merge(
            Some(vec!["Maker".into()]),
            vec![frag(1, &["a", "b"]), frag(2, &["c", "d"])],
        )
        .unwrap();
        let flat: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(flat, vec!["a", "b", "c", "d"]);
        assert_eq!(table.page_rows, vec![2, 2]);
        assert_eq!(table.row_count(), table.page_rows.iter().sum::<usize>());
    }

    #[test]
    fn test_zero_fragments_is_empty_table() {
        assert_eq!(
            merge(Some(vec!["Maker".into()]), vec![]),
            Err(HarvestError::EmptyTable)
        );
    }

    #[test]
    fn test_all_empty_fragments_is_empty_table() {
        assert_eq!(
            merge(Some(vec!["Maker".into()]), vec![frag(1, &[]), frag(2, &[])]),
            Err(HarvestError::EmptyTable)
        );
    }

    #[test]
    fn test_empty_page_in_the_middle_is_kept() {
        let table = merge(
            Some(vec!["Maker".into()]),
            vec![frag(1, &["a"]), frag(2, &[]), frag(3, &["b"])],
        )
        .unwrap();
        assert_eq!(table.pages(), 3);
        assert_eq!(table.row_count(), 2);
    }
}
