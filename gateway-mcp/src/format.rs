//! Markdown report formatting
//!
//! Tabular and list results are rendered to bounded markdown. Truncation is a
//! hard prefix cut that is always announced in a footer.

/// Default row cap for query reports.
pub const DEFAULT_MAX_ROWS: usize = 100;

/// An ordered table of string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows aligned with `columns`; `None` is a null cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl TabularResult {
    /// Empty table with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row of non-null cells.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows
            .push(cells.into_iter().map(|cell| Some(cell.into())).collect());
    }

    /// Total number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a table, keeping at most `cap` rows.
///
/// ```
/// use gateway_mcp::format::{markdown_table, TabularResult};
///
/// let mut table = TabularResult::new(["country", "bids"]);
/// table.push_row(["US", "10"]);
/// table.push_row(["FR", "4"]);
///
/// let text = markdown_table(&table, 1);
/// assert!(text.contains("| US | 10 |"));
/// assert!(!text.contains("FR"));
/// assert!(text.ends_with("*Results truncated. Showing 1 of 2 rows.*"));
/// ```
pub fn markdown_table(result: &TabularResult, cap: usize) -> String {
    let mut text = String::new();

    text.push_str(&table_line(result.columns.iter().map(String::as_str)));
    text.push_str(&table_line(result.columns.iter().map(|_| "---")));

    if result.is_empty() {
        text.push_str("\n*No rows returned.*");
        return text;
    }

    let truncated = result.row_count() > cap;
    for row in result.rows.iter().take(cap) {
        let cells = (0..result.columns.len())
            .map(|i| row.get(i).and_then(|cell| cell.as_deref()).unwrap_or(""));
        text.push_str(&table_line(cells));
    }

    if truncated {
        text.push_str(&format!(
            "\n*Results truncated. Showing {} of {} rows.*",
            cap,
            result.row_count()
        ));
    } else {
        // Drop the final newline so reports can append sections uniformly.
        text.pop();
    }

    text
}

/// Render items as a markdown bullet list.
pub fn bullet_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| format!("- {}\n", item.as_ref()))
        .collect()
}

/// Render a yes/no cell.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let cells: Vec<String> = cells.map(escape_cell).collect();
    format!("| {} |\n", cells.join(" | "))
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}
