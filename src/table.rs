//! Plain-text table rendering for terminal output.

use std::fmt::Write as _;

use itertools::Itertools;

/// Cells wider than this are cut and end in `…`.
pub const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = std::iter::once(headers)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|row| {
            (0..headers.len())
                .map(|idx| fit_cell(row.get(idx).map(String::as_str).unwrap_or_default()))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = (0..headers.len())
        .map(|idx| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut output = String::new();
    for (line_idx, row) in cells.iter().enumerate() {
        let _ = writeln!(output, "{}", format_line(row, &widths));
        if line_idx == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            let _ = writeln!(output, "{}", format_line(&rule, &widths));
        }
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .join("  ");
    line.trim_end().to_string()
}

fn fit_cell(value: &str) -> String {
    let flattened: String = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect();
    if flattened.chars().count() <= MAX_CELL_WIDTH {
        return flattened;
    }
    let mut cut: String = flattened.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn aligns_columns_under_a_rule() {
        let rendered = render_table(
            &strings(&["key", "name"]),
            &[strings(&["Row0", "alpha"]), strings(&["Row10", ""])],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "key    name");
        assert_eq!(lines[1], "-----  -----");
        assert_eq!(lines[2], "Row0   alpha");
        assert_eq!(lines[3], "Row10");
    }

    #[test]
    fn long_and_multiline_cells_are_flattened() {
        let long = "x".repeat(MAX_CELL_WIDTH + 5);
        let rendered = render_table(&strings(&["v"]), &[vec![long], strings(&["a\nb"])]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[2].chars().count(), MAX_CELL_WIDTH);
        assert!(lines[2].ends_with('…'));
        assert_eq!(lines[3], "a b");
    }
}
