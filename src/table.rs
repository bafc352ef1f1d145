use std::fmt::Write as _;

/// Renders an aligned plain-text table. Numeric cells are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| (h.clone(), false)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));
    let separator = widths
        .iter()
        .map(|w| ("-".repeat((*w).max(1)), false))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let cells = row
            .iter()
            .map(|cell| {
                let clean = sanitize_cell(cell);
                let numeric = clean.parse::<f64>().is_ok();
                (clean, numeric)
            })
            .collect::<Vec<_>>();
        let _ = writeln!(output, "{}", format_row(&cells, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(cells: &[(String, bool)], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|((cell, right_align), width)| {
            if *right_align {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn sanitize_cell(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
