use crate::model::Row;

/// Trimmed, non-empty lines of one raw cell.
pub(crate) fn split_cell_lines(cell: &str) -> Vec<String> {
    cell.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expands one table row whose cells were concatenated by the extractor into
/// one row per embedded line. The i-th line of every cell lands in the i-th
/// output row; shorter cells are padded with empty strings.
pub(crate) fn split_concatenated_row(row: &[String]) -> Vec<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut height = 0_usize;

    for cell in row {
        if cell.is_empty() {
            columns.push(vec![String::new()]);
            continue;
        }
        let lines = split_cell_lines(cell);
        height = height.max(lines.len());
        columns.push(lines);
    }

    (0..height)
        .map(|line_index| {
            columns
                .iter()
                .map(|lines| lines.get(line_index).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Splits every concatenated row of a table. The row at `keep_index` is
/// copied through unsplit; its position in the output is returned alongside.
/// Tables with fewer than two rows are returned unchanged.
pub(crate) fn split_concatenated_rows(
    rows: &[Row],
    keep_index: Option<usize>,
) -> (Vec<Row>, Option<usize>) {
    if rows.len() < 2 {
        return (rows.to_vec(), keep_index);
    }

    let mut out = Vec::with_capacity(rows.len());
    let mut kept_at = None;
    for (index, row) in rows.iter().enumerate() {
        if Some(index) == keep_index {
            kept_at = Some(out.len());
            out.push(row.clone());
            continue;
        }
        out.extend(split_concatenated_row(row));
    }

    (out, kept_at)
}
