//! Historical dataset loader for the trainer.
//!
//! CSV with a header row. Feature columns are located by name, so extra columns and
//! any column order are fine; each feature accepts the aliases in `FEATURE_ALIASES`.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use crate::scores::{RawScores, FEATURE_ALIASES, FEATURE_NAMES, N_FEATURES};

pub fn load_csv(path: &Path) -> Result<Vec<RawScores>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading dataset from {}", path.display()))?;
    parse_csv(&content).with_context(|| format!("parsing dataset {}", path.display()))
}

pub fn parse_csv(content: &str) -> Result<Vec<RawScores>> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (_, header) = lines.next().ok_or_else(|| anyhow!("dataset is empty"))?;
    let columns: Vec<String> = split_row(header)
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut index = [0usize; N_FEATURES];
    for (j, aliases) in FEATURE_ALIASES.iter().enumerate() {
        index[j] = columns
            .iter()
            .position(|c| aliases.contains(&c.as_str()))
            .ok_or_else(|| {
                anyhow!(
                    "missing column for `{}` (accepted: {})",
                    FEATURE_NAMES[j],
                    aliases.join(", ")
                )
            })?;
    }

    let mut out = Vec::new();
    for (line_no, line) in lines {
        let cells = split_row(line);
        let mut v = [0.0; N_FEATURES];
        for (j, &col) in index.iter().enumerate() {
            let cell = cells
                .get(col)
                .ok_or_else(|| anyhow!("line {line_no}: too few columns"))?;
            let x: f64 = cell.parse().map_err(|_| {
                anyhow!(
                    "line {line_no}: `{cell}` is not a number (column `{}`)",
                    FEATURE_NAMES[j]
                )
            })?;
            if !x.is_finite() {
                bail!("line {line_no}: non-finite value in `{}`", FEATURE_NAMES[j]);
            }
            v[j] = x;
        }
        out.push(RawScores::from_array(v));
    }
    Ok(out)
}

/// Split one record on commas outside double quotes. Quotes are removed and `""`
/// inside a quoted field is a literal quote. Records never span lines.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(ch),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_source_dataset_columns() {
        let csv = "rata_tugas,nilai_uts,nilai_uas\n85.1,87.2,89.3\n\n58,55,57\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawScores::new(85.1, 87.2, 89.3));
    }

    #[test]
    fn columns_found_by_name_in_any_order() {
        let csv = "student,final,midterm,task_average\n\"a\",90,80,70\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows[0], RawScores::new(70.0, 80.0, 90.0));
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let csv = "name,rata_tugas,nilai_uts,nilai_uas\n\"Putri, A.\",80,\"75\",70\n\"say \"\"hi\"\"\",1,2,3\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows, vec![RawScores::new(80.0, 75.0, 70.0), RawScores::new(1.0, 2.0, 3.0)]);
        assert_eq!(split_row("\"say \"\"hi\"\"\", x"), vec!["say \"hi\"", "x"]);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_csv("rata_tugas,nilai_uts\n1,2\n").unwrap_err();
        assert!(err.to_string().contains("final"));
    }

    #[test]
    fn bad_number_names_the_line() {
        let err = parse_csv("rata_tugas,nilai_uts,nilai_uas\n1,2,3\n4,x,6\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
