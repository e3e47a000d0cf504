use crate::contact::Contact;
use anyhow::Result;
use std::fmt;

const COLUMNS: [&str; 4] = ["id", "name", "address", "phone"];

/// Contacts laid out as a bordered text table
pub struct Listing {
    rows: Vec<[String; 4]>,
}

impl Listing {
    pub fn new<'a>(contacts: impl IntoIterator<Item = &'a Contact>) -> Self {
        let rows = contacts
            .into_iter()
            .map(|c| {
                [
                    c.id().to_string(),
                    c.name().trim_end().to_string(),
                    c.address().trim_end().to_string(),
                    c.phone().trim_end().to_string(),
                ]
            })
            .collect();

        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn col_widths(&self) -> [usize; 4] {
        let mut widths = COLUMNS.map(str::len);
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        widths
    }
}

/// Same contacts as a JSON array
pub fn to_json<'a>(contacts: impl IntoIterator<Item = &'a Contact>) -> Result<String> {
    let contacts: Vec<&Contact> = contacts.into_iter().collect();
    Ok(serde_json::to_string_pretty(&contacts)?)
}

fn write_row_divider(f: &mut fmt::Formatter<'_>, col_widths: &[usize]) -> fmt::Result {
    for &width in col_widths {
        write!(f, "+{:-<width$}", "-", width = width + 2)?; // +---+
    }
    writeln!(f, "+")
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_widths = self.col_widths();

        write_row_divider(f, &col_widths)?;
        for (col, width) in COLUMNS.iter().zip(col_widths) {
            write!(f, "| {:^width$} ", col, width = width)?;
        }
        writeln!(f, "|")?;
        write_row_divider(f, &col_widths)?;

        for row in &self.rows {
            for (cell, width) in row.iter().zip(col_widths) {
                write!(f, "| {:<width$} ", cell, width = width)?;
            }
            writeln!(f, "|")?;
        }

        if !self.rows.is_empty() {
            write_row_divider(f, &col_widths)?;
        }

        Ok(())
    }
}
