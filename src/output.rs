// Export and console-preview helpers for the CLI host. The web host
// ignores this module and serializes the adapter structs itself.
use anyhow::Context;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Export rows to a CSV file, one serialized struct per record.
pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export any serializable value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path))?;
    Ok(())
}

/// Print the first `max_rows` rows as a Markdown table.
pub fn preview_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
