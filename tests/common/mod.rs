use std::io::Write;

use tempfile::NamedTempFile;

/// Writes an action journal to a temp file, one row per entry, with the
/// standard header prepended.
pub fn write_journal(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "action,payment,order,driver,customer,amount,receipt,admin,note"
    )
    .unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}
