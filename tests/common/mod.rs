//! Common test utilities

use std::path::{Path, PathBuf};

/// Filler text that contains no indexed technology
#[allow(dead_code)]
pub fn filler(len: usize) -> String {
    "lorem ipsum dolor sit amet "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

/// `prefix_len` filler characters, then `mention`, then `suffix_len` filler characters
///
/// The filler next to the mention is a space so the mention is a whole word.
#[allow(dead_code)]
pub fn padded_document(prefix_len: usize, mention: &str, suffix_len: usize) -> String {
    let mut doc = String::new();
    if prefix_len > 0 {
        doc.push_str(&filler(prefix_len - 1));
        doc.push(' ');
    }
    doc.push_str(mention);
    if suffix_len > 0 {
        doc.push(' ');
        doc.push_str(&filler(suffix_len - 1));
    }
    doc
}

/// Write a plain-text file into `dir`
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}

/// Write a taxonomy CSV with a `technologies` column
#[allow(dead_code)]
pub fn write_taxonomy(dir: &Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("taxonomy.csv");
    let mut writer = csv::Writer::from_path(&path).expect("create taxonomy csv");
    writer
        .write_record(["name", "technologies"])
        .expect("write header");
    for (i, row) in rows.iter().enumerate() {
        writer
            .write_record([format!("Hype cycle {i}").as_str(), row])
            .expect("write row");
    }
    writer.flush().expect("flush taxonomy csv");
    path
}
