//! Survey file writers.

use std::io;
use std::path::{Path, PathBuf};

/// Cells of the 1000 person census over Sex and Age.
pub const CENSUS_1000: &[(&str, &str, u32)] = &[
    ("M", "0-18", 110),
    ("M", "19-64", 300),
    ("M", "65+", 80),
    ("F", "0-18", 100),
    ("F", "19-64", 310),
    ("F", "65+", 100),
];

/// Writes `rows` under `header` as a comma separated file in `dir`.
pub fn write_csv(dir: &Path, name: &str, header: &[&str], rows: &[Vec<String>]) -> io::Result<PathBuf> {
    let mut contents = header.join(",");
    contents.push('\n');
    for row in rows {
        contents.push_str(&row.join(","));
        contents.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Writes the [`CENSUS_1000`] contingency table as `Sex,Age,Count`.
pub fn write_census_1000(dir: &Path) -> io::Result<PathBuf> {
    let rows: Vec<Vec<String>> = CENSUS_1000
        .iter()
        .map(|(sex, age, count)| vec![sex.to_string(), age.to_string(), count.to_string()])
        .collect();
    write_csv(dir, "census.csv", &["Sex", "Age", "Count"], &rows)
}

/// Writes a `Sex,Age` sample, one row per entity.
pub fn write_sample(dir: &Path, name: &str, entities: &[(&str, &str)]) -> io::Result<PathBuf> {
    let rows: Vec<Vec<String>> = entities
        .iter()
        .map(|(sex, age)| vec![sex.to_string(), age.to_string()])
        .collect();
    write_csv(dir, name, &["Sex", "Age"], &rows)
}
