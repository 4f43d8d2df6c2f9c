use crate::record::{CrawlRun, ProfileRecord};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use trawl_common::{Result, TrawlError};

/// What a finalized run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub attempted: usize,
    pub interrupted: bool,
    pub output: PathBuf,
    pub columns: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "\n{rule}")?;
        writeln!(f, "SCRAPING SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total profiles scraped: {}", self.records)?;
        writeln!(f, "Profiles attempted: {}", self.attempted)?;
        if self.interrupted {
            writeln!(f, "Run was interrupted before the last target")?;
        }
        writeln!(f, "Output file: {}", self.output.display())?;
        writeln!(f, "Columns: {}", self.columns.join(", "))?;
        write!(f, "{rule}")
    }
}

/// Writes a finished crawl to CSV.
#[derive(Debug, Clone)]
pub struct ResultStore {
    output: PathBuf,
}

impl ResultStore {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Write `run` to the output file and print the summary.
    ///
    /// An empty run writes nothing and returns `Ok(None)`.
    pub fn finalize(&self, run: &CrawlRun) -> Result<Option<RunSummary>> {
        if run.is_empty() {
            warn!(target: "trawl.store", attempted = run.attempted(), "no profile data to save");
            return Ok(None);
        }

        let file = std::fs::File::create(&self.output)?;
        let columns = write_csv(run.records(), file)?;

        let summary = RunSummary {
            records: run.succeeded(),
            attempted: run.attempted(),
            interrupted: run.interrupted(),
            output: self.output.clone(),
            columns,
        };
        info!(
            target: "trawl.store",
            records = summary.records,
            output = %self.output.display(),
            "saved profiles"
        );
        println!("{summary}");
        Ok(Some(summary))
    }
}

/// Union of record keys, in the order they are first seen.
pub fn columns(records: &[ProfileRecord]) -> Vec<&'static str> {
    let mut cols: Vec<&'static str> = Vec::new();
    for record in records {
        for (key, _) in record.entries() {
            if !cols.contains(&key) {
                cols.push(key);
            }
        }
    }
    cols
}

/// Serialize `records` as CSV with a header row; returns the column list.
pub fn write_csv<W: Write>(records: &[ProfileRecord], writer: W) -> Result<Vec<String>> {
    let cols = columns(records);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&cols).map_err(csv_err)?;

    for record in records {
        let entries = record.entries();
        let row = cols.iter().map(|col| {
            entries
                .iter()
                .find(|(key, _)| key == col)
                .and_then(|(_, value)| *value)
                .unwrap_or("")
        });
        wtr.write_record(row).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(cols.into_iter().map(String::from).collect())
}

fn csv_err(e: csv::Error) -> TrawlError {
    TrawlError::Csv(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use std::collections::BTreeSet;

    fn sample_run() -> CrawlRun {
        let mut a = ProfileRecord::new("https://x.example/in/ada");
        a.set(Field::Name, Some("Ada Lovelace".into()));
        a.set(Field::Skills, Some("Math, Poetry".into()));
        a.set(Field::ExperienceSummary, Some("Wrote \"notes\", long ones".into()));
        let mut b = ProfileRecord::new("https://x.example/in/grace");
        b.set(Field::Headline, Some("Rear Admiral".into()));
        vec![a, b].into_iter().collect()
    }

    fn non_empty_keys(pairs: Vec<(&'static str, Option<&str>)>) -> BTreeSet<String> {
        pairs
            .into_iter()
            .filter(|(_, v)| v.map(|s| !s.is_empty()).unwrap_or(false))
            .map(|(k, _)| k.to_string())
            .collect()
    }

    #[test]
    fn round_trip_keeps_count_and_populated_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.csv");
        let run = sample_run();

        let summary = ResultStore::new(&path).finalize(&run).unwrap().unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.columns.first().map(String::as_str), Some("profile_url"));
        assert_eq!(
            summary.columns.last().map(String::as_str),
            Some("extraction_timestamp")
        );

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let back: Vec<ProfileRecord> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(back.len(), run.records().len());
        for (orig, read) in run.records().iter().zip(&back) {
            assert_eq!(non_empty_keys(orig.entries()), non_empty_keys(read.entries()));
            assert_eq!(orig, read);
        }
    }

    #[test]
    fn empty_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.csv");
        let summary = ResultStore::new(&path).finalize(&CrawlRun::new()).unwrap();
        assert!(summary.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn columns_are_first_seen_union() {
        let run = sample_run();
        let cols = columns(run.records());
        assert_eq!(cols.len(), 9);
        assert_eq!(cols[1], "name");
        assert!(columns(&[]).is_empty());
    }

    #[test]
    fn summary_mentions_path_and_columns() {
        let s = RunSummary {
            records: 1,
            attempted: 3,
            interrupted: true,
            output: PathBuf::from("out.csv"),
            columns: vec!["profile_url".into(), "name".into()],
        };
        let text = s.to_string();
        assert!(text.contains("Total profiles scraped: 1"));
        assert!(text.contains("Output file: out.csv"));
        assert!(text.contains("Columns: profile_url, name"));
        assert!(text.contains("interrupted"));
    }
}
