use std::fmt;
use std::path::Path;
use tracing::info;
use trawl_common::Result;

/// A single page to visit. Identity is the URL string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTarget(String);

impl CrawlTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keep trimmed lines that start with `http`, in input order.
pub fn parse_targets(input: &str) -> Vec<CrawlTarget> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http"))
        .map(CrawlTarget::new)
        .collect()
}

/// Read a newline-delimited URL list.
pub fn load_targets(path: &Path) -> Result<Vec<CrawlTarget>> {
    let raw = std::fs::read_to_string(path)?;
    let targets = parse_targets(&raw);
    info!(target: "trawl.crawl", count = targets.len(), file = %path.display(), "loaded URLs");
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_lines_are_dropped() {
        let input = "https://www.linkedin.com/in/ada\nnot-a-url\n  https://www.linkedin.com/in/grace  \n\n# comment\n";
        let targets = parse_targets(input);
        assert_eq!(
            targets,
            vec![
                CrawlTarget::new("https://www.linkedin.com/in/ada"),
                CrawlTarget::new("https://www.linkedin.com/in/grace"),
            ]
        );
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "http://a.example/1\nftp://nope\nhttp://a.example/2\n").unwrap();
        assert_eq!(load_targets(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_targets(&dir.path().join("absent.txt")).is_err());
    }
}
