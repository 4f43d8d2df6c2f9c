use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A profile field that may be missing from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Headline,
    Location,
    CurrentCompany,
    ExperienceSummary,
    Education,
    Skills,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Headline,
        Field::Location,
        Field::CurrentCompany,
        Field::ExperienceSummary,
        Field::Education,
        Field::Skills,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Headline => "headline",
            Field::Location => "location",
            Field::CurrentCompany => "current_company",
            Field::ExperienceSummary => "experience_summary",
            Field::Education => "education",
            Field::Skills => "skills",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile_url: String,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub current_company: Option<String>,
    pub experience_summary: Option<String>,
    pub education: Option<String>,
    pub skills: Option<String>,
    pub extraction_timestamp: String,
}

impl ProfileRecord {
    /// An empty record for `url`, stamped with the current local time.
    pub fn new(url: impl Into<String>) -> Self {
        Self::at(url, Local::now())
    }

    pub fn at(url: impl Into<String>, when: DateTime<Local>) -> Self {
        Self {
            profile_url: url.into(),
            name: None,
            headline: None,
            location: None,
            current_company: None,
            experience_summary: None,
            education: None,
            skills: None,
            extraction_timestamp: when.to_rfc3339(),
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Name => &self.name,
            Field::Headline => &self.headline,
            Field::Location => &self.location,
            Field::CurrentCompany => &self.current_company,
            Field::ExperienceSummary => &self.experience_summary,
            Field::Education => &self.education,
            Field::Skills => &self.skills,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Headline => &mut self.headline,
            Field::Location => &mut self.location,
            Field::CurrentCompany => &mut self.current_company,
            Field::ExperienceSummary => &mut self.experience_summary,
            Field::Education => &mut self.education,
            Field::Skills => &mut self.skills,
        }
    }

    /// Column/value pairs in output order. Absent fields carry `None`.
    pub fn entries(&self) -> Vec<(&'static str, Option<&str>)> {
        let mut out = Vec::with_capacity(Field::ALL.len() + 2);
        out.push(("profile_url", Some(self.profile_url.as_str())));
        out.extend(Field::ALL.iter().map(|f| (f.column(), self.get(*f))));
        out.push((
            "extraction_timestamp",
            Some(self.extraction_timestamp.as_str()),
        ));
        out
    }

    /// Number of optional fields that were found.
    pub fn populated(&self) -> usize {
        Field::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }
}

/// Records collected during one crawl, in target order.
///
/// Only the orchestrator appends; once the run is handed to the store it is
/// read through shared references.
#[derive(Debug, Clone, Default)]
pub struct CrawlRun {
    records: Vec<ProfileRecord>,
    attempted: usize,
    interrupted: bool,
}

impl CrawlRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_target(&mut self) {
        self.attempted += 1;
    }

    pub(crate) fn append(&mut self, record: ProfileRecord) {
        self.records.push(record);
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ProfileRecord> for CrawlRun {
    fn from_iter<I: IntoIterator<Item = ProfileRecord>>(iter: I) -> Self {
        let records: Vec<_> = iter.into_iter().collect();
        Self {
            attempted: records.len(),
            records,
            interrupted: false,
        }
    }
}
