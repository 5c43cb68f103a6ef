// src/content.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// === ISSUE NUMBER ===
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueNumber(u32);

impl IssueNumber {
    /// Cursor value before any podcast has been loaded.
    pub const UNSET: IssueNumber = IssueNumber(0);

    pub const fn new(n: u32) -> Self {
        IssueNumber(n)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }

    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(IssueNumber)
    }

    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).map(IssueNumber)
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for IssueNumber {
    fn from(n: u32) -> Self {
        IssueNumber(n)
    }
}

// === FLAT RECORDS ===
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "issueNumber")]
    issue_number: IssueNumber,
    #[serde(rename = "name")]
    name: String,
    #[serde(rename = "description")]
    description: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Issue {
    pub fn new(issue_number: IssueNumber, name: String, description: String) -> Self {
        Self { issue_number, name, description, extra: Map::new() }
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn issue_number(&self) -> IssueNumber {
        self.issue_number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Upstream fields with no dedicated accessor, passed through untouched.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    #[serde(rename = "issueNumber")]
    issue_number: IssueNumber,
    #[serde(rename = "name")]
    name: Option<String>,
    #[serde(rename = "description")]
    description: Option<String>,
    #[serde(rename = "audioUrl")]
    audio_url: Option<String>,
    #[serde(rename = "duration")]
    duration: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Podcast {
    pub fn new(
        issue_number: IssueNumber,
        name: Option<String>,
        description: Option<String>,
        audio_url: Option<String>,
        duration: Option<String>,
    ) -> Self {
        Self { issue_number, name, description, audio_url, duration, extra: Map::new() }
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn issue_number(&self) -> IssueNumber {
        self.issue_number
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn audio_url(&self) -> Option<&str> {
        self.audio_url.as_deref()
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

// === RAW ENTRIES ===
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrySys {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Value>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An entry as delivered by the content API: metadata under `sys`, content under `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawEntry {
    pub fn new(id: &str, fields: Map<String, Value>) -> Self {
        Self { sys: EntrySys { id: id.to_string(), ..EntrySys::default() }, fields }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Issue       : #{}", self.issue_number)?;
        writeln!(f, "Name        : {}", self.name)?;
        write!(f, "Description : {}", self.description)
    }
}

impl fmt::Display for Podcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Podcast     : #{}", self.issue_number)?;
        if let Some(name) = &self.name {
            writeln!(f, "Name        : {}", name)?;
        }
        if let Some(desc) = &self.description {
            writeln!(f, "Description : {}", desc)?;
        }
        if let Some(duration) = &self.duration {
            writeln!(f, "Duration    : {}", duration)?;
        }
        write!(f, "Audio URL   : {}", self.audio_url.as_deref().unwrap_or("-"))
    }
}
