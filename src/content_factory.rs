// src/content_factory.rs
use crate::content::{Issue, IssueNumber, Podcast, RawEntry};
use crate::errors::EntryError;
use log::{debug, warn};
use serde_json::{Map, Value};

const ISSUE_NUMBER: &str = "issueNumber";
const NAME: &str = "name";
const DESCRIPTION: &str = "description";
const AUDIO: &str = "audio";
const DURATION: &str = "duration";
const AUDIO_URL: &str = "audioUrl";

/// What to do with an entry that cannot be flattened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedEntryPolicy {
    /// Log and drop the entry, keep the rest of the batch.
    #[default]
    Skip,
    /// Fail the whole batch on the first bad entry.
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PodcastOrder {
    AsReceived,
    #[default]
    AscendingIssueNumber,
}

fn read_issue_number(raw: &RawEntry) -> Result<IssueNumber, EntryError> {
    let value = raw.fields.get(ISSUE_NUMBER).ok_or_else(|| EntryError::MalformedEntry {
        entry_id: raw.id().to_string(),
        field: ISSUE_NUMBER,
    })?;

    let invalid = |reason: String| EntryError::InvalidField {
        entry_id: raw.id().to_string(),
        field: ISSUE_NUMBER,
        reason,
    };

    let n: u64 = match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("is not a non-negative integer: {}", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(format!("is not numeric ('{}'): {}", s, e)))?,
        Value::Null => {
            return Err(EntryError::MalformedEntry {
                entry_id: raw.id().to_string(),
                field: ISSUE_NUMBER,
            });
        }
        other => return Err(invalid(format!("has unexpected type: {}", other))),
    };

    u32::try_from(n)
        .map(IssueNumber::new)
        .map_err(|_| invalid(format!("is out of range: {}", n)))
}

fn text_field(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn flatten_issue(raw: &RawEntry) -> Result<Issue, EntryError> {
    let issue_number = read_issue_number(raw)?;
    let mut fields = raw.fields.clone();
    fields.remove(ISSUE_NUMBER);
    let name = text_field(&mut fields, NAME).unwrap_or_default();
    let description = text_field(&mut fields, DESCRIPTION).unwrap_or_default();

    Ok(Issue::new(issue_number, name, description).with_extra(fields))
}

/// `audio` is either a URL string or, when the gateway could not resolve the asset, the
/// untouched link object. Only the former becomes `audio_url`.
pub fn flatten_podcast(raw: &RawEntry) -> Result<Podcast, EntryError> {
    let issue_number = read_issue_number(raw)?;
    let mut fields = raw.fields.clone();
    fields.remove(ISSUE_NUMBER);
    let name = text_field(&mut fields, NAME);
    let description = text_field(&mut fields, DESCRIPTION);
    let duration = text_field(&mut fields, DURATION);
    let audio_url = match fields.get(AUDIO) {
        Some(Value::String(_)) => text_field(&mut fields, AUDIO),
        _ => None,
    };
    // `audioUrl` is the serialized name of the derived field; an upstream key of the same
    // name would be written twice.
    if fields.remove(AUDIO_URL).is_some() {
        debug!("flatten_podcast: dropping upstream '{}' on entry '{}'", AUDIO_URL, raw.id());
    }

    Ok(Podcast::new(issue_number, name, description, audio_url, duration).with_extra(fields))
}

#[derive(Debug, Clone)]
pub struct EntryFactory {
    malformed_policy: MalformedEntryPolicy,
    podcast_order: PodcastOrder,
}

impl Default for EntryFactory {
    fn default() -> Self {
        Self {
            malformed_policy: MalformedEntryPolicy::default(),
            podcast_order: PodcastOrder::default(),
        }
    }
}

impl EntryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder methods
    pub fn with_malformed_policy(mut self, policy: MalformedEntryPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    pub fn with_podcast_order(mut self, order: PodcastOrder) -> Self {
        self.podcast_order = order;
        self
    }

    pub fn malformed_policy(&self) -> MalformedEntryPolicy {
        self.malformed_policy
    }

    pub fn podcast_order(&self) -> PodcastOrder {
        self.podcast_order
    }

    fn flatten_all<T>(
        &self,
        kind: &str,
        raw_entries: &[RawEntry],
        flatten: fn(&RawEntry) -> Result<T, EntryError>,
    ) -> Result<Vec<T>, EntryError> {
        let mut out: Vec<T> = Vec::with_capacity(raw_entries.len());
        for raw in raw_entries {
            match flatten(raw) {
                Ok(record) => out.push(record),
                Err(e) => match self.malformed_policy {
                    MalformedEntryPolicy::Abort => return Err(e),
                    MalformedEntryPolicy::Skip => warn!("EntryFactory: skipping {} entry: {}", kind, e),
                },
            }
        }
        debug!("EntryFactory: flattened {}/{} {} entries", out.len(), raw_entries.len(), kind);
        Ok(out)
    }

    pub fn create_issues(&self, raw_entries: &[RawEntry]) -> Result<Vec<Issue>, EntryError> {
        self.flatten_all("issue", raw_entries, flatten_issue)
    }

    pub fn create_podcasts(&self, raw_entries: &[RawEntry]) -> Result<Vec<Podcast>, EntryError> {
        let mut podcasts = self.flatten_all("podcast", raw_entries, flatten_podcast)?;
        if let PodcastOrder::AscendingIssueNumber = self.podcast_order {
            podcasts.sort_by_key(Podcast::issue_number);
        }
        Ok(podcasts)
    }
}
