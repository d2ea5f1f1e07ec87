// Task model and its persisted record shape

use crate::record::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of work.
///
/// Serializes to the stored record shape
/// `{id, label, checked, deadline, tags}`. Records written before
/// `deadline` or `tags` existed load with no deadline and no tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: String,
    label: String,
    #[serde(rename = "checked")]
    completed: bool,
    #[serde(default, with = "deadline_format")]
    deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: TagSet,
}

impl Task {
    /// Create an incomplete task with no deadline and no tags
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            completed: false,
            deadline: None,
            tags: TagSet::new(),
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.set_deadline(deadline);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Incomplete with a deadline strictly before `now`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.deadline.is_some_and(|d| d < now)
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    // Stored precision is milliseconds
    pub(crate) fn set_deadline(&mut self, deadline: Option<DateTime<Utc>>) {
        self.deadline = deadline.map(|d| d.trunc_subsecs(3));
    }

    /// Apply an edit in place. A blank label leaves the label unchanged.
    pub(crate) fn apply_edit(&mut self, edit: TaskEdit) {
        if let Some(label) = edit.label
            && !label.trim().is_empty()
        {
            self.label = label;
        }

        match edit.deadline {
            DeadlineEdit::Keep => {}
            DeadlineEdit::Clear => self.deadline = None,
            DeadlineEdit::Set(deadline) => self.set_deadline(Some(deadline)),
        }

        if let Some(tags) = edit.tags {
            self.tags = tags.into_iter().collect();
        }
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_key() -> &'static str {
        "todos"
    }
}

/// Ordered set of tags: insertion order kept, duplicates and blanks dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Vec<String>")]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag; returns false if it was blank or already present
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl From<Option<Vec<String>>> for TagSet {
    fn from(tags: Option<Vec<String>>) -> Self {
        tags.unwrap_or_default().into_iter().collect()
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0
    }
}

/// How an edit treats the deadline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeadlineEdit {
    #[default]
    Keep,
    Clear,
    Set(DateTime<Utc>),
}

/// Optional field replacements applied alongside a completion update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    /// Replaces the label unless blank
    pub label: Option<String>,
    pub deadline: DeadlineEdit,
    /// Replaces the whole tag set
    pub tags: Option<Vec<String>>,
}

impl TaskEdit {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = DeadlineEdit::Set(deadline);
        self
    }

    pub fn clear_deadline(mut self) -> Self {
        self.deadline = DeadlineEdit::Clear;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Parse a deadline timestamp.
///
/// Accepts RFC 3339 (`2024-12-01T23:59:00.000Z`) and naive local forms
/// (`2024-12-01T23:59:00`, `2024-12-01T23:59`, `2024-12-01 23:59`,
/// `2024-12-01`), the naive ones read as UTC.
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(3));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc().trunc_subsecs(3));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::default()).and_utc())
}

/// Format a deadline the way it is stored
pub fn format_deadline(deadline: &DateTime<Utc>) -> String {
    deadline.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod deadline_format {
    use super::{format_deadline, parse_deadline};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(deadline) => serializer.serialize_str(&format_deadline(deadline)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse_deadline(s)
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid deadline '{}': {}", s, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("a", "Write tests");
        assert_eq!(task.id(), "a");
        assert_eq!(task.label(), "Write tests");
        assert!(!task.is_completed());
        assert!(task.deadline().is_none());
        assert!(task.tags().is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let task = Task::new("1", "Buy groceries")
            .with_deadline(Some(ts(2024, 12, 1, 23, 59)))
            .with_tags(["home"]);
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["id"], "1");
        assert_eq!(json["label"], "Buy groceries");
        assert_eq!(json["checked"], false);
        assert_eq!(json["deadline"], "2024-12-01T23:59:00.000Z");
        assert_eq!(json["tags"], serde_json::json!(["home"]));
    }

    #[test]
    fn test_absent_deadline_serializes_null() {
        let json = serde_json::to_value(Task::new("1", "x")).unwrap();
        assert!(json["deadline"].is_null());
    }

    #[test]
    fn test_legacy_record_defaults() {
        let task: Task = serde_json::from_str(r#"{"id":"1","label":"Old","checked":true}"#).unwrap();
        assert!(task.is_completed());
        assert!(task.deadline().is_none());
        assert!(task.tags().is_empty());
    }

    #[test]
    fn test_null_and_empty_deadline_are_absent() {
        let a: Task = serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"deadline":null}"#).unwrap();
        let b: Task = serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"deadline":""}"#).unwrap();
        let c: Task = serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"tags":null}"#).unwrap();
        assert!(a.deadline().is_none());
        assert!(b.deadline().is_none());
        assert!(c.tags().is_empty());
    }

    #[test]
    fn test_naive_deadline_loads_as_utc() {
        let task: Task =
            serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"deadline":"2024-12-01T23:59:00"}"#)
                .unwrap();
        assert_eq!(task.deadline(), Some(ts(2024, 12, 1, 23, 59)));
    }

    #[test]
    fn test_invalid_deadline_fails() {
        let result: Result<Task, _> =
            serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"deadline":"next tuesday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_deadline_formats() {
        let expected = ts(2024, 12, 5, 23, 59);
        assert_eq!(parse_deadline("2024-12-05T23:59:00.000Z").unwrap(), expected);
        assert_eq!(parse_deadline("2024-12-06T00:59:00+01:00").unwrap(), expected);
        assert_eq!(parse_deadline("2024-12-05T23:59:00").unwrap(), expected);
        assert_eq!(parse_deadline("2024-12-05T23:59").unwrap(), expected);
        assert_eq!(parse_deadline("2024-12-05 23:59").unwrap(), expected);
        assert_eq!(parse_deadline("2024-12-05").unwrap(), ts(2024, 12, 5, 0, 0));
        assert!(parse_deadline("soon").is_err());
    }

    #[test]
    fn test_deadline_truncated_to_millis() {
        let precise = ts(2024, 1, 1, 0, 0) + chrono::Duration::nanoseconds(1_234_567);
        let task = Task::new("1", "x").with_deadline(Some(precise));
        let json = serde_json::to_string(&task).unwrap();
        let reloaded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, task);
    }

    #[test]
    fn test_tagset_dedup_preserves_order() {
        let tags: TagSet = ["work", "home", "work", " ", "urgent", "home"].into_iter().collect();
        assert_eq!(tags.as_slice(), &["work", "home", "urgent"]);
    }

    #[test]
    fn test_tagset_deserialize_dedups() {
        let task: Task =
            serde_json::from_str(r#"{"id":"1","label":"x","checked":false,"tags":["a","b","a"]}"#).unwrap();
        assert_eq!(task.tags().iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_is_overdue() {
        let now = ts(2024, 12, 2, 0, 0);
        let late = Task::new("1", "x").with_deadline(Some(ts(2024, 12, 1, 23, 59)));
        let later = Task::new("2", "x").with_deadline(Some(ts(2024, 12, 3, 0, 0)));
        let done = late.clone().with_completed(true);

        assert!(late.is_overdue(now));
        assert!(!later.is_overdue(now));
        assert!(!done.is_overdue(now));
        assert!(!Task::new("3", "x").is_overdue(now));
    }

    #[test]
    fn test_apply_edit() {
        let mut task = Task::new("1", "Old")
            .with_deadline(Some(ts(2024, 1, 1, 0, 0)))
            .with_tags(["a"]);

        task.apply_edit(TaskEdit::default().label("   "));
        assert_eq!(task.label(), "Old");
        assert!(task.deadline().is_some());

        task.apply_edit(TaskEdit::default().label("New").tags(["b", "b", "c"]));
        assert_eq!(task.label(), "New");
        assert_eq!(task.tags().as_slice(), &["b", "c"]);

        task.apply_edit(TaskEdit::default().clear_deadline());
        assert!(task.deadline().is_none());

        task.apply_edit(TaskEdit::default().deadline(ts(2025, 6, 1, 12, 0)));
        assert_eq!(task.deadline(), Some(ts(2025, 6, 1, 12, 0)));
    }
}
