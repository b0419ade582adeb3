//! Data models for Planning Center Services API responses
//!
//! The API speaks JSON:API: every response is a document with a `data`
//! member (one resource or a list), optional side-loaded `included`
//! resources and optional `links.next` for pagination. The raw shapes are
//! deserialized as-is, then converted into the typed records the rest of
//! the crate works with.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// ============================================================================
// JSON:API Document Models
// ============================================================================

/// Top-level JSON:API response document
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    /// Primary data, a single resource or an ordered list
    pub data: PrimaryData,
    /// Side-loaded related resources
    #[serde(default)]
    pub included: Vec<Resource>,
    /// Pagination links
    #[serde(default)]
    pub links: Links,
}

/// The `data` member of a document
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Box<Resource>),
}

impl PrimaryData {
    /// Flatten into an ordered list of resources
    pub fn into_vec(self) -> Vec<Resource> {
        match self {
            PrimaryData::Many(items) => items,
            PrimaryData::One(item) => vec![*item],
        }
    }
}

/// Document-level links
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Links {
    /// Continuation URL, absent on the last page
    #[serde(default)]
    pub next: Option<String>,
}

/// A JSON:API resource object
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Resource {
    /// Resource type (e.g., "Plan", "arrangements")
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource id, unique within its type
    pub id: String,
    /// Free-form attributes
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Named relationships to other resources
    #[serde(default)]
    pub relationships: HashMap<String, Relationship>,
}

/// A relationship entry under `relationships`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Relationship {
    /// Linkage: null, one identifier, or many
    #[serde(default)]
    pub data: Option<Linkage>,
}

/// Resource linkage of a relationship
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Linkage {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

/// A `{type, id}` pointer to another resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Resource {
    /// Build a resource with attributes only
    pub fn new(kind: impl Into<String>, id: impl Into<String>, attributes: Value) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            attributes: match attributes {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            relationships: HashMap::new(),
        }
    }

    /// Attach a to-one relationship
    pub fn with_relation(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.relationships.insert(
            name.into(),
            Relationship {
                data: Some(Linkage::One(ResourceIdentifier {
                    kind: kind.into(),
                    id: id.into(),
                })),
            },
        );
        self
    }

    /// String attribute; `None` when absent, null, or not a string
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Numeric attribute; `None` when absent, null, or not a number
    pub fn f64_attr(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(Value::as_f64)
    }

    /// Required string attribute
    pub fn required_str(&self, name: &str) -> Result<&str> {
        self.str_attr(name)
            .ok_or_else(|| Error::malformed(&self.kind, &self.id, format!("missing `{}`", name)))
    }

    /// Id of the single resource a to-one relationship points at
    pub fn related_id(&self, name: &str) -> Option<&str> {
        match self.relationships.get(name)?.data.as_ref()? {
            Linkage::One(identifier) => Some(identifier.id.as_str()),
            Linkage::Many(_) => None,
        }
    }
}

// ============================================================================
// Typed Records
// ============================================================================

/// A category of recurring service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    pub id: String,
    pub name: String,
}

impl TryFrom<&Resource> for ServiceType {
    type Error = Error;

    fn try_from(resource: &Resource) -> Result<Self> {
        Ok(Self {
            id: resource.id.clone(),
            name: resource.required_str("name")?.to_string(),
        })
    }
}

/// One scheduled occurrence of a service type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub service_type_id: String,
    /// Calendar date of `sort_date`, `None` for undated plans
    pub sort_date: Option<NaiveDate>,
    pub title: Option<String>,
    /// Human-readable date label (the `dates` attribute)
    pub dates: Option<String>,
}

impl Plan {
    /// Convert a `Plan` resource fetched under `service_type_id`
    pub fn from_resource(resource: &Resource, service_type_id: &str) -> Result<Self> {
        let sort_date = match resource.str_attr("sort_date") {
            Some(raw) => Some(parse_calendar_date(raw).ok_or_else(|| {
                Error::malformed(
                    &resource.kind,
                    &resource.id,
                    format!("unparseable sort_date `{}`", raw),
                )
            })?),
            None => None,
        };

        Ok(Self {
            id: resource.id.clone(),
            service_type_id: service_type_id.to_string(),
            sort_date,
            title: resource.str_attr("title").map(str::to_string),
            dates: resource.str_attr("dates").map(str::to_string),
        })
    }

    /// Title or an empty string
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Date label or an empty string
    pub fn dates_or_default(&self) -> &str {
        self.dates.as_deref().unwrap_or("")
    }
}

/// Normalize a timestamp to the calendar date it was written in
///
/// `2025-03-09T10:30:00-05:00` is 2025-03-09: the time of day and the
/// offset are ignored rather than converted to UTC. Bare `YYYY-MM-DD`
/// dates are accepted as well.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// Kind of a plan item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Song,
    /// Headers, transitions, notes, media...
    Other(String),
}

impl ItemType {
    /// Case-insensitive parse of the `item_type` attribute
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("song") {
            ItemType::Song
        } else {
            ItemType::Other(raw.to_string())
        }
    }

    pub fn is_song(&self) -> bool {
        matches!(self, ItemType::Song)
    }
}

/// An entry of a plan's order of service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: String,
    pub item_type: ItemType,
    pub title: String,
    pub arrangement_ref: Option<String>,
    pub key_ref: Option<String>,
}

impl TryFrom<&Resource> for PlanItem {
    type Error = Error;

    fn try_from(resource: &Resource) -> Result<Self> {
        Ok(Self {
            id: resource.id.clone(),
            item_type: ItemType::parse(resource.required_str("item_type")?),
            title: resource.required_str("title")?.to_string(),
            arrangement_ref: resource.related_id("arrangement").map(str::to_string),
            key_ref: resource.related_id("key").map(str::to_string),
        })
    }
}

/// Musical arrangement of a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrangement {
    pub id: String,
    pub bpm: Option<f64>,
    pub meter: Option<String>,
}

impl From<&Resource> for Arrangement {
    fn from(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            bpm: resource.f64_attr("bpm"),
            meter: resource.str_attr("meter").map(str::to_string),
        }
    }
}

/// Musical key a song is played in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: String,
    pub name: Option<String>,
}

impl From<&Resource> for Key {
    fn from(resource: &Resource) -> Self {
        Self {
            id: resource.id.clone(),
            name: resource.str_attr("name").map(str::to_string),
        }
    }
}

/// Assignment of a person to serve on a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
    pub plan_id: String,
    /// `None` for placeholder positions with nobody assigned
    pub person_id: Option<String>,
}

impl TeamMembership {
    pub fn from_resource(resource: &Resource, plan_id: &str) -> Self {
        Self {
            plan_id: plan_id.to_string(),
            person_id: resource.related_id("person").map(str::to_string),
        }
    }
}

/// Flattened song metadata, in service order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSong {
    pub title: String,
    pub bpm: Option<f64>,
    pub meter: Option<String>,
    pub key_name: Option<String>,
}

impl ResolvedSong {
    /// Build a song without metadata
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bpm: None,
            meter: None,
            key_name: None,
        }
    }

    /// One-line summary, `None` fields printed as `None`
    pub fn summary(&self) -> String {
        fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "None".to_string())
        }

        format!(
            "{} | BPM:{} | TS:{} | Key:{}",
            self.title,
            show(&self.bpm),
            show(&self.meter),
            show(&self.key_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_accepts_list_and_single() {
        let list: Document = serde_json::from_value(json!({
            "data": [{"type": "Plan", "id": "1", "attributes": {}}],
            "links": {"next": "https://example.com/page2"}
        }))
        .unwrap();
        assert_eq!(list.data.into_vec().len(), 1);
        assert_eq!(list.links.next.as_deref(), Some("https://example.com/page2"));

        let single: Document = serde_json::from_value(json!({
            "data": {"type": "Plan", "id": "2"}
        }))
        .unwrap();
        assert_eq!(single.data.into_vec()[0].id, "2");
        assert!(single.links.next.is_none());
        assert!(single.included.is_empty());
    }

    #[test]
    fn test_null_relationship_has_no_target() {
        let item: Resource = serde_json::from_value(json!({
            "type": "Item",
            "id": "10",
            "attributes": {"item_type": "song", "title": "Oceans"},
            "relationships": {
                "arrangement": {"data": null},
                "key": {"data": {"type": "Key", "id": "K2"}}
            }
        }))
        .unwrap();

        let parsed = PlanItem::try_from(&item).unwrap();
        assert_eq!(parsed.arrangement_ref, None);
        assert_eq!(parsed.key_ref.as_deref(), Some("K2"));
        assert!(parsed.item_type.is_song());
    }

    #[test]
    fn test_plan_item_requires_type_and_title() {
        let item = Resource::new("Item", "11", json!({"title": "Welcome"}));
        let err = PlanItem::try_from(&item).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref field, .. } if field.contains("item_type")));

        let item = Resource::new("Item", "12", json!({"item_type": "song"}));
        assert!(PlanItem::try_from(&item).is_err());
    }

    #[test]
    fn test_item_type_is_case_insensitive() {
        assert_eq!(ItemType::parse("SONG"), ItemType::Song);
        assert_eq!(ItemType::parse("Song"), ItemType::Song);
        assert_eq!(ItemType::parse("header"), ItemType::Other("header".into()));
    }

    #[test]
    fn test_calendar_date_ignores_offset_and_time() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(parse_calendar_date("2025-03-09T23:30:00-05:00"), Some(expected));
        assert_eq!(parse_calendar_date("2025-03-09T00:15:00Z"), Some(expected));
        assert_eq!(parse_calendar_date("2025-03-09"), Some(expected));
        assert_eq!(parse_calendar_date("next week"), None);
    }

    #[test]
    fn test_plan_without_sort_date() {
        let resource = Resource::new("Plan", "7", json!({"sort_date": null, "title": "TBD"}));
        let plan = Plan::from_resource(&resource, "99").unwrap();
        assert_eq!(plan.sort_date, None);
        assert_eq!(plan.service_type_id, "99");
        assert_eq!(plan.title_or_default(), "TBD");
    }

    #[test]
    fn test_song_summary() {
        let song = ResolvedSong {
            title: "Great Are You Lord".into(),
            bpm: Some(72.0),
            meter: Some("4/4".into()),
            key_name: Some("G".into()),
        };
        assert_eq!(song.summary(), "Great Are You Lord | BPM:72 | TS:4/4 | Key:G");
        assert_eq!(
            ResolvedSong::titled("Oceans").summary(),
            "Oceans | BPM:None | TS:None | Key:None"
        );
    }
}
