//! Resource graph resolution: plan items plus side-loaded resources into
//! flat per-song metadata
//!
//! The items endpoint is asked to side-load arrangements and keys
//! (`include=arrangement,key,song`). Related records arrive once in the
//! document's `included` array and items point at them by `(type, id)`.
//! [`IncludedIndex`] keys that array by a composite [`ResourceKey`] so
//! lookups never depend on string concatenation.

use crate::error::Result;
use crate::fetcher::{PageFetcher, PageWalker};
use crate::models::{Arrangement, Key, PlanItem, Resource, ResolvedSong};
use std::collections::HashMap;
use tracing::{debug, info};

/// JSON:API type of side-loaded arrangements
pub const ARRANGEMENTS: &str = "arrangements";

/// JSON:API type of side-loaded keys
pub const KEYS: &str = "keys";

/// Related resources requested alongside plan items
pub const ITEM_INCLUDES: &str = "arrangement,key,song";

/// Composite `(type, id)` lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub kind: String,
    pub id: String,
}

impl ResourceKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Side-loaded resources keyed by `(type, id)`
///
/// The API reports side-loaded types either as the plural collection name
/// (`arrangements`) or as the resource class (`Arrangement`); both spellings
/// are stored under the collection name.
#[derive(Debug, Clone, Default)]
pub struct IncludedIndex {
    entries: HashMap<ResourceKey, Resource>,
}

impl IncludedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every resource; a later duplicate replaces an earlier one
    pub fn from_resources<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> Self {
        let mut index = Self::new();
        for resource in resources {
            index.insert(resource.clone());
        }
        index
    }

    pub fn insert(&mut self, resource: Resource) {
        let key = ResourceKey::new(collection_name(&resource.kind), resource.id.clone());
        self.entries.insert(key, resource);
    }

    /// Look up a resource by collection name and id
    pub fn get(&self, kind: &str, id: &str) -> Option<&Resource> {
        self.entries.get(&ResourceKey::new(collection_name(kind), id))
    }

    pub fn arrangement(&self, id: &str) -> Option<Arrangement> {
        self.get(ARRANGEMENTS, id).map(Arrangement::from)
    }

    pub fn key(&self, id: &str) -> Option<Key> {
        self.get(KEYS, id).map(Key::from)
    }
}

/// Map a resource class name onto its collection name
fn collection_name(kind: &str) -> String {
    match kind {
        "Arrangement" => ARRANGEMENTS.to_string(),
        "Key" => KEYS.to_string(),
        other => other.to_string(),
    }
}

/// Flatten song items into metadata records
///
/// Non-song items are dropped; song items keep their relative order. A
/// missing or dangling arrangement/key reference leaves the matching fields
/// empty and never drops the song.
pub fn resolve(items: &[PlanItem], included: &IncludedIndex) -> Vec<ResolvedSong> {
    items
        .iter()
        .filter(|item| item.item_type.is_song())
        .map(|item| {
            let arrangement = item
                .arrangement_ref
                .as_deref()
                .and_then(|id| included.arrangement(id));
            let key = item.key_ref.as_deref().and_then(|id| included.key(id));

            ResolvedSong {
                title: item.title.clone(),
                bpm: arrangement.as_ref().and_then(|a| a.bpm),
                meter: arrangement.and_then(|a| a.meter),
                key_name: key.and_then(|k| k.name),
            }
        })
        .collect()
}

/// Resolve raw item resources against raw side-loaded resources
///
/// Fails with a malformed-record error when an item lacks `item_type` or
/// `title`.
pub fn resolve_resources(items: &[Resource], included: &[Resource]) -> Result<Vec<ResolvedSong>> {
    let items = items
        .iter()
        .map(PlanItem::try_from)
        .collect::<Result<Vec<_>>>()?;
    let index = IncludedIndex::from_resources(included);
    Ok(resolve(&items, &index))
}

/// Fetch a plan's items with side-loaded metadata and resolve its songs
///
/// Follows pagination; items keep server order across pages and
/// `included` resources from every page share one index.
pub async fn fetch_plan_songs<F: PageFetcher + ?Sized>(
    fetcher: &F,
    service_type_id: &str,
    plan_id: &str,
) -> Result<Vec<ResolvedSong>> {
    let path = format!("service_types/{}/plans/{}/items", service_type_id, plan_id);
    let page = PageWalker::new(fetcher, &path, &[("include", ITEM_INCLUDES)])?
        .collect_all()
        .await?;

    debug!(
        items = page.items.len(),
        included = page.included.len(),
        "Fetched plan items"
    );

    let songs = resolve_resources(&page.items, &page.included)?;
    info!(plan_id, songs = songs.len(), "Resolved setlist");
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fetcher::testing::StaticFetcher;
    use serde_json::json;

    fn song(id: &str, title: &str) -> Resource {
        Resource::new("Item", id, json!({"item_type": "song", "title": title}))
    }

    fn header(id: &str, title: &str) -> Resource {
        Resource::new("Item", id, json!({"item_type": "header", "title": title}))
    }

    fn sunday_items() -> (Vec<Resource>, Vec<Resource>) {
        let items = vec![
            song("1", "Great Are You Lord")
                .with_relation("arrangement", "Arrangement", "A1")
                .with_relation("key", "Key", "K1"),
            header("2", "Welcome"),
            song("3", "Oceans").with_relation("key", "Key", "K2"),
        ];
        let included = vec![
            Resource::new("arrangements", "A1", json!({"bpm": 72, "meter": "4/4"})),
            Resource::new("keys", "K1", json!({"name": "G"})),
            Resource::new("keys", "K2", json!({"name": "D"})),
        ];
        (items, included)
    }

    #[test]
    fn test_resolves_songs_in_order_with_metadata() {
        let (items, included) = sunday_items();
        let songs = resolve_resources(&items, &included).unwrap();

        assert_eq!(
            songs,
            vec![
                ResolvedSong {
                    title: "Great Are You Lord".into(),
                    bpm: Some(72.0),
                    meter: Some("4/4".into()),
                    key_name: Some("G".into()),
                },
                ResolvedSong {
                    title: "Oceans".into(),
                    bpm: None,
                    meter: None,
                    key_name: Some("D".into()),
                },
            ]
        );
    }

    #[test]
    fn test_output_counts_song_items_only() {
        let items = vec![
            song("1", "A"),
            header("2", "Welcome"),
            Resource::new("Item", "3", json!({"item_type": "SONG", "title": "B"})),
            Resource::new("Item", "4", json!({"item_type": "media", "title": "Video"})),
            song("5", "C"),
        ];

        let songs = resolve_resources(&items, &[]).unwrap();
        let titles: Vec<_> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dangling_arrangement_leaves_fields_absent() {
        let items = vec![song("1", "Way Maker").with_relation("arrangement", "Arrangement", "A404")];
        let included = vec![Resource::new("arrangements", "A1", json!({"bpm": 68}))];

        let songs = resolve_resources(&items, &included).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].bpm, None);
        assert_eq!(songs[0].meter, None);
    }

    #[test]
    fn test_lookup_is_scoped_by_type() {
        // Same id under a different type must not satisfy a key lookup
        let items = vec![song("1", "Build My Life").with_relation("key", "Key", "X1")];
        let included = vec![Resource::new("arrangements", "X1", json!({"name": "E"}))];

        let songs = resolve_resources(&items, &included).unwrap();
        assert_eq!(songs[0].key_name, None);
    }

    #[test]
    fn test_class_and_collection_names_share_an_entry() {
        let index = IncludedIndex::from_resources(&[
            Resource::new("Key", "K1", json!({"name": "A"})),
            Resource::new("arrangements", "A1", json!({"bpm": 140.5})),
        ]);

        assert_eq!(index.key("K1").and_then(|k| k.name).as_deref(), Some("A"));
        assert_eq!(index.arrangement("A1").and_then(|a| a.bpm), Some(140.5));
        assert!(index.key("A1").is_none());
    }

    #[test]
    fn test_malformed_item_is_reported() {
        let items = vec![Resource::new("Item", "9", json!({"item_type": "song"}))];
        let err = resolve_resources(&items, &[]).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { ref id, .. } if id == "9"));
    }

    #[tokio::test]
    async fn test_fetch_plan_songs_spans_pages() {
        let (items, included) = sunday_items();
        let fetcher = StaticFetcher::new()
            .page_with_included(
                "service_types/5/plans/77/items",
                items[..2].to_vec(),
                included[..2].to_vec(),
                Some("service_types/5/plans/77/items/p2"),
            )
            .page_with_included(
                "service_types/5/plans/77/items/p2",
                items[2..].to_vec(),
                included[2..].to_vec(),
                None,
            );

        let songs = fetch_plan_songs(&fetcher, "5", "77").await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].key_name.as_deref(), Some("D"));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(
            requests[0].1,
            vec![("include".to_string(), ITEM_INCLUDES.to_string())]
        );
    }
}
