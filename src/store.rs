//! File-backed record store.
//!
//! Each collection lives in `<base_path>/<collection>.json` as a JSON array of
//! objects. Every operation loads the whole collection and mutations rewrite
//! it, so this is only meant for demo-sized data sets. All operations on one
//! collection are serialized behind a per-collection mutex, and writes go
//! through a temp file followed by a rename.

use std::{collections::HashMap, marker::PhantomData, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{
    fs,
    sync::{Mutex, OwnedMutexGuard},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o failure on collection `{collection}`: {source}")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },

    #[error("collection `{collection}` is not a JSON array of records: {source}")]
    Corrupt {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode collection `{collection}`: {source}")]
    Encode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An entity persisted as one element of a collection file.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> i64;

    /// Set the id and both timestamps of a freshly created record.
    fn assign(&mut self, id: i64, now: DateTime<Utc>);

    /// Bump `updated_at`.
    fn touch(&mut self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct CollectionStats {
    pub exists: bool,
    pub total_items: usize,
    pub file_size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    base_path: PathBuf,
    locks: Mutex<HashMap<&'static str, Arc<Mutex<()>>>>,
}

impl DataStore {
    /// Open (and create if needed) the data directory.
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|source| StoreError::Io {
                collection: base_path.display().to_string(),
                source,
            })?;
        tracing::info!(path = %base_path.display(), "data store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                base_path,
                locks: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn collection<T: Record>(&self) -> Collection<T> {
        Collection {
            store: self.clone(),
            _marker: PhantomData,
        }
    }

    async fn lock(&self, collection: &'static str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.locks.lock().await;
            locks.entry(collection).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Typed handle over one collection file.
pub struct Collection<T> {
    store: DataStore,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    fn path(&self) -> PathBuf {
        self.store
            .inner
            .base_path
            .join(format!("{}.json", T::COLLECTION))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            collection: T::COLLECTION.to_string(),
            source,
        }
    }

    async fn read(&self) -> Result<Vec<T>, StoreError> {
        let bytes = match fs::read(self.path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(collection = T::COLLECTION, "collection file missing, treating as empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        decode_records(&bytes).map_err(|source| {
            tracing::error!(collection = T::COLLECTION, error = %source, "invalid collection content");
            StoreError::Corrupt {
                collection: T::COLLECTION.to_string(),
                source,
            }
        })
    }

    async fn write(&self, records: &[T]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Encode {
            collection: T::COLLECTION.to_string(),
            source,
        })?;
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &path).await.map_err(|e| self.io_error(e))?;
        tracing::debug!(collection = T::COLLECTION, items = records.len(), "collection saved");
        Ok(())
    }

    /// All records, or an empty list when the collection does not exist yet.
    pub async fn load(&self) -> Result<Vec<T>, StoreError> {
        let _guard = self.store.lock(T::COLLECTION).await;
        self.read().await
    }

    /// Replace the whole collection.
    pub async fn save(&self, records: &[T]) -> Result<(), StoreError> {
        let _guard = self.store.lock(T::COLLECTION).await;
        self.write(records).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<T>, StoreError> {
        Ok(self.load().await?.into_iter().find(|r| r.id() == id))
    }

    pub async fn find_by<P>(&self, predicate: P) -> Result<Vec<T>, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// Exact equality on the serialized value of `field`.
    pub async fn find_by_field(&self, field: &str, value: &Value) -> Result<Vec<T>, StoreError> {
        let records = self.load().await?;
        let mut matches = Vec::new();
        for record in records {
            if field_value(&record, field)?.as_ref() == Some(value) {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    /// Insert a record with the next id and fresh timestamps.
    pub async fn create(&self, record: T) -> Result<T, StoreError> {
        self.create_with(move |_| Ok::<_, StoreError>(record)).await
    }

    /// Build the new record from the current contents while holding the
    /// collection lock, so uniqueness checks and the insert cannot interleave
    /// with other writers.
    pub async fn create_with<F, E>(&self, build: F) -> Result<T, E>
    where
        F: FnOnce(&[T]) -> Result<T, E> + Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.store.lock(T::COLLECTION).await;
        let mut records = self.read().await?;
        let mut record = build(&records)?;

        let new_id = records.iter().map(Record::id).max().unwrap_or(0) + 1;
        record.assign(new_id, Utc::now());
        records.push(record.clone());
        self.write(&records).await?;

        tracing::info!(collection = T::COLLECTION, id = new_id, "record created");
        Ok(record)
    }

    /// Apply `apply` to the record with `id`, bump `updated_at` and persist.
    /// Returns `None` when no such record exists.
    pub async fn update<F, E>(&self, id: i64, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut T) -> Result<(), E> + Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.store.lock(T::COLLECTION).await;
        let mut records = self.read().await?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            tracing::warn!(collection = T::COLLECTION, id, "update target not found");
            return Ok(None);
        };

        apply(record)?;
        record.touch(Utc::now());
        let updated = record.clone();
        self.write(&records).await?;

        tracing::info!(collection = T::COLLECTION, id, "record updated");
        Ok(Some(updated))
    }

    /// Apply `apply` to every record that matches `predicate`. Returns how many changed.
    pub async fn update_where<P, F>(&self, predicate: P, mut apply: F) -> Result<usize, StoreError>
    where
        P: Fn(&T) -> bool + Send,
        F: FnMut(&mut T) -> bool + Send,
    {
        let _guard = self.store.lock(T::COLLECTION).await;
        let mut records = self.read().await?;
        let now = Utc::now();
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| predicate(r)) {
            if apply(record) {
                record.touch(now);
                changed += 1;
            }
        }
        if changed > 0 {
            self.write(&records).await?;
        }
        Ok(changed)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let _guard = self.store.lock(T::COLLECTION).await;
        let mut records = self.read().await?;
        let before = records.len();
        records.retain(|r| r.id() != id);

        if records.len() == before {
            tracing::warn!(collection = T::COLLECTION, id, "delete target not found");
            return Ok(false);
        }
        self.write(&records).await?;
        tracing::info!(collection = T::COLLECTION, id, "record deleted");
        Ok(true)
    }

    /// AND of equality filters (null values are ignored), then `[skip, skip + limit)`.
    pub async fn filter(
        &self,
        filters: &Map<String, Value>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<T>, StoreError> {
        let records = self.load().await?;
        let mut matched = Vec::new();
        for record in records {
            let encoded = encode(&record)?;
            let keep = filters
                .iter()
                .filter(|(_, value)| !value.is_null())
                .all(|(field, value)| encoded.get(field) == Some(value));
            if keep {
                matched.push(record);
            }
        }
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    pub async fn stats(&self) -> Result<CollectionStats, StoreError> {
        let metadata = match fs::metadata(self.path()).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CollectionStats {
                    exists: false,
                    total_items: 0,
                    file_size_bytes: 0,
                    last_modified: None,
                });
            }
            Err(err) => return Err(self.io_error(err)),
        };
        let total_items = self.load().await?.len();

        Ok(CollectionStats {
            exists: true,
            total_items,
            file_size_bytes: metadata.len(),
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|source| StoreError::Encode {
        collection: std::any::type_name::<T>().to_string(),
        source,
    })
}

fn field_value<T: Serialize>(record: &T, field: &str) -> Result<Option<Value>, StoreError> {
    Ok(encode(record)?.get(field).cloned())
}

/// Parse a collection file. Ids written as numeric strings are accepted so
/// hand-edited fixture files interoperate with generated ones.
fn decode_records<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    let items: Vec<Value> = serde_json::from_slice(bytes)?;
    items
        .into_iter()
        .map(|mut item| {
            if let Some(Value::String(raw)) = item.get("id") {
                if let Ok(id) = raw.trim().parse::<i64>() {
                    item["id"] = Value::from(id);
                }
            }
            serde_json::from_value(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: i64,
        title: String,
        tag: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl Record for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> i64 {
            self.id
        }

        fn assign(&mut self, id: i64, now: DateTime<Utc>) {
            self.id = id;
            self.created_at = now;
            self.updated_at = now;
        }

        fn touch(&mut self, now: DateTime<Utc>) {
            self.updated_at = now;
        }
    }

    fn note(title: &str, tag: Option<&str>) -> Note {
        Note {
            id: 0,
            title: title.into(),
            tag: tag.map(Into::into),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn temp_store() -> anyhow::Result<(DataStore, PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_store_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        Ok((store, dir))
    }

    #[tokio::test]
    async fn missing_collection_loads_empty() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();

        assert!(notes.load().await?.is_empty());
        let stats = notes.stats().await?;
        assert!(!stats.exists);
        assert_eq!(stats.total_items, 0);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();

        for i in 1..=5 {
            let created = notes.create(note(&format!("n{i}"), None)).await?;
            assert_eq!(created.id, i);
            assert_eq!(created.created_at, created.updated_at);
        }

        let ids: Vec<i64> = notes.load().await?.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_never_share_an_id() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();

        let mut handles = Vec::new();
        for i in 0..20 {
            let notes = notes.clone();
            handles.push(tokio::spawn(async move {
                notes.create(note(&format!("n{i}"), None)).await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        let mut ids: Vec<i64> = notes.load().await?.iter().map(|n| n.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();

        let mut records = vec![note("a", Some("x")), note("b", None)];
        records[0].id = 7;
        records[1].id = 3;
        notes.save(&records).await?;

        assert_eq!(notes.load().await?, records);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn find_update_delete() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();

        let first = notes.create(note("first", Some("red"))).await?;
        notes.create(note("second", Some("blue"))).await?;
        notes.create(note("third", Some("red"))).await?;

        assert_eq!(notes.find_by_id(first.id).await?, Some(first.clone()));
        assert_eq!(notes.find_by_id(99).await?, None);

        let red = notes.find_by_field("tag", &json!("red")).await?;
        assert_eq!(red.len(), 2);

        let updated = notes
            .update(first.id, |n: &mut Note| {
                n.title = "renamed".into();
                Ok::<_, StoreError>(())
            })
            .await?
            .expect("record exists");
        assert_eq!(updated.title, "renamed");
        assert!(updated.updated_at >= first.updated_at);
        assert_eq!(updated.created_at, first.created_at);

        let missing = notes
            .update(99, |_: &mut Note| Ok::<_, StoreError>(()))
            .await?;
        assert!(missing.is_none());

        assert!(notes.delete(first.id).await?);
        assert!(!notes.delete(first.id).await?);
        assert_eq!(notes.load().await?.len(), 2);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn filter_applies_equality_and_paging() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();
        for i in 0..6 {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            notes.create(note(&format!("n{i}"), Some(tag))).await?;
        }

        let mut filters = Map::new();
        filters.insert("tag".into(), json!("even"));
        filters.insert("title".into(), Value::Null);

        let page = notes.filter(&filters, 1, 5).await?;
        let titles: Vec<&str> = page.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["n2", "n4"]);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        fs::write(dir.join("notes.json"), b"{\"not\": \"a list\"}").await?;

        let err = store.collection::<Note>().load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn string_ids_are_normalized() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let now = Utc::now();
        let raw = json!([{ "id": "12", "title": "legacy", "tag": null, "created_at": now, "updated_at": now }]);
        fs::write(dir.join("notes.json"), serde_json::to_vec(&raw)?).await?;

        let notes = store.collection::<Note>();
        assert_eq!(notes.find_by_id(12).await?.map(|n| n.title), Some("legacy".into()));
        assert_eq!(notes.create(note("next", None)).await?.id, 13);

        let stats = notes.stats().await?;
        assert!(stats.exists);
        assert_eq!(stats.total_items, 2);
        assert!(stats.file_size_bytes > 0);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn repeated_reads_return_the_same_record() -> anyhow::Result<()> {
        let (store, dir) = temp_store().await?;
        let notes = store.collection::<Note>();
        let created = notes.create(note("stable", Some("a"))).await?;
        let on_disk = fs::read(notes.path()).await?;

        let first = notes.find_by_id(created.id).await?;
        let second = notes.find_by_id(created.id).await?;
        assert_eq!(first, Some(created.clone()));
        assert_eq!(first, second);
        assert_eq!(notes.find_by_id(created.id + 1).await?, None);
        assert_eq!(fs::read(notes.path()).await?, on_disk);

        let _ = fs::remove_dir_all(dir).await;
        Ok(())
    }
}
