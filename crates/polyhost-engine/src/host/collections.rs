//! Host collection interfaces
//!
//! Host code sees lists, sets, maps, entries and iterators through these
//! traits whether the data lives on the host ([`VecList`], [`LinkedMap`]) or
//! is a live view over a foreign value (see `views`). Views report their
//! backing value through `foreign_source` so that handing one back to
//! foreign code yields the original value instead of a second wrapper.
//!
//! | Trait              | Host shape        | Removal                         |
//! |--------------------|-------------------|---------------------------------|
//! | [`HostList`]       | `List<E>`         | by index                        |
//! | [`HostCollection`] | `Set<E>`, values  | by element                      |
//! | [`HostMap`]        | `Map<K, V>`       | by key                          |
//! | [`HostMapEntry`]   | `Map.Entry<K, V>` | n/a                             |
//! | [`HostIterator`]   | `Iterator<E>`     | last returned element, once     |
//! | [`HostIterable`]   | `Iterable<E>`     | n/a                             |

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use polyhost_sdk::{InteropError, Value};

use crate::error::{BridgeError, BridgeResult};

use super::value::HostValue;

/// Ordered, indexable collection
pub trait HostList: Send + Sync {
    /// Number of elements
    fn size(&self) -> BridgeResult<usize>;

    /// Element at `index`; out of range is `InvalidArrayIndex`
    fn get(&self, index: usize) -> BridgeResult<HostValue>;

    /// Replace the element at `index`, returning the previous one
    fn set(&self, index: usize, value: HostValue) -> BridgeResult<HostValue>;

    /// Append at the end
    fn add(&self, value: HostValue) -> BridgeResult<()>;

    /// Remove the element at `index`, returning it
    fn remove_at(&self, index: usize) -> BridgeResult<HostValue>;

    /// Index of the first element equal to `value`
    fn index_of(&self, value: &HostValue) -> BridgeResult<Option<usize>> {
        for index in 0..self.size()? {
            if self.get(index)?.host_equals(value) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// True when some element equals `value`
    fn contains(&self, value: &HostValue) -> BridgeResult<bool> {
        Ok(self.index_of(value)?.is_some())
    }

    /// Current elements in order
    fn to_vec(&self) -> BridgeResult<Vec<HostValue>> {
        (0..self.size()?).map(|i| self.get(i)).collect()
    }

    /// Foreign value this list views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

/// Unordered collection: sets and map value collections
pub trait HostCollection: Send + Sync {
    /// Number of elements
    fn size(&self) -> BridgeResult<usize>;

    /// True when some element equals `value`
    fn contains(&self, value: &HostValue) -> BridgeResult<bool>;

    /// Remove one occurrence of `value`; false when absent
    fn remove(&self, value: &HostValue) -> BridgeResult<bool>;

    /// Current elements
    fn elements(&self) -> BridgeResult<Vec<HostValue>>;

    /// Element at `index` in iteration order, read from the current state
    fn element_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        Ok(self.elements()?.into_iter().nth(index))
    }

    /// Foreign value this collection views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

/// Key/value mapping
pub trait HostMap: Send + Sync {
    /// Number of entries
    fn size(&self) -> BridgeResult<usize>;

    /// Value for `key`, `None` when absent
    fn get(&self, key: &HostValue) -> BridgeResult<Option<HostValue>>;

    /// True when `key` is mapped
    fn contains_key(&self, key: &HostValue) -> BridgeResult<bool>;

    /// Insert or replace, returning the previous value
    fn put(&self, key: HostValue, value: HostValue) -> BridgeResult<Option<HostValue>>;

    /// Remove `key`, returning its value. An absent key is `UnknownIdentifier`.
    fn remove(&self, key: &HostValue) -> BridgeResult<HostValue>;

    /// Current keys
    fn keys(&self) -> BridgeResult<Vec<HostValue>>;

    /// Key at `index` in iteration order, read from the current state
    fn key_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        Ok(self.keys()?.into_iter().nth(index))
    }

    /// Remove `key` only while it maps to `value`
    fn remove_entry(&self, key: &HostValue, value: &HostValue) -> BridgeResult<bool> {
        match self.get(key)? {
            Some(current) if current.host_equals(value) => {
                self.remove(key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Foreign value this map views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

/// One key/value pair
pub trait HostMapEntry: Send + Sync {
    /// Entry key
    fn key(&self) -> BridgeResult<HostValue>;

    /// Current value
    fn value(&self) -> BridgeResult<HostValue>;

    /// Replace the value, returning the previous one
    fn set_value(&self, value: HostValue) -> BridgeResult<HostValue>;

    /// Foreign value this entry views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

/// Single-pass cursor
pub trait HostIterator: Send + Sync {
    /// True while elements remain
    fn has_next(&self) -> BridgeResult<bool>;

    /// Next element; `NoSuchElement` when exhausted
    fn next(&self) -> BridgeResult<HostValue>;

    /// Remove the element last returned by `next`
    fn remove(&self) -> BridgeResult<()> {
        Err(BridgeError::unsupported("remove"))
    }

    /// Foreign value this iterator views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

/// Source of fresh iterators
pub trait HostIterable: Send + Sync {
    /// Fresh iterator
    fn iterator(&self) -> BridgeResult<Arc<dyn HostIterator>>;

    /// Foreign value this iterable views, if any
    fn foreign_source(&self) -> Option<Value> {
        None
    }
}

// ============================================================================
// Iterators over lists and collections
// ============================================================================

#[derive(Default)]
struct Cursor {
    next: usize,
    /// Index returned by the last `next`, cleared by `remove`
    last: Option<usize>,
}

/// Iterator over a [`HostList`]. `remove` is allowed once per `next`.
pub struct ListIterator {
    list: Arc<dyn HostList>,
    cursor: Mutex<Cursor>,
}

impl ListIterator {
    /// Iterator positioned before the first element
    pub fn new(list: Arc<dyn HostList>) -> Self {
        Self {
            list,
            cursor: Mutex::new(Cursor::default()),
        }
    }
}

impl HostIterator for ListIterator {
    fn has_next(&self) -> BridgeResult<bool> {
        Ok(self.cursor.lock().next < self.list.size()?)
    }

    fn next(&self) -> BridgeResult<HostValue> {
        let mut cursor = self.cursor.lock();
        if cursor.next >= self.list.size()? {
            return Err(BridgeError::NoSuchElement);
        }
        let value = self.list.get(cursor.next)?;
        cursor.last = Some(cursor.next);
        cursor.next += 1;
        Ok(value)
    }

    fn remove(&self) -> BridgeResult<()> {
        let mut cursor = self.cursor.lock();
        let Some(last) = cursor.last.take() else {
            return Err(BridgeError::IllegalState(
                "remove() requires a preceding next()".to_string(),
            ));
        };
        self.list.remove_at(last)?;
        cursor.next = last;
        Ok(())
    }
}

/// Iterator over a [`HostCollection`]. Every step re-reads the collection,
/// so elements added or removed behind the iterator are observed.
pub struct CollectionIterator {
    owner: Arc<dyn HostCollection>,
    cursor: Mutex<CollectionCursor>,
}

#[derive(Default)]
struct CollectionCursor {
    next: usize,
    last: Option<(usize, HostValue)>,
}

impl CollectionIterator {
    /// Iterator positioned before the first element
    pub fn new(owner: Arc<dyn HostCollection>) -> BridgeResult<Self> {
        Ok(Self {
            owner,
            cursor: Mutex::new(CollectionCursor::default()),
        })
    }
}

impl HostIterator for CollectionIterator {
    fn has_next(&self) -> BridgeResult<bool> {
        Ok(self.cursor.lock().next < self.owner.size()?)
    }

    fn next(&self) -> BridgeResult<HostValue> {
        let mut cursor = self.cursor.lock();
        let value = self
            .owner
            .element_at(cursor.next)?
            .ok_or(BridgeError::NoSuchElement)?;
        cursor.last = Some((cursor.next, value.clone()));
        cursor.next += 1;
        Ok(value)
    }

    fn remove(&self) -> BridgeResult<()> {
        let mut cursor = self.cursor.lock();
        let (index, value) = cursor.last.take().ok_or_else(|| {
            BridgeError::IllegalState("remove() requires a preceding next()".to_string())
        })?;
        if self.owner.remove(&value)? {
            cursor.next = index;
        }
        Ok(())
    }
}

/// Iterable adapter for lists
pub struct ListIterable(pub Arc<dyn HostList>);

impl HostIterable for ListIterable {
    fn iterator(&self) -> BridgeResult<Arc<dyn HostIterator>> {
        Ok(Arc::new(ListIterator::new(self.0.clone())))
    }
}

/// Iterable adapter for sets and value collections
pub struct CollectionIterable(pub Arc<dyn HostCollection>);

impl HostIterable for CollectionIterable {
    fn iterator(&self) -> BridgeResult<Arc<dyn HostIterator>> {
        Ok(Arc::new(CollectionIterator::new(self.0.clone())?))
    }
}

// ============================================================================
// Live map views
// ============================================================================

/// `keySet()` of a map
pub struct KeySet(pub Arc<dyn HostMap>);

impl HostCollection for KeySet {
    fn size(&self) -> BridgeResult<usize> {
        self.0.size()
    }

    fn contains(&self, value: &HostValue) -> BridgeResult<bool> {
        self.0.contains_key(value)
    }

    fn remove(&self, value: &HostValue) -> BridgeResult<bool> {
        if !self.0.contains_key(value)? {
            return Ok(false);
        }
        self.0.remove(value)?;
        Ok(true)
    }

    fn elements(&self) -> BridgeResult<Vec<HostValue>> {
        self.0.keys()
    }

    fn element_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        self.0.key_at(index)
    }

    fn foreign_source(&self) -> Option<Value> {
        self.0.foreign_source()
    }
}

/// `values()` of a map
pub struct MapValues(pub Arc<dyn HostMap>);

impl HostCollection for MapValues {
    fn size(&self) -> BridgeResult<usize> {
        self.0.size()
    }

    fn contains(&self, value: &HostValue) -> BridgeResult<bool> {
        Ok(self.elements()?.iter().any(|v| v.host_equals(value)))
    }

    fn remove(&self, value: &HostValue) -> BridgeResult<bool> {
        for key in self.0.keys()? {
            if let Some(current) = self.0.get(&key)? {
                if current.host_equals(value) {
                    self.0.remove(&key)?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn elements(&self) -> BridgeResult<Vec<HostValue>> {
        let mut out = Vec::new();
        for key in self.0.keys()? {
            if let Some(value) = self.0.get(&key)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    fn element_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        match self.0.key_at(index)? {
            Some(key) => self.0.get(&key),
            None => Ok(None),
        }
    }
}

/// `entrySet()` of a map
pub struct EntrySet(pub Arc<dyn HostMap>);

impl HostCollection for EntrySet {
    fn size(&self) -> BridgeResult<usize> {
        self.0.size()
    }

    fn contains(&self, value: &HostValue) -> BridgeResult<bool> {
        let HostValue::MapEntry(entry) = value else {
            return Ok(false);
        };
        match self.0.get(&entry.key()?)? {
            Some(current) => Ok(current.host_equals(&entry.value()?)),
            None => Ok(false),
        }
    }

    fn remove(&self, value: &HostValue) -> BridgeResult<bool> {
        let HostValue::MapEntry(entry) = value else {
            return Ok(false);
        };
        self.0.remove_entry(&entry.key()?, &entry.value()?)
    }

    fn elements(&self) -> BridgeResult<Vec<HostValue>> {
        Ok(self
            .0
            .keys()?
            .into_iter()
            .map(|key| {
                HostValue::MapEntry(Arc::new(LiveEntry {
                    map: self.0.clone(),
                    key,
                }))
            })
            .collect())
    }

    fn element_at(&self, index: usize) -> BridgeResult<Option<HostValue>> {
        Ok(self.0.key_at(index)?.map(|key| {
            HostValue::MapEntry(Arc::new(LiveEntry {
                map: self.0.clone(),
                key,
            }))
        }))
    }
}

/// Entry that reads and writes through to its map
pub struct LiveEntry {
    map: Arc<dyn HostMap>,
    key: HostValue,
}

impl HostMapEntry for LiveEntry {
    fn key(&self) -> BridgeResult<HostValue> {
        Ok(self.key.clone())
    }

    fn value(&self) -> BridgeResult<HostValue> {
        Ok(self.map.get(&self.key)?.unwrap_or(HostValue::Null))
    }

    fn set_value(&self, value: HostValue) -> BridgeResult<HostValue> {
        Ok(self
            .map
            .put(self.key.clone(), value)?
            .unwrap_or(HostValue::Null))
    }
}

/// Live `keySet()` of `map`
pub fn key_set(map: &Arc<dyn HostMap>) -> Arc<dyn HostCollection> {
    Arc::new(KeySet(map.clone()))
}

/// Live `values()` of `map`
pub fn values(map: &Arc<dyn HostMap>) -> Arc<dyn HostCollection> {
    Arc::new(MapValues(map.clone()))
}

/// Live `entrySet()` of `map`
pub fn entry_set(map: &Arc<dyn HostMap>) -> Arc<dyn HostCollection> {
    Arc::new(EntrySet(map.clone()))
}

// ============================================================================
// Host-owned implementations
// ============================================================================

/// Growable host list
#[derive(Default)]
pub struct VecList {
    items: RwLock<Vec<HostValue>>,
}

impl VecList {
    /// List holding `items`
    pub fn new(items: Vec<HostValue>) -> Arc<Self> {
        Arc::new(Self {
            items: RwLock::new(items),
        })
    }
}

fn out_of_range(index: usize) -> BridgeError {
    BridgeError::Interop(InteropError::InvalidArrayIndex(index as i64))
}

impl HostList for VecList {
    fn size(&self) -> BridgeResult<usize> {
        Ok(self.items.read().len())
    }

    fn get(&self, index: usize) -> BridgeResult<HostValue> {
        self.items
            .read()
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index))
    }

    fn set(&self, index: usize, value: HostValue) -> BridgeResult<HostValue> {
        let mut items = self.items.write();
        let slot = items.get_mut(index).ok_or_else(|| out_of_range(index))?;
        Ok(std::mem::replace(slot, value))
    }

    fn add(&self, value: HostValue) -> BridgeResult<()> {
        self.items.write().push(value);
        Ok(())
    }

    fn remove_at(&self, index: usize) -> BridgeResult<HostValue> {
        let mut items = self.items.write();
        if index >= items.len() {
            return Err(out_of_range(index));
        }
        Ok(items.remove(index))
    }
}

/// Insertion-ordered host map
#[derive(Default)]
pub struct LinkedMap {
    entries: RwLock<Vec<(HostValue, HostValue)>>,
}

impl LinkedMap {
    /// Empty map
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Map holding `entries` in order
    pub fn from_entries(entries: Vec<(HostValue, HostValue)>) -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(entries),
        })
    }
}

impl HostMap for LinkedMap {
    fn size(&self) -> BridgeResult<usize> {
        Ok(self.entries.read().len())
    }

    fn get(&self, key: &HostValue) -> BridgeResult<Option<HostValue>> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|(k, _)| k.host_equals(key))
            .map(|(_, v)| v.clone()))
    }

    fn contains_key(&self, key: &HostValue) -> BridgeResult<bool> {
        Ok(self.entries.read().iter().any(|(k, _)| k.host_equals(key)))
    }

    fn put(&self, key: HostValue, value: HostValue) -> BridgeResult<Option<HostValue>> {
        let mut entries = self.entries.write();
        if let Some((_, slot)) = entries.iter_mut().find(|(k, _)| k.host_equals(&key)) {
            return Ok(Some(std::mem::replace(slot, value)));
        }
        entries.push((key, value));
        Ok(None)
    }

    fn remove(&self, key: &HostValue) -> BridgeResult<HostValue> {
        let mut entries = self.entries.write();
        match entries.iter().position(|(k, _)| k.host_equals(key)) {
            Some(index) => Ok(entries.remove(index).1),
            None => Err(BridgeError::Interop(InteropError::unknown(
                key.display_string(),
            ))),
        }
    }

    fn keys(&self) -> BridgeResult<Vec<HostValue>> {
        Ok(self.entries.read().iter().map(|(k, _)| k.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i32]) -> Vec<HostValue> {
        values.iter().map(|v| HostValue::Int(*v)).collect()
    }

    #[test]
    fn test_vec_list_bounds() {
        let list = VecList::new(ints(&[1, 2, 3]));
        assert!(matches!(
            list.get(3),
            Err(BridgeError::Interop(InteropError::InvalidArrayIndex(3)))
        ));
        let previous = list.set(0, HostValue::Int(9)).unwrap();
        assert_eq!(previous.as_int(), Some(1));
        assert_eq!(list.index_of(&HostValue::Int(9)).unwrap(), Some(0));
    }

    #[test]
    fn test_list_iterator_remove_discipline() {
        let list: Arc<dyn HostList> = VecList::new(ints(&[1, 2, 3]));
        let iter = ListIterator::new(list.clone());
        assert!(matches!(iter.remove(), Err(BridgeError::IllegalState(_))));
        assert_eq!(iter.next().unwrap().as_int(), Some(1));
        iter.remove().unwrap();
        assert!(matches!(iter.remove(), Err(BridgeError::IllegalState(_))));
        assert_eq!(iter.next().unwrap().as_int(), Some(2));
        assert_eq!(list.size().unwrap(), 2);
        assert_eq!(iter.next().unwrap().as_int(), Some(3));
        assert!(!iter.has_next().unwrap());
        assert!(matches!(iter.next(), Err(BridgeError::NoSuchElement)));
    }

    #[test]
    fn test_linked_map_views_are_live() {
        let map: Arc<dyn HostMap> = LinkedMap::new();
        map.put(HostValue::from("a"), HostValue::Int(1)).unwrap();
        map.put(HostValue::from("b"), HostValue::Int(2)).unwrap();

        let keys = key_set(&map);
        assert!(keys.remove(&HostValue::from("a")).unwrap());
        assert!(!keys.remove(&HostValue::from("a")).unwrap());
        assert_eq!(map.size().unwrap(), 1);

        let vals = values(&map);
        assert!(vals.contains(&HostValue::Int(2)).unwrap());
        map.put(HostValue::from("c"), HostValue::Int(3)).unwrap();
        assert_eq!(vals.size().unwrap(), 2);

        let entries = entry_set(&map);
        let first = entries.elements().unwrap().remove(0);
        if let HostValue::MapEntry(entry) = &first {
            entry.set_value(HostValue::Int(20)).unwrap();
        }
        assert_eq!(map.get(&HostValue::from("b")).unwrap().and_then(|v| v.as_int()), Some(20));
        assert!(entries.remove(&first).unwrap());
        assert_eq!(map.size().unwrap(), 1);
    }

    #[test]
    fn test_missing_key_removal() {
        let map = LinkedMap::new();
        assert!(matches!(
            map.remove(&HostValue::from("x")),
            Err(BridgeError::Interop(InteropError::UnknownIdentifier(_)))
        ));
    }

    #[test]
    fn test_collection_iterator_removes_from_owner() {
        let map: Arc<dyn HostMap> = LinkedMap::from_entries(vec![
            (HostValue::from("a"), HostValue::Int(1)),
            (HostValue::from("b"), HostValue::Int(2)),
        ]);
        let iter = CollectionIterator::new(key_set(&map)).unwrap();
        iter.next().unwrap();
        iter.remove().unwrap();
        assert!(!map.contains_key(&HostValue::from("a")).unwrap());
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.next().unwrap().as_str(), Some("b"));
        assert!(!iter.has_next().unwrap());
    }

    #[test]
    fn test_collection_iterator_sees_later_insertions() {
        let map: Arc<dyn HostMap> = LinkedMap::from_entries(vec![(HostValue::from("a"), HostValue::Int(1))]);
        let iter = CollectionIterator::new(values(&map)).unwrap();
        assert_eq!(iter.next().unwrap().as_int(), Some(1));
        assert!(!iter.has_next().unwrap());
        map.put(HostValue::from("b"), HostValue::Int(2)).unwrap();
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.next().unwrap().as_int(), Some(2));
    }
}
