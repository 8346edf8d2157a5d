use crate::A2lObjectName;
use fnv::FnvBuildHasher;
use std::{collections::HashMap, ops::Index};

/// A map of named a2l items
///
/// An ItemMap keeps the items in insertion order and allows fast access to items by their
/// name. Names are unique: inserting an item whose name is already present replaces the
/// earlier item in place.
#[derive(Debug, Clone)]
pub struct ItemMap<T: A2lObjectName> {
    // storage for items
    items: Vec<T>,
    // mapping from item name to index in the items vector
    map: HashMap<String, usize, FnvBuildHasher>,
}

impl<T: A2lObjectName> ItemMap<T> {
    /// create a new ItemMap
    pub fn new() -> Self {
        Self {
            items: vec![],
            map: HashMap::default(),
        }
    }

    /// create a new ItemMap with a specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            map: HashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// insert an item into the ItemMap
    ///
    /// If an item with the same name exists, it is replaced and returned.
    pub fn insert(&mut self, value: T) -> Option<T> {
        if let Some(&index) = self.map.get(value.get_name()) {
            Some(std::mem::replace(&mut self.items[index], value))
        } else {
            self.map
                .insert(value.get_name().to_string(), self.items.len());
            self.items.push(value);
            None
        }
    }

    /// get an item by name
    pub fn get(&self, key: &str) -> Option<&T> {
        let index = self.map.get(key)?;
        Some(&self.items[*index])
    }

    /// Checks if the ItemMap contains an item with the given name
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Returns an iterator over references to the items, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns an iterator over the names in the ItemMap
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    /// Returns the number of items in the ItemMap
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the ItemMap is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ItemMap<T>
where
    T: A2lObjectName,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: A2lObjectName> Index<&str> for ItemMap<T> {
    type Output = T;

    fn index(&self, key: &str) -> &Self::Output {
        match self.map.get(key) {
            Some(index) => &self.items[*index],
            None => panic!("no item named {key}"),
        }
    }
}

impl<T> FromIterator<T> for ItemMap<T>
where
    T: A2lObjectName,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let into_iter = iter.into_iter();
        let (low, _high) = into_iter.size_hint();
        let mut item_map = ItemMap::with_capacity(low);
        for item in into_iter {
            item_map.insert(item);
        }
        item_map
    }
}

impl<T> IntoIterator for ItemMap<T>
where
    T: A2lObjectName,
{
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ItemMap<T>
where
    T: A2lObjectName,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> PartialEq for ItemMap<T>
where
    T: A2lObjectName + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
        // no need to compare the maps, as they are derived from the items
    }
}
