use super::Object;
use crate::{Error, Result};

/// A PDF dictionary, kept sorted by key so that equal dictionaries always compare byte-for-byte
/// equal regardless of the order keys were inserted in, and so look-ups are a binary search
/// rather than a linear scan. This diverges deliberately from the teacher's `IndexMap`-based
/// dictionary, which preserves insertion order; that property isn't needed here and sorted
/// storage makes `Dictionary: Ord` for free, which object-stream packing relies on to produce
/// deterministic output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(Vec<(Vec<u8>, Object)>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(Vec::new())
    }

    fn find(&self, key: &[u8]) -> std::result::Result<usize, usize> {
        self.0.binary_search_by(|(k, _)| k.as_slice().cmp(key))
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        match self.find(key) {
            Ok(idx) => Ok(&self.0[idx].1),
            Err(_) => Err(Error::DictKey(String::from_utf8_lossy(key).into_owned())),
        }
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        match self.find(key) {
            Ok(idx) => Ok(&mut self.0[idx].1),
            Err(_) => Err(Error::DictKey(String::from_utf8_lossy(key).into_owned())),
        }
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.find(key).is_ok()
    }

    /// Inserts `value` under `key`, keeping the backing vector sorted. Returns the previous
    /// value, if any, matching `Vec`/`BTreeMap::insert`'s convention.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Option<Object>
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        let key = key.into();
        match self.find(&key) {
            Ok(idx) => Some(std::mem::replace(&mut self.0[idx].1, value.into())),
            Err(idx) => {
                self.0.insert(idx, (key, value.into()));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        match self.find(key) {
            Ok(idx) => Some(self.0.remove(idx).1),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.0.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&[u8], &mut Object)> {
        self.0.iter_mut().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.0.iter().map(|(k, _)| k.as_slice())
    }

    /// `/Type` is read constantly enough (object classification, `Object::has_type`) to deserve
    /// a shorthand that turns the lookup-as-name-bytes into a single call.
    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type(&self, name: &[u8]) -> bool {
        self.get_type().map(|t| t == name).unwrap_or(false)
    }

    pub fn get_deref<'a>(&'a self, key: &[u8], resolve: impl Fn(&'a Object) -> &'a Object) -> Result<&'a Object> {
        Ok(resolve(self.get(key)?))
    }
}

impl FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

/// Builds a [`Dictionary`] with `/Name value, ...` syntax close to the PDF source it represents,
/// matching the teacher's `dictionary!` macro.
#[macro_export]
macro_rules! dictionary {
    () => { $crate::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::Dictionary::new();
        $(dict.set($key, $value);)+
        dict
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_keys_sorted() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Catalog"));
        dict.set("Count", Object::Integer(3));
        dict.set("Kids", Object::Array(vec![]));
        let keys: Vec<&[u8]> = dict.keys().collect();
        assert_eq!(keys, vec![b"Count".as_slice(), b"Kids", b"Type"]);
    }

    #[test]
    fn set_on_existing_key_returns_previous_value() {
        let mut dict = Dictionary::new();
        dict.set("Count", Object::Integer(1));
        let previous = dict.set("Count", Object::Integer(2));
        assert_eq!(previous, Some(Object::Integer(1)));
        assert_eq!(dict.get(b"Count").unwrap(), &Object::Integer(2));
    }

    #[test]
    fn missing_key_is_a_dict_key_error() {
        let dict = Dictionary::new();
        assert!(matches!(dict.get(b"Missing"), Err(Error::DictKey(_))));
    }

    #[test]
    fn equal_dictionaries_compare_equal_regardless_of_insertion_order() {
        let a = dictionary! { "A" => 1, "B" => 2 };
        let b = dictionary! { "B" => 2, "A" => 1 };
        assert_eq!(a, b);
    }

    #[test]
    fn macro_builds_expected_dictionary() {
        let dict = dictionary! { "Type" => "Catalog" };
        assert_eq!(dict.get(b"Type").unwrap().as_str().unwrap(), b"Catalog");
    }
}
