//! Named destinations (ISO 32000-2 12.3.2.3): the `/Names/Dests` tree the catalog can carry,
//! mapping a name to a page + view. Adapted near-verbatim from the teacher's `destinations.rs`;
//! the tree-walking shape is identical, only the per-node fetch changed, since `Document::get_object`
//! here returns an owned clone rather than a reference into an eagerly-populated table.

use indexmap::IndexMap;

use crate::{Dictionary, Document, Object, Result};

#[derive(Debug, Clone)]
pub struct Destination(Dictionary);

impl Destination {
    pub fn new(title: Object, page: Object, typ: Object) -> Self {
        let mut dict = Dictionary::new();
        dict.set(b"Title".to_vec(), title);
        dict.set(b"Page".to_vec(), page);
        dict.set(b"Type".to_vec(), typ);
        Destination(dict)
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.set(key, value);
    }

    pub fn title(&self) -> Result<&Object> {
        self.0.get(b"Title")
    }

    pub fn page(&self) -> Result<&Object> {
        self.0.get(b"Page")
    }
}

impl Document {
    /// Walks a `/Names/Dests` subtree (`tree`), collecting every leaf into `named_destinations`.
    pub fn get_named_destinations(
        &self,
        tree: &Dictionary,
        named_destinations: &mut IndexMap<Vec<u8>, Destination>,
    ) -> Result<()> {
        if let Ok(kids) = tree.get(b"Kids") {
            for kid in kids.as_array()? {
                let Ok(kid_id) = kid.as_reference() else { continue };
                let Ok(kid_obj) = self.get_object(kid_id) else { continue };
                let Ok(kid_dict) = kid_obj.as_dict() else { continue };
                self.get_named_destinations(kid_dict, named_destinations)?;
            }
        }

        if let Ok(names) = tree.get(b"Names") {
            let mut names = names.as_array()?.iter();
            while let (Some(key), Some(val)) = (names.next(), names.next()) {
                let Ok(key_bytes) = key.as_str().map(<[u8]>::to_vec) else { continue };

                if let Ok(obj_ref) = val.as_reference() {
                    let Ok(resolved) = self.get_object(obj_ref) else { continue };
                    match resolved {
                        Object::Dictionary(dict) => {
                            if let Some(dest) = destination_from_d_array(key, &dict) {
                                named_destinations.insert(key_bytes, dest);
                            }
                        }
                        Object::Array(arr) if arr.len() >= 2 => {
                            named_destinations.insert(
                                key_bytes,
                                Destination::new(key.clone(), arr[0].clone(), arr[1].clone()),
                            );
                        }
                        _ => {}
                    }
                } else if let Ok(dict) = val.as_dict() {
                    if let Some(dest) = destination_from_d_array(key, dict) {
                        named_destinations.insert(key_bytes, dest);
                    }
                }
            }
        }
        Ok(())
    }
}

fn destination_from_d_array(key: &Object, dict: &Dictionary) -> Option<Destination> {
    let arr = dict.get(b"D").and_then(Object::as_array).ok()?;
    if arr.len() < 2 {
        return None;
    }
    Some(Destination::new(key.clone(), arr[0].clone(), arr[1].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn walks_a_flat_names_tree() {
        let mut doc = Document::new();
        let page_id = doc.add_object(dictionary! { "Type" => Object::name("Page") });
        let names = dictionary! {
            "Names" => Object::Array(vec![
                Object::string_literal("Chapter1"),
                Object::Array(vec![Object::Reference(page_id), Object::name("Fit")]),
            ]),
        };

        let mut found = IndexMap::new();
        doc.get_named_destinations(&names, &mut found).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["Chapter1".as_bytes()].page().unwrap(), &Object::Reference(page_id));
    }
}
