use std::io::Cursor;

use pdfcore::{dictionary, Document, Object, SaveOptions};

fn save_bytes(doc: &mut Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

#[test]
fn empty_document_round_trips() {
    let mut doc = Document::new();
    let buffer = save_bytes(&mut doc);

    assert_eq!(&buffer[..9], b"%PDF-1.7\n");
    let tail = String::from_utf8_lossy(&buffer[buffer.len().saturating_sub(64)..]);
    assert!(tail.contains("%%EOF"));

    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();
    assert!(reloaded.get_pages().is_err() || reloaded.get_pages().unwrap().is_empty());
}

#[test]
fn objects_survive_a_round_trip_with_matching_ids_and_values() {
    let mut doc = Document::new();
    let int_id = doc.add_object(Object::Integer(42));
    let name_id = doc.add_object(Object::name("Catalog"));
    let dict_id = doc.add_object(Object::Dictionary(dictionary! {
        "Count" => Object::Integer(3),
        "Type" => Object::name("Pages"),
    }));

    let highest_before = doc.max_object_id();
    let buffer = save_bytes(&mut doc);
    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();

    assert_eq!(reloaded.max_object_id(), highest_before);
    assert_eq!(reloaded.get_object(int_id).unwrap(), Object::Integer(42));
    assert_eq!(reloaded.get_object(name_id).unwrap(), Object::name("Catalog"));
    let dict = reloaded.get_object(dict_id).unwrap();
    assert_eq!(dict.as_dict().unwrap().get(b"Count").unwrap().as_i64().unwrap(), 3);
}

#[test]
fn dictionary_keys_are_written_in_sorted_order() {
    let mut doc = Document::new();
    let dict = dictionary! {
        "Zebra" => Object::Integer(1),
        "Apple" => Object::Integer(2),
        "Mango" => Object::Integer(3),
    };
    let id = doc.add_object(Object::Dictionary(dict));
    let buffer = save_bytes(&mut doc);

    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();
    let dict = reloaded.get_object(id).unwrap();
    let keys: Vec<&[u8]> = dict.as_dict().unwrap().iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn classic_xref_offsets_point_at_the_xref_keyword() {
    let mut doc = Document::new();
    doc.add_object(Object::Integer(1));
    doc.add_object(Object::Integer(2));
    let buffer = save_bytes(&mut doc);

    let text = String::from_utf8_lossy(&buffer);
    let startxref_pos = text.rfind("startxref").unwrap();
    let offset_line = text[startxref_pos..].lines().nth(1).unwrap().trim();
    let offset: usize = offset_line.parse().unwrap();
    assert_eq!(&buffer[offset..offset + 4], b"xref");
}

#[test]
fn xref_stream_offset_points_at_its_own_object_header() {
    let mut doc = Document::new();
    doc.add_object(Object::Integer(1));
    doc.add_object(Object::Integer(2));

    let options = SaveOptions::builder().use_xref_streams(true).build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options).unwrap();

    let text = String::from_utf8_lossy(&buffer);
    let startxref_pos = text.rfind("startxref").unwrap();
    let offset_line = text[startxref_pos..].lines().nth(1).unwrap().trim();
    let offset: usize = offset_line.parse().unwrap();
    let header = String::from_utf8_lossy(&buffer[offset..(offset + 20).min(buffer.len())]);
    assert!(header.contains(" obj"));

    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();
    assert_eq!(reloaded.get_object((1, 0)).unwrap(), Object::Integer(1));
}

#[test]
fn object_streams_round_trip_packed_objects() {
    let mut doc = Document::new();
    for i in 0..50 {
        doc.add_object(Object::Integer(i));
    }
    let options = SaveOptions::builder().use_object_streams(true).build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options).unwrap();

    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();
    for i in 0..50 {
        assert_eq!(reloaded.get_object((i as u32 + 1, 0)).unwrap(), Object::Integer(i));
    }
}

#[test]
fn two_saves_of_the_same_document_are_byte_identical_outside_the_id() {
    let mut doc = Document::new();
    doc.add_object(Object::Integer(7));
    doc.trailer.set("ID", Object::Array(vec![Object::string_literal(vec![0u8; 16]), Object::string_literal(vec![0u8; 16])]));

    let first = save_bytes(&mut doc.clone());
    let second = save_bytes(&mut doc.clone());
    assert_eq!(first, second);
}
