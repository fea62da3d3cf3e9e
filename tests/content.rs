use std::io::Cursor;

use pdfcore::{dictionary, Base14Font, Document, Object};

fn minimal_catalog(doc: &mut Document) {
    let pages_id = doc.add_object(Object::Dictionary(dictionary! {
        "Type" => Object::name("Pages"),
        "Kids" => Object::Array(vec![]),
        "Count" => Object::Integer(0),
    }));
    let catalog_id = doc.add_object(Object::Dictionary(dictionary! {
        "Type" => Object::name("Catalog"),
        "Pages" => Object::Reference(pages_id),
    }));
    doc.trailer.set("Root", Object::Reference(catalog_id));
}

#[test]
fn single_page_text_tokenizes_back_to_the_written_string() {
    let mut doc = Document::new();
    minimal_catalog(&mut doc);

    let font_id = doc.add_base14_font(Base14Font::Helvetica);
    let resources = doc.font_resources(font_id);
    let page_id = doc
        .add_page([0.0, 0.0, 612.0, 792.0], resources, b"BT /F1 12 Tf 72 720 Td (Hello, PDF!) Tj ET".to_vec())
        .unwrap();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();

    let reloaded = Document::load_from(Cursor::new(&buffer)).unwrap();
    assert_eq!(reloaded.get_pages().unwrap(), vec![page_id]);

    let content = reloaded.get_page_contents(page_id).unwrap();
    let parsed = pdfcore::Content::decode(&content).unwrap();
    let operators: Vec<&str> = parsed.operations.iter().map(|op| op.operator.as_str()).collect();
    assert!(operators.contains(&"Tj"));

    let tj = parsed.operations.iter().find(|op| op.operator == "Tj").unwrap();
    assert_eq!(tj.operands[0], Object::string_literal(b"Hello, PDF!".to_vec()));
    assert_eq!(reloaded.extract_text(page_id).unwrap(), "Hello, PDF!");
}

#[test]
fn replace_text_rewrites_the_content_stream() {
    let mut doc = Document::new();
    minimal_catalog(&mut doc);

    let font_id = doc.add_base14_font(Base14Font::Helvetica);
    let resources = doc.font_resources(font_id);
    let page_id = doc
        .add_page([0.0, 0.0, 612.0, 792.0], resources, b"BT /F1 12 Tf 72 720 Td (Hello, PDF!) Tj ET".to_vec())
        .unwrap();

    doc.replace_text(page_id, "Hello, PDF!", "Goodbye, PDF!").unwrap();
    assert_eq!(doc.extract_text(page_id).unwrap(), "Goodbye, PDF!");
}
