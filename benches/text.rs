use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::{Base14Font, Document, Object};

fn sample_document_bytes() -> (Vec<u8>, pdfcore::ObjectId) {
    let mut doc = Document::new();
    let pages_id = doc.add_object(Object::Dictionary(pdfcore::dictionary! {
        "Type" => Object::name("Pages"),
        "Kids" => Object::Array(vec![]),
        "Count" => Object::Integer(0),
    }));
    let catalog_id = doc.add_object(Object::Dictionary(pdfcore::dictionary! {
        "Type" => Object::name("Catalog"),
        "Pages" => Object::Reference(pages_id),
    }));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let font_id = doc.add_base14_font(Base14Font::Helvetica);
    let resources = doc.font_resources(font_id);
    let content = b"BT /F1 12 Tf 72 720 Td (Hello World) Tj ET".to_vec();
    let page_id = doc.add_page([0.0, 0.0, 612.0, 792.0], resources, content).unwrap();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    (buffer, page_id)
}

fn bench_extract_text(c: &mut Criterion) {
    let (buffer, page_id) = sample_document_bytes();
    let doc = Document::load_from(Cursor::new(&buffer)).unwrap();

    c.bench_function("extract_text", |b| {
        b.iter(|| {
            let _ = doc.extract_text(page_id).unwrap();
        })
    });
}

fn bench_text_replace(c: &mut Criterion) {
    let (buffer, page_id) = sample_document_bytes();

    c.bench_function("text_replace", |b| {
        b.iter(|| {
            let mut doc = Document::load_from(Cursor::new(&buffer)).unwrap();
            let _ = doc.replace_text(page_id, "Hello World", "Replaced Text");
        })
    });
}

criterion_group!(benches, bench_extract_text, bench_text_replace);
criterion_main!(benches);
