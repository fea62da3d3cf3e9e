use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::Document;

fn sample_document_bytes() -> Vec<u8> {
    let mut doc = Document::new();
    doc.trailer.set("Root", pdfcore::Object::Reference((1, 0)));
    let catalog = pdfcore::dictionary! {
        "Type" => pdfcore::Object::name("Catalog"),
    };
    doc.set_object((1, 0), pdfcore::Object::Dictionary(catalog));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn bench_load(c: &mut Criterion) {
    let buffer = sample_document_bytes();
    c.bench_function("load", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

fn bench_load_with_object_streams(c: &mut Criterion) {
    let mut doc = Document::new();
    doc.trailer.set("Root", pdfcore::Object::Reference((1, 0)));
    let catalog = pdfcore::dictionary! { "Type" => pdfcore::Object::name("Catalog") };
    doc.set_object((1, 0), pdfcore::Object::Dictionary(catalog));
    for i in 0..50 {
        doc.add_object(pdfcore::Object::Integer(i));
    }
    let options = pdfcore::SaveOptions::builder().use_object_streams(true).build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options).unwrap();

    c.bench_function("load_with_object_streams", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

criterion_group!(benches, bench_load, bench_load_with_object_streams);
criterion_main!(benches);
