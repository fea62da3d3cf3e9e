use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::{dictionary, Document, Object, SaveOptions};

fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.trailer.set("Root", Object::Reference((1, 0)));
    let catalog = dictionary! { "Type" => Object::name("Catalog") };
    doc.set_object((1, 0), Object::Dictionary(catalog));
    for i in 0..200 {
        let entry = dictionary! {
            "Type" => Object::name("TestObj"),
            "Value" => Object::Integer(i),
        };
        doc.add_object(Object::Dictionary(entry));
    }
    doc
}

fn bench_save_classic(c: &mut Criterion) {
    let mut buffer = Vec::new();
    sample_document().save_to(&mut buffer).unwrap();
    let doc = Document::load_from(Cursor::new(&buffer)).unwrap();

    c.bench_function("save_classic", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            let mut doc_clone = doc.clone();
            doc_clone.save_to(&mut output).unwrap();
        })
    });
}

fn bench_save_modern(c: &mut Criterion) {
    let mut buffer = Vec::new();
    sample_document().save_to(&mut buffer).unwrap();
    let doc = Document::load_from(Cursor::new(&buffer)).unwrap();

    c.bench_function("save_modern", |b| {
        b.iter(|| {
            let mut output = Vec::new();
            let options = SaveOptions::builder().use_xref_streams(true).use_object_streams(true).build();
            let mut doc_clone = doc.clone();
            doc_clone.save_with_options(&mut output, options).unwrap();
        })
    });
}

criterion_group!(benches, bench_save_classic, bench_save_modern);
criterion_main!(benches);
