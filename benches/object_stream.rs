use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use pdfcore::{dictionary, Document, Object, ObjectStreamBuilder, ObjectStreamConfig};

fn bench_object_stream_build(c: &mut Criterion) {
    let objects: Vec<(u32, Object)> = (1..=100)
        .map(|i| {
            let dict = dictionary! {
                "Type" => Object::name("TestObj"),
                "Value" => Object::Integer(i),
            };
            (i as u32, Object::Dictionary(dict))
        })
        .collect();

    c.bench_function("object_stream_build", |b| {
        b.iter(|| {
            let mut builder = ObjectStreamBuilder::new(ObjectStreamConfig::default());
            for (num, object) in &objects {
                builder.push((*num, 0), object.clone()).unwrap();
            }
            let _ = builder.build().unwrap();
        })
    });
}

fn bench_object_stream_round_trip(c: &mut Criterion) {
    let mut doc = Document::new();
    doc.trailer.set("Root", Object::Reference((1, 0)));
    let catalog = dictionary! { "Type" => Object::name("Catalog") };
    doc.set_object((1, 0), Object::Dictionary(catalog));
    for i in 0..100 {
        doc.add_object(Object::Integer(i));
    }
    let options = pdfcore::SaveOptions::builder().use_object_streams(true).build();
    let mut buffer = Vec::new();
    doc.save_with_options(&mut buffer, options).unwrap();

    c.bench_function("object_stream_round_trip", |b| {
        b.iter(|| {
            Document::load_from(Cursor::new(&buffer)).unwrap();
        })
    });
}

criterion_group!(benches, bench_object_stream_build, bench_object_stream_round_trip);
criterion_main!(benches);
