use crate::{Document, Object};

#[test]
#[should_panic(expected = "Xref(RecoveryFailed)")]
fn load_short_document_panics_when_even_the_recovery_scan_finds_nothing() {
    Document::load_mem(b"%PDF-1.5\n%%EOF\n".to_vec()).unwrap();
}

#[test]
fn load_document_with_broken_xref_recovers_by_scanning_for_objects() {
    let mut buf = sample_pdf();
    // Corrupt the xref section's keyword so the documented path fails to parse, forcing the
    // fallback object scan to rebuild the table from the `N G obj` headers still in the file.
    let xref_pos = buf.windows(4).position(|w| w == b"xref").unwrap();
    buf[xref_pos] = b'X';

    let doc = Document::load_mem(buf).unwrap();
    let pages = doc.get_pages().unwrap();
    assert_eq!(pages.len(), 1);
    let page = doc.get_object(pages[0]).unwrap();
    assert_eq!(page.as_dict().unwrap().get_type().unwrap(), b"Page");
}

#[test]
fn load_document_with_preceding_garbage_bytes() {
    let mut content = Vec::new();
    content.extend(b"garbage-before-header");
    content.extend(sample_pdf());
    let doc = Document::load_mem(content).unwrap();
    assert_eq!(doc.version, (1, 4));
}

#[test]
fn load_mem_reads_catalog_and_pages() {
    let doc = Document::load_mem(sample_pdf()).unwrap();
    assert_eq!(doc.version, (1, 4));
    let pages = doc.get_pages().unwrap();
    assert_eq!(pages.len(), 1);
    let page = doc.get_object(pages[0]).unwrap();
    assert_eq!(page.as_dict().unwrap().get_type().unwrap(), b"Page");
}

#[test]
fn load_mem_with_incremental_update_keeps_first_writer() {
    let base = sample_pdf();
    let base_xref_offset = xref_of_base(&base);

    // Incremental update: object 3 (the page) is replaced with a new /MediaBox, and the new
    // xref section chains back to the original via /Prev.
    let mut updated = base;
    let new_obj_offset = updated.len();
    updated.extend(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] /Resources << >> >>\nendobj\n");

    let new_xref_offset = updated.len();
    updated.extend(b"xref\n3 1\n");
    updated.extend(format!("{:010} 00000 n \n", new_obj_offset).into_bytes());
    updated.extend(
        format!(
            "trailer\n<< /Size 4 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF",
            base_xref_offset, new_xref_offset
        )
        .into_bytes(),
    );

    let doc = Document::load_mem(updated).unwrap();
    let pages = doc.get_pages().unwrap();
    let page = doc.get_object(pages[0]).unwrap();
    let media_box = page.as_dict().unwrap().get(b"MediaBox").unwrap().as_array().unwrap();
    assert_eq!(media_box[2], Object::Integer(300));
}

fn xref_of_base(base: &[u8]) -> usize {
    let text = std::str::from_utf8(base).unwrap();
    let pos = text.rfind("startxref").unwrap();
    let rest = &text[pos + "startxref".len()..];
    rest.trim_start().split_whitespace().next().unwrap().parse().unwrap()
}

/// A hand-built three-object PDF: a catalog, a one-page /Pages tree, and the page itself,
/// closed with a classic xref table and trailer.
fn sample_pdf() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    let mut push_obj = |buf: &mut Vec<u8>, num: u32, body: &[u8]| {
        offsets.push((num, buf.len()));
        buf.extend(format!("{} 0 obj\n", num).into_bytes());
        buf.extend(body);
        buf.extend(b"\nendobj\n");
    };

    push_obj(&mut buf, 1, b"<< /Type /Catalog /Pages 2 0 R >>");
    push_obj(&mut buf, 2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    push_obj(
        &mut buf,
        3,
        b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>",
    );

    let xref_offset = buf.len();
    buf.extend(b"xref\n0 4\n0000000000 65535 f \n");
    for (_, offset) in &offsets {
        buf.extend(format!("{:010} 00000 n \n", offset).into_bytes());
    }
    buf.extend(b"trailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n");
    buf.extend(format!("{}\n", xref_offset).into_bytes());
    buf.extend(b"%%EOF");
    buf
}
