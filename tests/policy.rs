use pdfcore::{Document, EncryptionState, EncryptionVersion, PdfAFlavor, Permissions};

#[test]
fn pdfa_flavored_document_rejects_encryption() {
    let mut doc = Document::new();
    doc.set_pdfa_flavor(PdfAFlavor::PdfA2B).unwrap();

    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password: "user",
        key_length: 128,
        permissions: Permissions::all(),
    })
    .unwrap();

    assert!(doc.encrypt(&state).is_err());
    assert!(!doc.is_encrypted());
}

#[test]
fn encrypted_document_rejects_pdfa_tagging() {
    let mut doc = Document::new();
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password: "user",
        key_length: 128,
        permissions: Permissions::all(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();

    assert!(doc.set_pdfa_flavor(PdfAFlavor::PdfA2B).is_err());
    assert!(doc.pdfa_flavor().is_none());
}
