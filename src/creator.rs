//! Page and font construction helpers (spec §1 boundary: "font file parsing... beyond the
//! metrics needed to embed them" — base-14 fonts need no file parsing at all, only the standard
//! name). Builds the catalog/page-tree/resource-dictionary scaffolding a new `Document` needs to
//! hold a content stream, without any layout or glyph-metric computation.

use crate::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// The 14 standard Type1 fonts every conforming PDF viewer must support without an embedded font
/// program (ISO 32000-2 9.6.2.2, Annex D). Only the names this crate actually constructs font
/// dictionaries for are listed; the others can be named directly via [`Document::add_base14_font`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base14Font {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl Base14Font {
    fn base_font_name(self) -> &'static str {
        match self {
            Base14Font::Helvetica => "Helvetica",
            Base14Font::HelveticaBold => "Helvetica-Bold",
            Base14Font::TimesRoman => "Times-Roman",
            Base14Font::TimesBold => "Times-Bold",
            Base14Font::Courier => "Courier",
            Base14Font::CourierBold => "Courier-Bold",
        }
    }
}

impl Document {
    /// Adds a `/Type /Font /Subtype /Type1` dictionary naming one of the base-14 standard fonts.
    /// No font program is embedded — conforming readers are required to substitute their own
    /// glyphs for these names (spec §1 Non-goal: no font file parsing).
    pub fn add_base14_font(&mut self, font: Base14Font) -> ObjectId {
        let dict = dictionary! {
            "Type" => Object::name("Font"),
            "Subtype" => Object::name("Type1"),
            "BaseFont" => Object::name(font.base_font_name()),
            "Encoding" => Object::name("WinAnsiEncoding"),
        };
        self.add_object(Object::Dictionary(dict))
    }

    /// Appends a new page to the document's `/Pages` tree, with `resources` merged in as the
    /// page's `/Resources` (typically a `/Font` subdictionary naming fonts added via
    /// [`Document::add_base14_font`]) and `content` as its (uncompressed) content stream.
    pub fn add_page(&mut self, media_box: [f64; 4], resources: Dictionary, content: Vec<u8>) -> crate::Result<ObjectId> {
        let catalog = self.catalog()?;
        let pages_id = catalog.get(b"Pages")?.as_reference()?;

        let content_id = self.add_object(Stream::new(Dictionary::new(), content));
        let page = dictionary! {
            "Type" => Object::name("Page"),
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => Object::rectangle(media_box[0], media_box[1], media_box[2], media_box[3]),
            "Resources" => Object::Dictionary(resources),
            "Contents" => Object::Reference(content_id),
        };
        let page_id = self.add_object(Object::Dictionary(page));

        let mut pages_obj = self.get_object(pages_id)?;
        let pages_dict = pages_obj.as_dict_mut()?;
        let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
        kids.push(Object::Reference(page_id));
        let count = pages_dict.get(b"Count")?.as_i64()?;
        pages_dict.set("Count", Object::Integer(count + 1));
        self.set_object(pages_id, pages_obj);

        Ok(page_id)
    }

    /// A `/Font` resources subdictionary naming `font` as `/F1`, the common case for a page with
    /// a single base-14 font.
    pub fn font_resources(&self, font_id: ObjectId) -> Dictionary {
        dictionary! {
            "Font" => Object::Dictionary(dictionary! { "F1" => Object::Reference(font_id) }),
        }
    }
}


#[cfg(test)]
mod creator_tests {
    use super::*;

    #[test]
    fn add_page_extends_the_pages_tree() {
        let mut doc = tests::create_document();
        let pages = doc.get_pages().unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn added_page_content_round_trips_through_extract_text() {
        let doc = tests::create_document();
        let pages = doc.get_pages().unwrap();
        let with_text = pages.iter().find(|&&id| doc.extract_text(id).unwrap().contains("Hello")).unwrap();
        assert_eq!(doc.extract_text(*with_text).unwrap(), "Hello");
    }
}
