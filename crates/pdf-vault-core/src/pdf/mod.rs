mod document;
mod font;
mod page;
pub mod watermark;

pub use document::{DocumentMetadata, PdfDocument, page_count};
pub use font::StandardFont;
pub use watermark::{
    PageLayout, Rgb, TextStamp, Transparency, WatermarkSpec, apply_watermark, apply_watermark_at,
    apply_watermark_with,
};

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::content::{Content, Operation};
    use lopdf::{
        Dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    };

    /// Build a PDF with one page per `(width, height)`, each showing "Page N".
    #[allow(clippy::unwrap_used)]
    pub fn sample_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::with_capacity(sizes.len());
        for (index, &(width, height)) in sizes.iter().enumerate() {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 72.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", index + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(page_tree_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![0.into(), 0.into(), width.into(), height.into()]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            page_tree_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(count)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    /// Like [`sample_pdf`], but RC4-encrypted with an owner password and an
    /// empty user password, so it opens without prompting.
    #[allow(clippy::unwrap_used)]
    pub fn owner_protected_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
        let mut doc = Document::load_mem(&sample_pdf(sizes)).unwrap();
        let file_id = Object::string_literal(b"0123456789abcdef".to_vec());
        doc.trailer
            .set("ID", Object::Array(vec![file_id.clone(), file_id]));

        let state = EncryptionState::try_from(EncryptionVersion::V2 {
            document: &doc,
            owner_password: "owner",
            user_password: "",
            key_length: 128,
            permissions: Permissions::PRINTABLE,
        })
        .unwrap();
        doc.encrypt(&state).unwrap();

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    /// Decode the last content stream of a page (1-based page number).
    #[allow(clippy::unwrap_used)]
    pub fn overlay_operations(pdf: &[u8], page_number: u32) -> Vec<Operation> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().get(&page_number).unwrap();
        let contents = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap();
        let last = contents.as_array().unwrap().last().unwrap().as_reference().unwrap();
        let stream = doc.get_object(last).unwrap().as_stream().unwrap();
        let bytes = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        Content::decode(&bytes).unwrap().operations
    }
}
