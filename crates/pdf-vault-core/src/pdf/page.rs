//! Page-level helpers on top of lopdf: geometry lookup, resource
//! registration and content-stream appending.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// US Letter, used when neither the page nor its ancestors define a media box.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Depth limit when walking `/Parent` links (guards against cyclic page trees).
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Media box of a page as `[llx, lly, urx, ury]`.
///
/// `MediaBox` is inheritable, so the page tree is walked upwards when the
/// page itself does not carry one.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| rect_from_object(doc, obj))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

fn rect_from_object(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        _ => return None,
    };
    if arr.len() != 4 {
        return None;
    }

    let values: Vec<f32> = arr.iter().filter_map(number).collect();
    if values.len() != 4 {
        return None;
    }

    // Normalize so that the lower-left corner comes first
    Some([
        values[0].min(values[2]),
        values[1].min(values[3]),
        values[0].max(values[2]),
        values[1].max(values[3]),
    ])
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Find an attribute on the page dictionary or the nearest ancestor that has it.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }

    None
}

/// Resolve a dictionary that may be stored inline or behind a reference.
fn resolve_dictionary(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Pick a resource name not yet used in `category`, starting with `base`.
fn unique_name(category: &Dictionary, base: &str) -> String {
    if !category.has(base.as_bytes()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !category.has(candidate.as_bytes()) {
            return candidate;
        }
        n += 1;
    }
}

/// Register resource objects on a page and return the names they received.
///
/// The page's effective resources (its own, or inherited from the page tree)
/// are copied into a direct `/Resources` dictionary on the page before new
/// entries are added, so sibling pages sharing a resources object are not
/// affected. Existing names are never overwritten.
pub fn register_resources(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    entries: &[(&str, ObjectId)],
) -> Result<Vec<String>> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dictionary(doc, obj))
        .unwrap_or_default();

    let mut sub = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|obj| resolve_dictionary(doc, obj))
        .unwrap_or_default();

    let mut names = Vec::with_capacity(entries.len());
    for (base, object_id) in entries {
        let name = unique_name(&sub, base);
        sub.set(name.as_bytes().to_vec(), Object::Reference(*object_id));
        names.push(name);
    }

    resources.set(category.as_bytes().to_vec(), Object::Dictionary(sub));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::RenderFailure(format!("Failed to get page {page_id:?}: {e}")))?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(names)
}

/// Current `/Contents` of a page flattened to a list of stream references.
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::RenderFailure(format!("Failed to get page {page_id:?}: {e}")))?;

    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            // A reference to an array of streams rather than to a stream
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    })
}

/// Append a content stream to a page, layering it above the existing content.
///
/// The existing content is enclosed in `q`/`Q` so that graphics state left
/// over by the original streams cannot leak into the appended operations.
/// `content` must therefore start with the closing `Q`.
pub fn append_isolated_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let mut contents = content_refs(doc, page_id)?;

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    contents.insert(0, Object::Reference(save_id));

    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
    contents.push(Object::Reference(content_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::RenderFailure(format!("Failed to get page {page_id:?}: {e}")))?;
    page.set("Contents", Object::Array(contents));

    Ok(())
}
