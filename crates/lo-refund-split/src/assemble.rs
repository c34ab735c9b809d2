use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::SplitError;
use crate::options::PagePolicy;

/// Page attributes a page may inherit from its page tree node.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

fn root_pages_id(document: &Document) -> Result<ObjectId, SplitError> {
    let catalog_id = document.trailer.get(b"Root")?.as_reference()?;
    Ok(document
        .get_dictionary(catalog_id)?
        .get(b"Pages")?
        .as_reference()?)
}

fn dictionary_type(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|kind| kind.as_name().ok())
}

/// Attributes the page picks up from its ancestors but does not set itself.
fn inherited_attributes(document: &Document, page_id: ObjectId) -> Dictionary {
    let mut inherited = Dictionary::new();
    let Ok(page) = document.get_dictionary(page_id) else {
        return inherited;
    };

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = parent {
        let Ok(node) = document.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE_KEYS {
            if !page.has(key) && !inherited.has(key) {
                if let Ok(value) = node.get(key) {
                    inherited.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    inherited
}

/// Drops every source page the policy does not keep. Pages go highest first
/// so earlier page numbers stay valid.
fn keep_selected_pages(document: &mut Document, policy: PagePolicy) {
    let page_count = document.get_pages().len();
    let keep = policy.select_pages(page_count);
    let total = u32::try_from(page_count).unwrap_or(u32::MAX);
    for page_number in (1..=total).rev().filter(|page| !keep.contains(page)) {
        document.delete_pages(&[page_number]);
    }
}

/// Moves the single page of `summary` into `output` as its first page.
fn prepend_page(output: &mut Document, mut summary: Document) -> Result<(), SplitError> {
    summary.renumber_objects_with(output.max_id + 1);

    let summary_page_id = *summary
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| SplitError::Assemble("summary document has no page".to_string()))?;
    let inherited = inherited_attributes(&summary, summary_page_id);
    let pages_id = root_pages_id(output)?;

    output.max_id = output.max_id.max(summary.max_id);
    for (object_id, object) in summary.objects {
        if matches!(
            dictionary_type(&object),
            Some(b"Catalog" | b"Pages" | b"Outlines" | b"Outline")
        ) {
            continue;
        }
        output.objects.insert(object_id, object);
    }

    let page = output.get_dictionary_mut(summary_page_id)?;
    page.set("Parent", pages_id);
    for (key, value) in inherited.iter() {
        if !page.has(key) {
            page.set(key.clone(), value.clone());
        }
    }

    let pages = output.get_dictionary_mut(pages_id)?;
    let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages
        .get_mut(b"Kids")?
        .as_array_mut()?
        .insert(0, Object::Reference(summary_page_id));
    pages.set("Count", count + 1);
    Ok(())
}

/// Builds one output document: the summary page followed by the source pages
/// the policy selects.
pub fn assemble(
    summary_pdf: &[u8],
    source: &Document,
    policy: PagePolicy,
) -> Result<Vec<u8>, SplitError> {
    policy.check_page_count(source.get_pages().len())?;

    let summary = Document::load_mem(summary_pdf)?;
    let mut output = source.clone();
    keep_selected_pages(&mut output, policy);
    prepend_page(&mut output, summary)?;

    output.prune_objects();
    output.compress();

    let mut buffer = Vec::new();
    output.save_to(&mut buffer)?;
    Ok(buffer)
}
