//! In-process page operations built on `lopdf`
//!
//! Pages are manipulated at the object level: extraction deletes every other
//! page, cropping rewrites the page boxes, and concatenation deep-copies page
//! objects into a fresh document. Page content streams are never re-encoded.

use super::PageOperations;
use crate::error::{Result, SliceError};
use crate::geometry::BoundingBox;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Boxes that would clip a cropped page differently from its crop box
const SECONDARY_BOXES: [&[u8]; 3] = [b"BleedBox", b"TrimBox", b"ArtBox"];

/// Guards `Parent` walks against malformed, cyclic page trees
const MAX_TREE_DEPTH: usize = 64;

/// Pure-Rust backend; needs no external programs
#[derive(Debug, Clone, Default)]
pub struct NativeOperations;

impl NativeOperations {
    pub fn new() -> Self {
        Self
    }

    /// Number of pages in `source`
    pub fn page_count(&self, source: &Path) -> Result<u32> {
        let doc = load(source)?;
        Ok(doc.get_pages().len() as u32)
    }

    /// Visible height of every page of `source`, in page order.
    ///
    /// Uses the crop box when the page has one, the media box otherwise.
    pub fn page_heights(&self, source: &Path) -> Result<Vec<f64>> {
        let doc = load(source)?;
        doc.get_pages()
            .into_iter()
            .map(|(number, page_id)| {
                visible_box(&doc, page_id)
                    .map(|bounds| bounds.height())
                    .ok_or_else(|| pdf_error(format!("page {} has no media box", number - 1)))
            })
            .collect()
    }
}

impl PageOperations for NativeOperations {
    fn extract_page(&self, source: &Path, page_index: u32, output: &Path) -> Result<()> {
        debug!("Extracting page {} of {}", page_index, source.display());

        let mut doc = load(source)?;
        let pages = doc.get_pages();
        let page_count = pages.len() as u32;

        // lopdf numbers pages from 1
        let page_number = page_index.checked_add(1);
        let page_id = page_number
            .and_then(|number| pages.get(&number))
            .copied()
            .ok_or(SliceError::PageOutOfRange {
                page: page_index,
                page_count,
            })?;

        flatten_inherited(&mut doc, page_id)?;

        let others: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|number| Some(*number) != page_number)
            .collect();
        doc.delete_pages(&others);
        doc.prune_objects();

        save(&mut doc, output)
    }

    fn crop(&self, source: &Path, region: &BoundingBox, output: &Path) -> Result<()> {
        debug!("Cropping {} to {}", source.display(), region);

        let mut doc = load(source)?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(pdf_error(format!("{} has no pages", source.display())));
        }

        for page_id in page_ids {
            flatten_inherited(&mut doc, page_id)?;

            if let Some(media) = page_box(&doc, page_id, b"MediaBox") {
                if !media.contains(region) {
                    warn!("Region {} extends beyond page bounds {}", region, media);
                }
            }

            let page = page_dict_mut(&mut doc, page_id)?;
            page.set("MediaBox", box_object(region));
            page.set("CropBox", box_object(region));
            for key in SECONDARY_BOXES {
                page.remove(key);
            }
        }

        save(&mut doc, output)
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(pdf_error("no documents to concatenate"));
        }
        debug!("Concatenating {} documents into {}", inputs.len(), output.display());

        let mut target = Document::with_version("1.7");
        let pages_id = target.new_object_id();
        let mut kids = Vec::new();

        for input in inputs {
            let mut source = load(input)?;
            let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

            // Detach pages from their tree so copying does not drag it along
            for &page_id in &page_ids {
                flatten_inherited(&mut source, page_id)?;
                page_dict_mut(&mut source, page_id)?.remove(b"Parent");
            }

            let mut copier = ObjectCopier::new(&source, &mut target);
            for page_id in page_ids {
                kids.push(copier.copy_object(page_id)?);
            }
        }

        for &kid in &kids {
            page_dict_mut(&mut target, kid)?.set("Parent", pages_id);
        }

        let count = kids.len() as i64;
        let kids: Vec<Object> = kids.into_iter().map(Object::Reference).collect();
        target.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        target.trailer.set("Root", catalog_id);

        save(&mut target, output)
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Copies objects between documents, remapping references.
///
/// Every source object is copied at most once; the id map doubles as the
/// visited set that breaks reference cycles.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId> {
        if let Some(&target_id) = self.id_map.get(&source_id) {
            return Ok(target_id);
        }

        // Reserve the id before recursing so cycles resolve to it
        let target_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, target_id);

        let object = self
            .source
            .get_object(source_id)
            .map_err(pdf_error)?
            .clone();
        let object = self.remap(object)?;
        self.target.objects.insert(target_id, object);

        Ok(target_id)
    }

    fn remap(&mut self, object: Object) -> Result<Object> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => items
                .into_iter()
                .map(|item| self.remap(item))
                .collect::<Result<Vec<_>>>()
                .map(Object::Array),
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.remap_dict(dict)?)),
            Object::Stream(mut stream) => {
                stream.dict = self.remap_dict(stream.dict)?;
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }

    fn remap_dict(&mut self, mut dict: Dictionary) -> Result<Dictionary> {
        for (_, value) in dict.iter_mut() {
            let original = std::mem::replace(value, Object::Null);
            *value = self.remap(original)?;
        }
        Ok(dict)
    }
}

fn load(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| pdf_error(format!("cannot load {}: {e}", path.display())))
}

fn save(doc: &mut Document, path: &Path) -> Result<()> {
    doc.save(path)
        .map_err(|e| pdf_error(format!("cannot write {}: {e}", path.display())))?;
    Ok(())
}

fn pdf_error(message: impl Display) -> SliceError {
    SliceError::tool("lopdf", message.to_string())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_error)
}

/// Look up a page attribute on the page or its nearest ancestor.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_object(page_id).and_then(Object::as_dict).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_object(parent).and_then(Object::as_dict).ok()?;
    }
    None
}

/// Copy inherited attributes onto the page itself, so it stays complete
/// once detached from its ancestors.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let values: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter_map(|key| inherited(doc, page_id, key).map(|value| (*key, value)))
        .collect();

    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in values {
        if !page.has(key) {
            page.set(key, value);
        }
    }
    Ok(())
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn page_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<BoundingBox> {
    let object = inherited(doc, page_id, key)?;
    let values = resolve(doc, &object)?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }

    let mut coords = [0.0f64; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = f64::from(resolve(doc, value)?.as_float().ok()?);
    }
    Some(BoundingBox::from_corners(
        (coords[0], coords[1]),
        (coords[2], coords[3]),
    ))
}

fn visible_box(doc: &Document, page_id: ObjectId) -> Option<BoundingBox> {
    page_box(doc, page_id, b"CropBox").or_else(|| page_box(doc, page_id, b"MediaBox"))
}

fn box_object(region: &BoundingBox) -> Object {
    Object::Array(
        region
            .to_array()
            .iter()
            .map(|&value| Object::Real(value as f32))
            .collect(),
    )
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod native_tests;
