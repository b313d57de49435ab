//! Annotation files
//!
//! An annotation file is a JSON object mapping page indices (zero-based,
//! written as string keys) to lists of `[x0, y0, x1, y1]` boxes in page space:
//!
//! ```json
//! { "0": [[72, 400, 540, 720]], "2": [[72, 72, 300, 300], [310, 72, 540, 300]] }
//! ```
//!
//! JSON object keys have no numeric order, so pages are always re-keyed by
//! their parsed index. Box order within a page is preserved. Every key must
//! name a distinct page: a repeated key, spelled the same or not (`"1"` and
//! `"01"`), is rejected rather than silently merged or overwritten.

use crate::error::{Result, SliceError};
use crate::geometry::BoundingBox;
use serde::de::{self, Deserialize, Deserializer};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Bounding boxes grouped by page, iterated in ascending page order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    pages: BTreeMap<u32, Vec<BoundingBox>>,
}

impl AnnotationSet {
    /// Create an empty annotation set
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an annotation file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SliceError::annotations(Some(path.to_path_buf()), format!("cannot open: {e}"))
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            SliceError::InvalidAnnotations { path: None, message } => {
                SliceError::annotations(Some(path.to_path_buf()), message)
            }
            other => other,
        })
    }

    /// Parse annotations from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawAnnotations =
            serde_json::from_reader(reader).map_err(|e| SliceError::annotations(None, e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse annotations from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawAnnotations =
            serde_json::from_str(json).map_err(|e| SliceError::annotations(None, e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawAnnotations) -> Result<Self> {
        let mut pages = BTreeMap::new();

        for (key, boxes) in raw.0 {
            let page = parse_page_key(&key)?;
            let boxes = boxes
                .into_iter()
                .map(|[x0, y0, x1, y1]| BoundingBox::from_corners((x0, y0), (x1, y1)))
                .collect();

            match pages.entry(page) {
                Entry::Vacant(slot) => {
                    slot.insert(boxes);
                }
                Entry::Occupied(_) => {
                    return Err(SliceError::annotations(
                        None,
                        format!("page {page} is listed more than once (key '{key}')"),
                    ));
                }
            }
        }

        Ok(Self { pages })
    }

    /// Append a box to a page
    pub fn push(&mut self, page: u32, region: BoundingBox) {
        self.pages.entry(page).or_default().push(region);
    }

    /// Boxes on one page, in annotation order
    pub fn boxes(&self, page: u32) -> &[BoundingBox] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate pages in ascending numeric order
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[BoundingBox])> + '_ {
        self.pages.iter().map(|(page, boxes)| (*page, boxes.as_slice()))
    }

    /// Number of page entries, including pages with no boxes
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of boxes across all pages
    pub fn box_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// True when no page carries a box
    pub fn is_empty(&self) -> bool {
        self.box_count() == 0
    }

    /// Convert every box from screen space (top-left origin, y down) to page
    /// space. `page_heights[i]` is the height of page `i`.
    pub fn flip_vertical(&self, page_heights: &[f64]) -> Result<Self> {
        let mut pages = BTreeMap::new();
        for (&page, boxes) in &self.pages {
            let height = page_heights
                .get(page as usize)
                .copied()
                .ok_or(SliceError::PageOutOfRange {
                    page,
                    page_count: page_heights.len() as u32,
                })?;
            pages.insert(page, boxes.iter().map(|b| b.flip_vertical(height)).collect());
        }
        Ok(Self { pages })
    }

    /// Write the annotation file format
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.to_raw())
            .map_err(|e| SliceError::Io(std::io::Error::other(e)))
    }

    /// Render the annotation file format as a string
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_raw()).map_err(|e| SliceError::Io(std::io::Error::other(e)))
    }

    /// Save to an annotation file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn to_raw(&self) -> BTreeMap<String, Vec<[f64; 4]>> {
        self.pages
            .iter()
            .map(|(page, boxes)| (page.to_string(), boxes.iter().map(|b| b.to_array()).collect()))
            .collect()
    }
}

/// Annotation file entries in file order, repeated keys included
struct RawAnnotations(Vec<(String, Vec<[f64; 4]>)>);

impl<'de> Deserialize<'de> for RawAnnotations {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;
        impl<'de> de::Visitor<'de> for EntriesVisitor {
            type Value = RawAnnotations;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping page indices to lists of boxes")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawAnnotations, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<[f64; 4]>>()? {
                    entries.push(entry);
                }
                Ok(RawAnnotations(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn parse_page_key(key: &str) -> Result<u32> {
    key.trim().parse::<u32>().map_err(|_| {
        SliceError::annotations(
            None,
            format!("page key '{key}' is not a non-negative integer"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pages_iterate_numerically() {
        // Lexical order would put "10" before "2"
        let set = AnnotationSet::from_json_str(
            r#"{"10": [[0,0,1,1]], "2": [[0,0,2,2]], "0": [[0,0,3,3]]}"#,
        )
        .unwrap();

        let pages: Vec<u32> = set.pages().map(|(page, _)| page).collect();
        assert_eq!(pages, vec![0, 2, 10]);
    }

    #[test]
    fn test_box_order_preserved() {
        let set = AnnotationSet::from_json_str(
            r#"{"0": [[0,0,10,10], [5,5,6,6], [1,1,2,2]]}"#,
        )
        .unwrap();

        assert_eq!(
            set.boxes(0),
            &[
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(5.0, 5.0, 6.0, 6.0),
                BoundingBox::new(1.0, 1.0, 2.0, 2.0),
            ]
        );
        assert_eq!(set.box_count(), 3);
        assert_eq!(set.page_count(), 1);
    }

    #[test]
    fn test_swapped_corners_are_normalized() {
        let set = AnnotationSet::from_json_str(r#"{"0": [[100, 200, 10, 20]]}"#).unwrap();
        assert_eq!(set.boxes(0), &[BoundingBox::new(10.0, 20.0, 100.0, 200.0)]);
    }

    #[test]
    fn test_empty_pages_are_kept_but_count_as_empty() {
        let set = AnnotationSet::from_json_str(r#"{"0": [], "1": []}"#).unwrap();
        assert_eq!(set.page_count(), 2);
        assert!(set.is_empty());
        assert!(set.boxes(5).is_empty());
    }

    #[test]
    fn test_rejects_bad_keys() {
        for json in [r#"{"-1": []}"#, r#"{"one": []}"#, r#"{"1.5": []}"#] {
            let err = AnnotationSet::from_json_str(json).unwrap_err();
            assert!(
                matches!(err, SliceError::InvalidAnnotations { .. }),
                "{json}: {err:?}"
            );
        }
    }

    #[test]
    fn test_rejects_duplicate_page_keys() {
        let err = AnnotationSet::from_json_str(r#"{"1": [], "01": []}"#).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_repeated_identical_keys() {
        // A plain map would keep only the second list and drop the first box
        let json = r#"{"0": [[0, 0, 1, 1]], "0": [[0, 0, 2, 2]]}"#;

        let err = AnnotationSet::from_json_str(json).unwrap_err();
        assert!(matches!(err, SliceError::InvalidAnnotations { .. }));
        assert!(err.to_string().contains("page 0 is listed more than once"), "{err}");

        assert!(AnnotationSet::from_reader(Cursor::new(json)).is_err());
    }

    #[test]
    fn test_rejects_malformed_boxes() {
        for json in [
            r#"{"0": [[1, 2, 3]]}"#,
            r#"{"0": [[1, 2, 3, 4, 5]]}"#,
            r#"{"0": [["a", 2, 3, 4]]}"#,
            r#"{"0": [1, 2, 3, 4]}"#,
            r#"[[1, 2, 3, 4]]"#,
            "not json",
        ] {
            assert!(AnnotationSet::from_json_str(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_from_reader() {
        let set = AnnotationSet::from_reader(Cursor::new(r#"{"3": [[0, 0, 5, 5]]}"#)).unwrap();
        assert_eq!(set.boxes(3).len(), 1);
    }

    #[test]
    fn test_push_and_writer() {
        let mut set = AnnotationSet::new();
        set.push(2, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        set.push(0, BoundingBox::new(1.0, 2.0, 3.0, 4.5));

        let json = set.to_json_string().unwrap();
        assert_eq!(json, r#"{"0":[[1.0,2.0,3.0,4.5]],"2":[[0.0,0.0,1.0,1.0]]}"#);

        let mut buffer = Vec::new();
        set.to_writer(&mut buffer).unwrap();
        let reparsed = AnnotationSet::from_reader(Cursor::new(buffer)).unwrap();
        assert_eq!(reparsed, set);
    }

    #[test]
    fn test_flip_vertical() {
        let mut screen = AnnotationSet::new();
        screen.push(0, BoundingBox::new(10.0, 0.0, 50.0, 100.0));
        screen.push(1, BoundingBox::new(10.0, 20.0, 50.0, 30.0));

        let page = screen.flip_vertical(&[800.0, 500.0]).unwrap();

        assert_eq!(page.boxes(0), &[BoundingBox::new(10.0, 700.0, 50.0, 800.0)]);
        assert_eq!(page.boxes(1), &[BoundingBox::new(10.0, 470.0, 50.0, 480.0)]);

        let err = screen.flip_vertical(&[800.0]).unwrap_err();
        assert!(matches!(
            err,
            SliceError::PageOutOfRange {
                page: 1,
                page_count: 1
            }
        ));
    }
}
