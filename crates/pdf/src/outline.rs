//! Native PDF outlines (bookmarks): writing a ToC as `/Outlines` and reading
//! an existing one back.

use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tocgen_core::notation::{quantize_vpos, single_line};
use tocgen_core::outline::{OutlineItem, OutlineSink};
use tocgen_core::toc::{HeadingLevel, ToCEntry, TocTree};

use crate::parser::backend::{decode_text_simple, encode_text_string, LopdfBackend, PdfBackend};
use crate::PdfError;

/// Named destination trees deeper than this are not followed.
const MAX_NAME_TREE_DEPTH: usize = 32;

/// Title given to bookmarks that have none, so the outline prints as valid
/// notation.
const UNTITLED: &str = "Untitled";

/// Writes outline items into the document held by a [`LopdfBackend`],
/// replacing any outline it already has.
pub struct OutlineWriter<'a> {
    backend: &'a mut LopdfBackend,
}

impl<'a> OutlineWriter<'a> {
    pub fn new(backend: &'a mut LopdfBackend) -> Self {
        OutlineWriter { backend }
    }

    /// `[page /XYZ null top null]` when the item has a vertical position,
    /// `[page /Fit]` otherwise.
    fn destination(&self, pages: &BTreeMap<u32, ObjectId>, item: &OutlineItem) -> Result<Object, PdfError> {
        let page_id = u32::try_from(item.page)
            .ok()
            .and_then(|n| pages.get(&n))
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                page: item.page,
                count: pages.len(),
            })?;

        Ok(match item.vpos {
            Some(vpos) => {
                let [_, _, _, ury] = self.backend.media_box(page_id)?;
                Object::Array(vec![
                    Object::Reference(page_id),
                    Object::Name(b"XYZ".to_vec()),
                    Object::Null,
                    Object::Real((ury as f64 - vpos) as f32),
                    Object::Null,
                ])
            }
            None => Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())]),
        })
    }
}

impl OutlineSink for OutlineWriter<'_> {
    type Error = PdfError;

    fn write_outline(&mut self, items: &[OutlineItem]) -> Result<(), PdfError> {
        let pages = self.backend.raw_doc().get_pages();
        // Resolve every destination before touching the document.
        let dests = items
            .iter()
            .map(|item| self.destination(&pages, item))
            .collect::<Result<Vec<_>, _>>()?;

        let doc = self.backend.raw_doc_mut();
        let catalog_id = catalog_id(doc)?;

        if items.is_empty() {
            let catalog = catalog_mut(doc, catalog_id)?;
            catalog.remove(b"Outlines");
            catalog.remove(b"PageMode");
            doc.prune_objects();
            return Ok(());
        }

        let layout = OutlineLayout::new(items);
        let root_id = doc.new_object_id();
        let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

        for (i, (item, dest)) in items.iter().zip(dests).enumerate() {
            let siblings = layout.siblings(i);
            let pos = siblings.iter().position(|&s| s == i).unwrap_or(0);

            let mut dict = Dictionary::new();
            dict.set("Title", title_object(&item.title));
            dict.set(
                "Parent",
                Object::Reference(layout.parent[i].map_or(root_id, |p| ids[p])),
            );
            if pos > 0 {
                dict.set("Prev", Object::Reference(ids[siblings[pos - 1]]));
            }
            if let Some(&next) = siblings.get(pos + 1) {
                dict.set("Next", Object::Reference(ids[next]));
            }
            if let (Some(&first), Some(&last)) = (layout.children[i].first(), layout.children[i].last()) {
                dict.set("First", Object::Reference(ids[first]));
                dict.set("Last", Object::Reference(ids[last]));
                // Positive: the item starts expanded.
                dict.set("Count", Object::Integer(layout.descendants[i] as i64));
            }
            dict.set("Dest", dest);
            doc.objects.insert(ids[i], Object::Dictionary(dict));
        }

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Outlines".to_vec()));
        if let (Some(&first), Some(&last)) = (layout.roots.first(), layout.roots.last()) {
            root.set("First", Object::Reference(ids[first]));
            root.set("Last", Object::Reference(ids[last]));
        }
        root.set("Count", Object::Integer(items.len() as i64));
        doc.objects.insert(root_id, Object::Dictionary(root));

        let catalog = catalog_mut(doc, catalog_id)?;
        catalog.set("Outlines", Object::Reference(root_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

        let pruned = doc.prune_objects();
        log::debug!(
            "wrote {} outline items, pruned {} unreferenced objects",
            items.len(),
            pruned.len()
        );
        Ok(())
    }
}

/// Parent/children links of a pre-order item list, rebuilt from depths.
struct OutlineLayout {
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    descendants: Vec<usize>,
}

impl OutlineLayout {
    fn new(items: &[OutlineItem]) -> Self {
        let n = items.len();
        let mut parent = vec![None; n];
        let mut children = vec![Vec::new(); n];
        let mut roots = Vec::new();
        let mut spine: Vec<usize> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            spine.truncate(item.depth);
            match spine.last() {
                Some(&p) => {
                    parent[i] = Some(p);
                    children[p].push(i);
                }
                None => roots.push(i),
            }
            spine.push(i);
        }

        // Children always follow their parent in pre-order.
        let mut descendants = vec![0; n];
        for i in (0..n).rev() {
            descendants[i] = children[i].iter().map(|&c| 1 + descendants[c]).sum();
        }

        OutlineLayout {
            parent,
            children,
            roots,
            descendants,
        }
    }

    fn siblings(&self, i: usize) -> &[usize] {
        match self.parent[i] {
            Some(p) => &self.children[p],
            None => &self.roots,
        }
    }
}

fn title_object(title: &str) -> Object {
    let format = if title.is_ascii() {
        StringFormat::Literal
    } else {
        StringFormat::Hexadecimal
    };
    Object::String(encode_text_string(title), format)
}

fn catalog_id(doc: &Document) -> Result<ObjectId, PdfError> {
    doc.trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|e| PdfError::Parse(format!("document has no catalog: {}", e)))
}

fn catalog_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, PdfError> {
    doc.get_object_mut(id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| PdfError::Parse(format!("catalog is not a dictionary: {}", e)))
}

/// Follow references until a direct object is reached.
fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    let mut seen = HashSet::new();
    while let Object::Reference(id) = obj {
        if !seen.insert(*id) {
            return None;
        }
        obj = doc.get_object(*id).ok()?;
    }
    Some(obj)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Read the document's outline into a [`TocTree`]; an item at depth `d`
/// gets level `d + 1`. A document without an outline yields an empty tree.
///
/// Items whose destination cannot be resolved point at page 1.
pub fn read_outline(backend: &LopdfBackend) -> Result<TocTree, PdfError> {
    let doc = backend.raw_doc();
    let catalog_id = catalog_id(doc)?;
    let catalog = doc
        .get_object(catalog_id)
        .and_then(|obj| obj.as_dict())
        .map_err(|e| PdfError::Parse(format!("catalog is not a dictionary: {}", e)))?;

    let Some(first) = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
        .and_then(|outlines| outlines.get(b"First").ok())
    else {
        return Ok(TocTree::default());
    };

    let page_numbers: HashMap<ObjectId, usize> = doc
        .get_pages()
        .into_iter()
        .map(|(number, id)| (id, number as usize))
        .collect();
    let reader = OutlineReader {
        backend,
        catalog,
        page_numbers,
    };

    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    let mut stack: Vec<(&Object, usize)> = vec![(first, 0)];

    while let Some((obj, depth)) = stack.pop() {
        if let Object::Reference(id) = obj {
            if !visited.insert(*id) {
                log::warn!("outline item {:?} is linked twice, skipping", id);
                continue;
            }
        }
        let Some(item) = resolve_dict(doc, obj) else {
            log::warn!("outline item is not a dictionary, skipping");
            continue;
        };

        entries.push(reader.entry(item, depth));

        // Children come before the next sibling in pre-order.
        if let Ok(next) = item.get(b"Next") {
            stack.push((next, depth));
        }
        if let Ok(child) = item.get(b"First") {
            stack.push((child, depth + 1));
        }
    }

    Ok(entries.into_iter().collect())
}

struct OutlineReader<'a> {
    backend: &'a LopdfBackend,
    catalog: &'a Dictionary,
    page_numbers: HashMap<ObjectId, usize>,
}

impl<'a> OutlineReader<'a> {
    fn doc(&self) -> &'a Document {
        self.backend.raw_doc()
    }

    fn entry(&self, item: &'a Dictionary, depth: usize) -> ToCEntry {
        let title = item
            .get(b"Title")
            .ok()
            .and_then(|o| resolve(self.doc(), o))
            .and_then(|o| o.as_str().ok())
            .map(decode_text_simple)
            .map(|title| single_line(&title))
            .unwrap_or_default();
        let title = if title.is_empty() {
            log::warn!("outline item at depth {} has no title, using {:?}", depth + 1, UNTITLED);
            UNTITLED.to_string()
        } else {
            title
        };

        let level = u32::try_from(depth + 1)
            .ok()
            .and_then(|l| HeadingLevel::try_from(l).ok())
            .unwrap_or(HeadingLevel::TOP);

        match self.target(item) {
            Some((page, vpos)) => ToCEntry::new(title, level, page).with_vpos(vpos),
            None => {
                log::warn!("cannot resolve the destination of {:?}, using page 1", title);
                ToCEntry::new(title, level, 1)
            }
        }
    }

    /// Page number and vertical position an item points at, from `/Dest`
    /// or a `/GoTo` action.
    fn target(&self, item: &'a Dictionary) -> Option<(usize, Option<f64>)> {
        let dest = match item.get(b"Dest") {
            Ok(dest) => dest,
            Err(_) => {
                let action = resolve_dict(self.doc(), item.get(b"A").ok()?)?;
                if action.get(b"S").ok()?.as_name().ok()? != b"GoTo" {
                    return None;
                }
                action.get(b"D").ok()?
            }
        };
        let array = self.explicit_destination(dest, 0)?;
        self.page_and_vpos(array)
    }

    /// Resolve named destinations down to an explicit destination array.
    fn explicit_destination(&self, dest: &'a Object, hops: usize) -> Option<&'a [Object]> {
        if hops > 2 {
            return None;
        }
        match resolve(self.doc(), dest)? {
            Object::Array(array) => Some(array.as_slice()),
            Object::Dictionary(dict) => self.explicit_destination(dict.get(b"D").ok()?, hops + 1),
            Object::Name(name) | Object::String(name, _) => {
                let target = self.named_destination(name)?;
                self.explicit_destination(target, hops + 1)
            }
            _ => None,
        }
    }

    /// Look a name up in the catalog's `/Dests` dictionary, then in the
    /// `/Names` `/Dests` name tree.
    fn named_destination(&self, name: &[u8]) -> Option<&'a Object> {
        let doc = self.doc();
        if let Some(found) = self
            .catalog
            .get(b"Dests")
            .ok()
            .and_then(|d| resolve_dict(doc, d))
            .and_then(|dests| dests.get(name).ok())
        {
            return Some(found);
        }

        let names = resolve_dict(doc, self.catalog.get(b"Names").ok()?)?;
        let tree = resolve_dict(doc, names.get(b"Dests").ok()?)?;
        self.search_name_tree(tree, name, 0)
    }

    fn search_name_tree(&self, node: &'a Dictionary, name: &[u8], depth: usize) -> Option<&'a Object> {
        if depth > MAX_NAME_TREE_DEPTH {
            return None;
        }
        let doc = self.doc();

        if let Some(pairs) = node
            .get(b"Names")
            .ok()
            .and_then(|n| resolve(doc, n))
            .and_then(|n| n.as_array().ok())
        {
            for pair in pairs.chunks_exact(2) {
                if resolve(doc, &pair[0]).and_then(|k| k.as_str().ok()) == Some(name) {
                    return Some(&pair[1]);
                }
            }
        }

        let kids = resolve(doc, node.get(b"Kids").ok()?)?.as_array().ok()?;
        kids.iter()
            .filter_map(|kid| resolve_dict(doc, kid))
            .find_map(|kid| self.search_name_tree(kid, name, depth + 1))
    }

    fn page_and_vpos(&self, array: &[Object]) -> Option<(usize, Option<f64>)> {
        let (page, page_id) = match array.first()? {
            Object::Reference(id) => (*self.page_numbers.get(id)?, Some(*id)),
            Object::Integer(index) => (usize::try_from(*index).ok()? + 1, None),
            _ => return None,
        };

        let kind = array.get(1).and_then(|k| k.as_name().ok());
        let top = match kind {
            Some(b"XYZ") => array.get(3).and_then(number),
            Some(b"FitH") | Some(b"FitBH") => array.get(2).and_then(number),
            _ => None,
        };
        let vpos = match (top, page_id) {
            (Some(top), Some(id)) => {
                let [_, _, _, ury] = self.backend.media_box(id).ok()?;
                Some(quantize_vpos(ury as f64 - top))
            }
            _ => None,
        };
        Some((page, vpos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::pdf_bytes;
    use tocgen_core::outline::write_outline;

    fn backend(pages: usize) -> LopdfBackend {
        let pages: Vec<Vec<_>> = (0..pages).map(|_| vec![]).collect();
        LopdfBackend::load_bytes(&pdf_bytes(&pages)).unwrap()
    }

    fn reload(backend: &mut LopdfBackend) -> LopdfBackend {
        let mut buf = Vec::new();
        backend.raw_doc_mut().save_to(&mut buf).unwrap();
        LopdfBackend::load_bytes(&buf).unwrap()
    }

    fn entry(title: &str, level: u32, page: usize, vpos: Option<f64>) -> ToCEntry {
        ToCEntry::new(title, HeadingLevel::try_from(level).unwrap(), page).with_vpos(vpos)
    }

    fn item(title: &str, page: usize, depth: usize) -> OutlineItem {
        OutlineItem {
            title: title.to_string(),
            page,
            vpos: None,
            depth,
        }
    }

    #[test]
    fn test_layout_links() {
        let items = vec![
            item("A", 1, 0),
            item("A.1", 1, 1),
            item("A.1.a", 1, 2),
            item("A.2", 2, 1),
            item("B", 3, 0),
        ];
        let layout = OutlineLayout::new(&items);
        assert_eq!(layout.roots, vec![0, 4]);
        assert_eq!(layout.children[0], vec![1, 3]);
        assert_eq!(layout.parent[2], Some(1));
        assert_eq!(layout.descendants, vec![3, 1, 0, 0, 0]);
        assert_eq!(layout.siblings(3), &[1, 3]);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let tree: TocTree = vec![
            entry("Introduction", 1, 1, Some(122.0)),
            entry("Motivation", 2, 1, None),
            entry("Übersicht (draft)", 2, 2, Some(300.5)),
            entry("Methods", 1, 3, None),
        ]
        .into_iter()
        .collect();

        let mut doc = backend(3);
        write_outline(&tree, &mut OutlineWriter::new(&mut doc)).unwrap();
        let reloaded = reload(&mut doc);

        let catalog_id = catalog_id(reloaded.raw_doc()).unwrap();
        let catalog = reloaded.raw_doc().get_object(catalog_id).unwrap().as_dict().unwrap();
        assert_eq!(catalog.get(b"PageMode").unwrap().as_name().unwrap(), b"UseOutlines");

        assert_eq!(read_outline(&reloaded).unwrap(), tree);
    }

    #[test]
    fn test_levels_come_from_depth() {
        // A level-3 heading directly under a level-1 one reads back at level 2.
        let tree: TocTree = vec![entry("A", 1, 1, None), entry("B", 3, 2, None)]
            .into_iter()
            .collect();

        let mut doc = backend(2);
        write_outline(&tree, &mut OutlineWriter::new(&mut doc)).unwrap();
        let read = read_outline(&doc).unwrap();
        assert_eq!(read.roots[0].children[0].level.get(), 2);
        assert_eq!(read.roots[0].children[0].page, 2);
    }

    #[test]
    fn test_writing_replaces_existing_outline() {
        let mut doc = backend(2);
        let first: TocTree = vec![entry("Old", 1, 1, None)].into_iter().collect();
        write_outline(&first, &mut OutlineWriter::new(&mut doc)).unwrap();

        let second: TocTree = vec![entry("New", 1, 2, None)].into_iter().collect();
        write_outline(&second, &mut OutlineWriter::new(&mut doc)).unwrap();
        assert_eq!(read_outline(&doc).unwrap(), second);

        write_outline(&TocTree::default(), &mut OutlineWriter::new(&mut doc)).unwrap();
        assert!(read_outline(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_page_out_of_range_leaves_document_untouched() {
        let mut doc = backend(1);
        let tree: TocTree = vec![entry("A", 1, 1, None), entry("B", 1, 5, None)]
            .into_iter()
            .collect();

        let err = write_outline(&tree, &mut OutlineWriter::new(&mut doc)).unwrap_err();
        assert!(matches!(err, PdfError::PageOutOfRange { page: 5, count: 1 }));
        assert!(read_outline(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_document_without_outline() {
        assert!(read_outline(&backend(1)).unwrap().is_empty());
    }

    #[test]
    fn test_reads_goto_actions_and_named_destinations() {
        let mut backend = backend(2);
        let doc = backend.raw_doc_mut();
        let page2 = doc.get_pages()[&2];

        let named_id = doc.new_object_id();
        let action_id = doc.new_object_id();
        let broken_id = doc.new_object_id();
        let root_id = doc.new_object_id();

        let mut named = Dictionary::new();
        named.set("Title", Object::string_literal("Named"));
        named.set("Parent", Object::Reference(root_id));
        named.set("Next", Object::Reference(action_id));
        named.set("Dest", Object::Name(b"chap2".to_vec()));

        let mut goto = Dictionary::new();
        goto.set("S", Object::Name(b"GoTo".to_vec()));
        goto.set(
            "D",
            Object::Array(vec![
                Object::Reference(page2),
                Object::Name(b"FitH".to_vec()),
                Object::Integer(800),
            ]),
        );
        let mut action = Dictionary::new();
        action.set("Title", Object::string_literal("Action"));
        action.set("Parent", Object::Reference(root_id));
        action.set("Next", Object::Reference(broken_id));
        action.set("A", Object::Dictionary(goto));

        let mut broken = Dictionary::new();
        broken.set("Title", Object::string_literal("  "));
        broken.set("Parent", Object::Reference(root_id));
        broken.set("Dest", Object::Name(b"missing".to_vec()));

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Outlines".to_vec()));
        root.set("First", Object::Reference(named_id));
        root.set("Last", Object::Reference(broken_id));

        let mut dests = Dictionary::new();
        dests.set(
            "chap2",
            Object::Array(vec![Object::Reference(page2), Object::Name(b"Fit".to_vec())]),
        );

        doc.objects.insert(named_id, Object::Dictionary(named));
        doc.objects.insert(action_id, Object::Dictionary(action));
        doc.objects.insert(broken_id, Object::Dictionary(broken));
        doc.objects.insert(root_id, Object::Dictionary(root));
        let catalog_id = catalog_id(doc).unwrap();
        let catalog = catalog_mut(doc, catalog_id).unwrap();
        catalog.set("Outlines", Object::Reference(root_id));
        catalog.set("Dests", Object::Dictionary(dests));

        let tree = read_outline(&backend).unwrap();
        let read: Vec<_> = tree
            .iter()
            .map(|(_, e)| (e.title.as_str(), e.page, e.vpos))
            .collect();
        assert_eq!(
            read,
            vec![
                ("Named", 2, None),
                ("Action", 2, Some(42.0)),
                ("Untitled", 1, None),
            ]
        );
        assert!(tocgen_core::notation::parse(&tocgen_core::notation::dump(&tree, true)).is_ok());
    }

    #[test]
    fn test_untitled_and_multi_line_items() {
        let mut backend = backend(1);
        let doc = backend.raw_doc_mut();
        let page1 = doc.get_pages()[&1];

        let first_id = doc.new_object_id();
        let second_id = doc.new_object_id();
        let root_id = doc.new_object_id();
        let fit = || Object::Array(vec![Object::Reference(page1), Object::Name(b"Fit".to_vec())]);

        let mut first = Dictionary::new();
        first.set("Parent", Object::Reference(root_id));
        first.set("Next", Object::Reference(second_id));
        first.set("Dest", fit());

        let mut second = Dictionary::new();
        second.set("Title", Object::string_literal("Part\nTwo"));
        second.set("Parent", Object::Reference(root_id));
        second.set("Dest", fit());

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Outlines".to_vec()));
        root.set("First", Object::Reference(first_id));
        root.set("Last", Object::Reference(second_id));

        doc.objects.insert(first_id, Object::Dictionary(first));
        doc.objects.insert(second_id, Object::Dictionary(second));
        doc.objects.insert(root_id, Object::Dictionary(root));
        let catalog_id = catalog_id(doc).unwrap();
        catalog_mut(doc, catalog_id)
            .unwrap()
            .set("Outlines", Object::Reference(root_id));

        let tree = read_outline(&backend).unwrap();
        let text = tocgen_core::notation::dump(&tree, false);
        assert_eq!(text, "Untitled | 1\nPart Two | 1\n");
        assert_eq!(tocgen_core::notation::parse(&text).unwrap(), tree);
    }
}
