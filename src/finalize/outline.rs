//! Bookmark tree to PDF outline

use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};
use serde::Deserialize;
use serde_json::Value;

use crate::types::lenient_number;

/// One node of the upstream outline tree
///
/// ```json
/// {"id": "281474976645121", "label": "Cover", "pnum": "1", "level": "1",
///  "isLeaf": true, "children": null}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookmarkNode {
    #[serde(default)]
    pub label: Option<String>,
    /// 1-based target page
    #[serde(deserialize_with = "lenient_number")]
    pub pnum: u32,
    #[serde(default)]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    pub fn parse_tree(value: &Value) -> serde_json::Result<Vec<BookmarkNode>> {
        Vec::<BookmarkNode>::deserialize(value)
    }
}

/// Outline entry resolved against the pages actually written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    pub title: String,
    /// 0-based page index into the written document
    pub page: usize,
    pub children: Vec<OutlineItem>,
}

/// Resolve bookmark targets against `page_count` written pages.
///
/// Nodes pointing past the last written page (the document has gaps) are
/// dropped together with their subtree.
pub fn plan_outline(nodes: &[BookmarkNode], page_count: usize) -> Vec<OutlineItem> {
    nodes
        .iter()
        .filter_map(|node| {
            let page = (node.pnum as usize).checked_sub(1)?;
            if page >= page_count {
                tracing::debug!(pnum = node.pnum, page_count, "Skipping bookmark past last page");
                return None;
            }
            Some(OutlineItem {
                title: node.label.clone().unwrap_or_default(),
                page,
                children: node
                    .children
                    .as_deref()
                    .map(|children| plan_outline(children, page_count))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Total number of entries in the tree
pub fn outline_len(items: &[OutlineItem]) -> usize {
    items.iter().map(|item| 1 + outline_len(&item.children)).sum()
}

/// Add the outline objects to `doc` and return the root `/Outlines` id.
pub(crate) fn write_outline(
    doc: &mut Document,
    items: &[OutlineItem],
    page_ids: &[ObjectId],
) -> Option<ObjectId> {
    if items.is_empty() {
        return None;
    }

    let root_id = doc.new_object_id();
    let (first, last, count) = write_level(doc, items, root_id, page_ids)?;
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => first,
            "Last" => last,
            "Count" => count,
        }),
    );
    Some(root_id)
}

/// Writes one sibling list under `parent`. Returns first, last and the
/// number of entries in the subtree.
fn write_level(
    doc: &mut Document,
    items: &[OutlineItem],
    parent: ObjectId,
    page_ids: &[ObjectId],
) -> Option<(ObjectId, ObjectId, i64)> {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();
    let mut count = 0i64;

    for (position, item) in items.iter().enumerate() {
        let page_id = *page_ids.get(item.page)?;
        let mut entry = dictionary! {
            "Title" => Object::String(encode_text_string(&item.title), StringFormat::Hexadecimal),
            "Parent" => parent,
            "Dest" => vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())],
        };
        if position > 0 {
            entry.set("Prev", ids[position - 1]);
        }
        if let Some(next) = ids.get(position + 1) {
            entry.set("Next", *next);
        }
        if !item.children.is_empty() {
            if let Some((first, last, nested)) = write_level(doc, &item.children, ids[position], page_ids) {
                entry.set("First", first);
                entry.set("Last", last);
                entry.set("Count", nested);
                count += nested;
            }
        }
        doc.objects.insert(ids[position], Object::Dictionary(entry));
        count += 1;
    }

    Some((*ids.first()?, *ids.last()?, count))
}

/// PDF text string: UTF-16BE with byte order mark
fn encode_text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Vec<BookmarkNode> {
        BookmarkNode::parse_tree(&json!([
            {"label": "Cover", "pnum": "1", "children": null},
            {"label": "Part I", "pnum": 2, "children": [
                {"label": "Chapter 1", "pnum": "2", "isLeaf": true},
                {"label": "Chapter 2", "pnum": "9", "children": [
                    {"label": "Section", "pnum": "9"}
                ]}
            ]},
            {"label": "Index", "pnum": "40"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_parse_tree_accepts_mixed_numbers() {
        let nodes = tree();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].pnum, 2);
        assert_eq!(nodes[1].children.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_plan_outline_drops_entries_past_last_page() {
        let items = plan_outline(&tree(), 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].page, 0);
        assert_eq!(items[1].title, "Part I");
        assert_eq!(items[1].children.len(), 1);
        assert_eq!(items[1].children[0].title, "Chapter 1");
        assert_eq!(outline_len(&items), 3);

        assert_eq!(outline_len(&plan_outline(&tree(), 40)), 6);
    }

    #[test]
    fn test_zero_page_is_skipped() {
        let nodes = BookmarkNode::parse_tree(&json!([{"label": "x", "pnum": 0}])).unwrap();
        assert!(plan_outline(&nodes, 10).is_empty());
    }

    #[test]
    fn test_encode_text_string() {
        assert_eq!(encode_text_string("A"), vec![0xFE, 0xFF, 0x00, 0x41]);
        assert_eq!(encode_text_string("目"), vec![0xFE, 0xFF, 0x76, 0xEE]);
    }

    #[test]
    fn test_write_outline_links_siblings() {
        let mut doc = Document::with_version("1.5");
        let pages: Vec<ObjectId> = (0..3).map(|_| doc.new_object_id()).collect();
        let items = plan_outline(&tree(), 3);

        let root = write_outline(&mut doc, &items, &pages).unwrap();
        let root_dict = doc.get_object(root).unwrap().as_dict().unwrap();
        assert_eq!(root_dict.get(b"Count").unwrap().as_i64().unwrap(), 3);

        let first = root_dict.get(b"First").unwrap().as_reference().unwrap();
        let cover = doc.get_object(first).unwrap().as_dict().unwrap();
        let next = cover.get(b"Next").unwrap().as_reference().unwrap();
        let part = doc.get_object(next).unwrap().as_dict().unwrap();
        assert_eq!(part.get(b"Prev").unwrap().as_reference().unwrap(), first);
        assert_eq!(part.get(b"Count").unwrap().as_i64().unwrap(), 1);
    }

    #[test]
    fn test_write_outline_empty() {
        let mut doc = Document::with_version("1.5");
        assert!(write_outline(&mut doc, &[], &[]).is_none());
    }
}
