//! Page images to PDF
//!
//! One page per image, sized to the image in pixels, with the image
//! embedded as a DCT (JPEG) stream.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde_json::Value;

use super::error::{FinalizeError, FinalizeResult};
use super::outline::{outline_len, plan_outline, write_outline, BookmarkNode};
use crate::assembly::load_as_jpeg;
use crate::document::{list_page_images, load_bookmark};

/// What ended up in a written PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfSummary {
    pub pages: usize,
    pub outline_entries: usize,
}

/// Write every `<n>.<extension>` image of `page_dir`, in numeric order, to
/// a PDF at `output`. An unparseable bookmark tree is logged and skipped.
pub fn write_pdf(
    page_dir: &Path,
    extension: &str,
    output: &Path,
    bookmark: Option<&Value>,
    quality: u8,
) -> FinalizeResult<PdfSummary> {
    let images = list_page_images(page_dir, extension)?;
    if images.is_empty() {
        return Err(FinalizeError::NoPages {
            dir: page_dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::with_capacity(images.len());
    for (_, path) in &images {
        page_ids.push(add_image_page(&mut doc, pages_id, path, quality)?);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };

    let mut outline_entries = 0;
    if let Some(tree) = bookmark {
        match BookmarkNode::parse_tree(tree) {
            Ok(nodes) => {
                let items = plan_outline(&nodes, page_ids.len());
                outline_entries = outline_len(&items);
                if let Some(outlines_id) = write_outline(&mut doc, &items, &page_ids) {
                    catalog.set("Outlines", outlines_id);
                    catalog.set("PageMode", "UseOutlines");
                }
            }
            Err(e) => {
                tracing::warn!(dir = %page_dir.display(), error = %e, "Ignoring malformed bookmark tree");
            }
        }
    }

    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(output)?;

    Ok(PdfSummary {
        pages: page_ids.len(),
        outline_entries,
    })
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    path: &Path,
    quality: u8,
) -> FinalizeResult<ObjectId> {
    let jpeg = load_as_jpeg(path, quality).map_err(|source| FinalizeError::PageImage {
        path: path.to_path_buf(),
        source,
    })?;
    let width = i64::from(jpeg.width);
    let height = i64::from(jpeg.height);

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.data,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    Ok(page_id)
}

/// Offline merge of a page directory, picking up `bookmark.json` when
/// present
pub fn merge_directory(
    page_dir: &Path,
    extension: &str,
    output: &Path,
    quality: u8,
) -> FinalizeResult<PdfSummary> {
    let bookmark = match load_bookmark(page_dir) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(dir = %page_dir.display(), error = %e, "Unreadable bookmark file");
            None
        }
    };
    write_pdf(page_dir, extension, output, bookmark.as_ref(), quality)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    use image::{Rgb, RgbImage};

    use crate::assembly::{encode_page, ImageFormat};

    /// Writes `<page>.<ext>` solid images into `dir`
    pub fn write_pages(dir: &Path, pages: &[u32], format: ImageFormat) {
        std::fs::create_dir_all(dir).unwrap();
        for &page in pages {
            let img = RgbImage::from_pixel(12 + page, 20, Rgb([page as u8 * 20, 40, 80]));
            let bytes = encode_page(&img, format, 80).unwrap();
            std::fs::write(dir.join(format!("{}.{}", page, format.extension())), bytes).unwrap();
        }
    }
}
