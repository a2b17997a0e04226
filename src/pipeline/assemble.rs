//! Output assembly: JPEG page images → a fresh PDF via lopdf.
//!
//! The new file shares nothing with the source: a catalog, one page tree,
//! and per page one image XObject drawn over the full page box. This is what
//! makes the output readable by tools that choked on the original structure.
//!
//! The first page's box is written on the page-tree node as the inherited
//! default. Every page also carries its own `/MediaBox`, so mixed-size and
//! mixed-orientation documents come out page by page exactly as rendered;
//! later pages never change the default.

use crate::error::AssemblyError;
use crate::pipeline::geometry::{PageBox, PageGeometry};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

const IMAGE_NAME: &str = "Im0";

/// One page ready for assembly.
#[derive(Clone)]
pub struct PageRecord {
    /// Baseline JPEG of the page raster.
    pub jpeg: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub geometry: PageGeometry,
}

/// Build and serialise the output document from pages in order.
///
/// The JPEG buffers move into the document; nothing is copied.
pub fn assemble_document(
    pages: Vec<PageRecord>,
    producer: &str,
) -> Result<Vec<u8>, AssemblyError> {
    let default_box = pages
        .first()
        .ok_or(AssemblyError::NoPages)?
        .geometry
        .page_box();
    for (i, page) in pages.iter().enumerate() {
        page.geometry.validate(i + 1)?;
    }
    let page_count = pages.len();

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for page in pages {
        let page_id = add_page(&mut doc, pages_id, page)?;
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => media_box_object(default_box),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal(producer),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AssemblyError::Serialize(e.to_string()))?;

    debug!("Assembled {} pages → {} bytes", page_count, buf.len());
    Ok(buf)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page: PageRecord,
) -> Result<ObjectId, AssemblyError> {
    let PageRecord {
        jpeg,
        width_px,
        height_px,
        geometry,
    } = page;
    let PageGeometry {
        width_pt,
        height_pt,
    } = geometry;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width_px as i64,
            "Height" => height_px as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    // Scale the unit image square to the page and anchor it at the origin.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| AssemblyError::Serialize(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box_object(geometry.page_box()),
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    }))
}

fn media_box_object(page_box: PageBox) -> Object {
    Object::Array(page_box.media_box().iter().map(|&v| Object::from(v)).collect())
}
