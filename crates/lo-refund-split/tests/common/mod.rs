#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

const COLUMN_PITCH: i64 = 120;
const ROW_PITCH: i64 = 20;
const GRID_TOP: i64 = 760;
const NOTES_TOP: i64 = 400;

/// One page of fixture content.
pub enum FixturePage<'a> {
    /// Lines shown one per `T*`, each as a single text run.
    Lines(Vec<&'a str>),
    /// Cells placed at fixed column positions, one run per present cell.
    Grid(Vec<Vec<Option<&'a str>>>),
    /// Lines at the top of the page and a small grid of notes further down.
    LinesWithNotes {
        lines: Vec<&'a str>,
        notes: Vec<Vec<Option<&'a str>>>,
    },
}

fn line_operations(lines: &[&str]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];

    for (index, line) in lines.iter().enumerate() {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        if index + 1 < lines.len() {
            operations.push(Operation::new("T*", vec![]));
        }
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

fn grid_operations(rows: &[Vec<Option<&str>>], top: i64) -> Vec<Operation> {
    let mut operations = Vec::new();
    let mut y = top;
    for row in rows {
        let mut x = 50;
        for cell in row {
            if let Some(text) = cell {
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 10.into()]),
                    Operation::new(
                        "Tm",
                        vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                    ),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]);
            }
            x += COLUMN_PITCH;
        }
        y -= ROW_PITCH;
    }
    operations
}

fn build_document(pages: &[FixturePage<'_>]) -> Result<Document, Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for page in pages {
        let operations = match page {
            FixturePage::Lines(lines) => line_operations(lines),
            FixturePage::Grid(rows) => grid_operations(rows, GRID_TOP),
            FixturePage::LinesWithNotes { lines, notes } => {
                let mut operations = line_operations(lines);
                operations.extend(grid_operations(notes, NOTES_TOP));
                operations
            }
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

pub fn create_test_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let pages = pages
        .iter()
        .map(|lines| FixturePage::Lines(lines.clone()))
        .collect::<Vec<_>>();
    let mut doc = build_document(&pages)?;
    doc.save(path)?;
    Ok(())
}

pub fn create_pdf_bytes(pages: &[FixturePage<'_>]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut doc = build_document(pages)?;
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// A batch PDF whose first page carries `rows` as a positioned grid, followed
/// by marker pages `tail-2`, `tail-3`, ... up to `page_count` pages in total.
pub fn batch_pdf(rows: Vec<Vec<Option<&str>>>, page_count: usize) -> Vec<u8> {
    let markers = (2..=page_count)
        .map(|page| format!("tail-{page}"))
        .collect::<Vec<_>>();
    let mut pages = vec![FixturePage::Grid(rows)];
    pages.extend(
        markers
            .iter()
            .map(|marker| FixturePage::Lines(vec![marker.as_str()])),
    );
    create_pdf_bytes(&pages).expect("PDF fixture should be created")
}

/// The vendor/LO/amount table used across the pipeline tests: rows A and B
/// belong to LO 016, C carries a non-numeric LO and D has none.
pub fn refund_rows() -> Vec<Vec<Option<&'static str>>> {
    vec![
        vec![Some("Vendor"), Some("LO"), Some("Amount")],
        vec![Some("A"), Some("016"), Some("10.00")],
        vec![Some("B"), Some("016"), Some("5.00")],
        vec![Some("C"), Some("02x"), Some("3.00")],
        vec![Some("D"), None, Some("1.00")],
    ]
}

/// Concatenated text shown on each page, in page order.
pub fn page_texts(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).expect("output PDF should load");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).expect("page content should load");
            let content = Content::decode(&content).expect("page content should decode");
            content
                .operations
                .iter()
                .filter(|operation| operation.operator == "Tj")
                .filter_map(|operation| operation.operands.first())
                .filter_map(|operand| operand.as_str().ok())
                .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
