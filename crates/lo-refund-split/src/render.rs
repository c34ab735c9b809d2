//! Summary page drawn from scratch with the standard Helvetica faces.
//!
//! Layout is computed in PDF user space (origin bottom-left). The title sits
//! at the top margin, the table hangs below it, and the body font shrinks
//! until the table fits the page. Rows are never dropped: a table that does
//! not fit at the smallest font size is an error.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use crate::error::SplitError;
use crate::model::{Cell, Row, cell_text};
use crate::text_runs::estimate_text_width;

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MARGIN: f32 = 36.0;
const TITLE_FONT_SIZE: f32 = 16.0;
const TITLE_GAP: f32 = 20.0;
const MAX_BODY_FONT_SIZE: f32 = 8.0;
const MIN_BODY_FONT_SIZE: f32 = 4.0;
const FONT_SIZE_STEP: f32 = 0.5;
// Cell padding as a fraction of the body font size.
const CELL_PADDING_X: f32 = 0.5;
const CELL_PADDING_Y: f32 = 0.375;
const HEADER_EXTRA_PADDING: f32 = 0.75;
const MIN_COLUMN_WIDTH: f32 = 18.0;
const GRID_LINE_WIDTH: f32 = 0.5;

type Rgb = (f32, f32, f32);

const HEADER_BACKGROUND: Rgb = (0.5, 0.5, 0.5);
const HEADER_TEXT: Rgb = (0.96, 0.96, 0.96);
const EVEN_ROW_BACKGROUND: Rgb = (0.96, 0.96, 0.86);
const ODD_ROW_BACKGROUND: Rgb = (0.9, 0.93, 0.97);
const BODY_TEXT: Rgb = (0.0, 0.0, 0.0);
const GRID_COLOR: Rgb = (0.0, 0.0, 0.0);

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

#[must_use]
pub fn summary_title(identifier: &str) -> String {
    format!("LO REFUND DETAIL: {identifier}")
}

/// Cell text as printed: line breaks become spaces, absent cells are empty.
#[must_use]
pub fn display_text(cell: &Cell) -> String {
    cell_text(cell)
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
}

/// Characters outside WinAnsi (Latin-1 for printable ranges) become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match u32::from(ch) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).unwrap_or(b'?'),
            _ => b'?',
        })
        .collect()
}

#[derive(Debug)]
struct TableLayout {
    font_size: f32,
    column_widths: Vec<f32>,
    header_height: f32,
    row_height: f32,
}

impl TableLayout {
    fn width(&self) -> f32 {
        self.column_widths.iter().sum()
    }

    fn height(&self, data_rows: usize) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let rows = data_rows as f32;
        self.header_height + rows * self.row_height
    }
}

fn measure(lines: &[Vec<String>], column_count: usize, font_size: f32) -> TableLayout {
    let padding_x = font_size * CELL_PADDING_X;
    let mut column_widths = vec![MIN_COLUMN_WIDTH; column_count];
    for line in lines {
        for (width, text) in column_widths.iter_mut().zip(line) {
            *width = width.max(estimate_text_width(text, font_size) + 2.0 * padding_x);
        }
    }

    let row_height = font_size * (1.0 + 2.0 * CELL_PADDING_Y);
    TableLayout {
        font_size,
        column_widths,
        header_height: row_height + font_size * HEADER_EXTRA_PADDING,
        row_height,
    }
}

fn fit_layout(lines: &[Vec<String>], column_count: usize) -> Result<TableLayout, SplitError> {
    let available_width = PAGE_WIDTH - 2.0 * MARGIN;
    let available_height = table_top() - MARGIN;
    let data_rows = lines.len().saturating_sub(1);

    let mut font_size = MAX_BODY_FONT_SIZE;
    loop {
        let layout = measure(lines, column_count, font_size);
        if layout.width() <= available_width && layout.height(data_rows) <= available_height {
            return Ok(layout);
        }
        if font_size - FONT_SIZE_STEP < MIN_BODY_FONT_SIZE {
            return Err(SplitError::Render(format!(
                "table of {data_rows} rows and {column_count} columns does not fit on one page"
            )));
        }
        font_size -= FONT_SIZE_STEP;
    }
}

fn table_top() -> f32 {
    PAGE_HEIGHT - MARGIN - TITLE_FONT_SIZE - TITLE_GAP
}

fn fill_color(operations: &mut Vec<Operation>, (r, g, b): Rgb) {
    operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
}

fn stroke_color(operations: &mut Vec<Operation>, (r, g, b): Rgb) {
    operations.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
}

fn rectangle(operations: &mut Vec<Operation>, x: f32, y: f32, width: f32, height: f32) {
    operations.push(Operation::new(
        "re",
        vec![x.into(), y.into(), width.into(), height.into()],
    ));
}

fn text(
    operations: &mut Vec<Operation>,
    font: &str,
    font_size: f32,
    color: Rgb,
    (x, y): (f32, f32),
    value: &str,
) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![font.into(), font_size.into()]));
    fill_color(operations, color);
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(value), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

fn draw_row(
    operations: &mut Vec<Operation>,
    layout: &TableLayout,
    cells: &[String],
    top: f32,
    height: f32,
    is_header: bool,
    background: Rgb,
) {
    let (font, color) = if is_header {
        (BOLD_FONT, HEADER_TEXT)
    } else {
        (REGULAR_FONT, BODY_TEXT)
    };
    let bottom = top - height;

    let mut x = MARGIN;
    for (index, &width) in layout.column_widths.iter().enumerate() {
        fill_color(operations, background);
        rectangle(operations, x, bottom, width, height);
        operations.push(Operation::new("f", vec![]));

        stroke_color(operations, GRID_COLOR);
        rectangle(operations, x, bottom, width, height);
        operations.push(Operation::new("S", vec![]));

        let value = cells.get(index).map_or("", String::as_str);
        if !value.is_empty() {
            let text_width = estimate_text_width(value, layout.font_size);
            let text_x = x + (width - text_width) / 2.0;
            let baseline = bottom + (height - layout.font_size) / 2.0 + layout.font_size * 0.2;
            text(
                operations,
                font,
                layout.font_size,
                color,
                (text_x, baseline),
                value,
            );
        }

        x += width;
    }
}

fn page_operations(
    identifier: &str,
    lines: &[Vec<String>],
    layout: &TableLayout,
) -> Vec<Operation> {
    let mut operations = Vec::new();

    text(
        &mut operations,
        BOLD_FONT,
        TITLE_FONT_SIZE,
        BODY_TEXT,
        (MARGIN, PAGE_HEIGHT - MARGIN - TITLE_FONT_SIZE),
        &summary_title(identifier),
    );

    operations.push(Operation::new("w", vec![GRID_LINE_WIDTH.into()]));

    let mut top = table_top();
    for (index, cells) in lines.iter().enumerate() {
        if index == 0 {
            draw_row(
                &mut operations,
                layout,
                cells,
                top,
                layout.header_height,
                true,
                HEADER_BACKGROUND,
            );
            top -= layout.header_height;
            continue;
        }

        let background = if (index - 1) % 2 == 0 {
            EVEN_ROW_BACKGROUND
        } else {
            ODD_ROW_BACKGROUND
        };
        draw_row(
            &mut operations,
            layout,
            cells,
            top,
            layout.row_height,
            false,
            background,
        );
        top -= layout.row_height;
    }

    operations
}

fn build_document(operations: Vec<Operation>) -> Result<Document, SplitError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Rotate" => 0,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
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

/// Renders the landscape summary page for one identifier's rows.
pub fn render_summary_page(
    header: &[Cell],
    rows: &[Row],
    identifier: &str,
) -> Result<Vec<u8>, SplitError> {
    if rows.is_empty() {
        return Err(SplitError::Render(format!(
            "identifier {identifier} has no rows to render"
        )));
    }

    let lines = std::iter::once(header)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|cells| cells.iter().map(display_text).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let column_count = lines.iter().map(Vec::len).max().unwrap_or(0);
    if column_count == 0 {
        return Err(SplitError::Render(format!(
            "identifier {identifier} has no columns to render"
        )));
    }

    let layout = fit_layout(&lines, column_count)?;
    let mut doc = build_document(page_operations(identifier, &lines, &layout))?;

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use lopdf::content::Content;
    use lopdf::{Document, Object};

    use super::{display_text, encode_win_ansi, render_summary_page, summary_title};

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|cell| cell.map(str::to_string)).collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn number(object: &Object) -> f32 {
        match object {
            Object::Integer(value) => *value as f32,
            Object::Real(value) => *value as f32,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn page_fill_colors(pdf: &[u8]) -> Vec<Vec<f32>> {
        let doc = Document::load_mem(pdf).expect("rendered PDF should load");
        let page_id = *doc.get_pages().values().next().expect("one page");
        let content = Content::decode(&doc.get_page_content(page_id).expect("content"))
            .expect("content should decode");
        content
            .operations
            .iter()
            .filter(|operation| operation.operator == "rg")
            .map(|operation| {
                operation
                    .operands
                    .iter()
                    .map(number)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn cleans_cells_for_display() {
        assert_eq!(display_text(&Some("Line\nbreak".to_string())), "Line break");
        assert_eq!(display_text(&None), "");
        assert_eq!(summary_title("016"), "LO REFUND DETAIL: 016");
    }

    #[test]
    fn non_latin_characters_print_as_question_marks() {
        assert_eq!(encode_win_ansi("Café→"), b"Caf\xE9?".to_vec());
    }

    #[test]
    fn renders_single_landscape_page() {
        let header = row(&[Some("Vendor"), Some("LO"), Some("Amount")]);
        let rows = vec![row(&[Some("A"), Some("016"), Some("10.00")])];

        let pdf = render_summary_page(&header, &rows, "016").expect("page should render");
        let doc = Document::load_mem(&pdf).expect("rendered PDF should load");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc
            .get_dictionary(*pages.values().next().expect("one page"))
            .expect("page dictionary");
        let media_box = page
            .get(b"MediaBox")
            .and_then(Object::as_array)
            .expect("media box");
        let width = number(&media_box[2]);
        let height = number(&media_box[3]);
        assert!(width > height, "summary page should be landscape");
    }

    #[test]
    fn data_rows_alternate_background_tints() {
        let header = row(&[Some("Vendor"), Some("LO")]);
        let rows = vec![
            row(&[Some("A"), Some("016")]),
            row(&[Some("B"), Some("016")]),
            row(&[Some("C"), Some("016")]),
        ];

        let pdf = render_summary_page(&header, &rows, "016").expect("page should render");
        let colors = page_fill_colors(&pdf);

        // title text, then per cell: background and text color.
        let backgrounds = colors
            .iter()
            .skip(1)
            .step_by(2)
            .step_by(2)
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(backgrounds.len(), 4);
        assert_ne!(backgrounds[0], backgrounds[1]);
        assert_ne!(backgrounds[1], backgrounds[2]);
        assert_eq!(backgrounds[1], backgrounds[3]);
    }

    #[test]
    fn dense_group_shrinks_font_to_fit() {
        let header = row(&[Some("Vendor"), Some("LO"), Some("Amount")]);
        let rows = (0..60)
            .map(|index| {
                vec![
                    Some(format!("V{index}")),
                    Some("016".to_string()),
                    Some("1.00".to_string()),
                ]
            })
            .collect::<Vec<_>>();

        let pdf = render_summary_page(&header, &rows, "016").expect("60 rows should fit");
        let doc = Document::load_mem(&pdf).expect("rendered PDF should load");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn too_many_rows_is_an_error_not_a_truncation() {
        let header = row(&[Some("Vendor"), Some("LO")]);
        let rows = (0..400)
            .map(|index| vec![Some(format!("V{index}")), Some("016".to_string())])
            .collect::<Vec<_>>();

        let err = render_summary_page(&header, &rows, "016").expect_err("should not fit");
        assert!(err.to_string().contains("does not fit"));
    }
}
