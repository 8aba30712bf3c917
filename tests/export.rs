//! Exporter integration tests: files on disk, read back.

use caselens::demo::{demo_deck, demo_sections, DEMO_TITLE};
use caselens::export::{file_stem, FALLBACK_STEM};
use caselens::{export_deck, export_word, DocumentSection, ExportError};
use std::io::{Cursor, Read};

/// Expected `(list items, paragraphs)` by the prefix rule: a trimmed line
/// starting with `-`, `*`, or digits followed by `.` is a list item.
fn count_blocks(sections: &[DocumentSection]) -> (usize, usize) {
    let mut counts = (0, 0);
    for line in sections.iter().flat_map(|s| s.body.lines()) {
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        let digits = t.chars().take_while(char::is_ascii_digit).count();
        let numbered = digits > 0 && t[digits..].starts_with('.');
        if t.starts_with('-') || t.starts_with('*') || numbered {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
    }
    counts
}

#[test]
fn word_export_keeps_every_list_item_and_paragraph() {
    let dir = tempfile::tempdir().unwrap();
    let mut sections = demo_sections();
    sections.push(DocumentSection::new(
        "6. Notes",
        "**Expert Note**: growth loops met Art. 25\n\
         2.5 million child users were affected\n\
         Business accounts defaulted to public.\n\
         - Contact details shown\n\
         10. Appeal lodged",
    ));
    let path = export_word(&sections, DEMO_TITLE, dir.path()).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("{}.doc", file_stem(DEMO_TITLE))
    );
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    let html = String::from_utf8(bytes).unwrap();

    let (items, paragraphs) = count_blocks(&sections);
    assert_eq!(html.matches("<li>").count(), items);
    assert_eq!(html.matches("<p>").count(), paragraphs);
    assert_eq!(html.matches("<h1>").count(), sections.len());
    assert!(html.contains("<li><strong>Expert Note</strong>: growth loops met Art. 25</li>"));
    assert!(html.contains("<li>2.5 million child users were affected</li>"));
    assert!(html.contains("<li>Appeal lodged</li>"));
}

#[test]
fn word_export_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("exports").join("2023");
    let sections = vec![DocumentSection::new("Summary", "- one\n- two")];
    let path = export_word(&sections, "", &nested).unwrap();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("{FALLBACK_STEM}.doc")
    );
    assert!(path.exists());
}

#[test]
fn deck_export_writes_a_readable_package() {
    let dir = tempfile::tempdir().unwrap();
    let deck = demo_deck();
    let path = export_deck(&deck, dir.path()).unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .ends_with("_deck.pptx"));

    let bytes = std::fs::read(&path).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let slide_parts = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .count();
    assert_eq!(slide_parts, deck.slides.len());

    let mut title = String::new();
    archive
        .by_name("ppt/slides/slide1.xml")
        .unwrap()
        .read_to_string(&mut title)
        .unwrap();
    assert!(title.contains("Meta Platforms"));
    assert!(title.contains("Irish DPC"));
}

#[test]
fn deck_with_embedded_image_carries_the_media_part() {
    let dir = tempfile::tempdir().unwrap();
    let mut deck = demo_deck();

    let mut png = Vec::new();
    image::DynamicImage::new_rgb8(8, 4)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    use base64::Engine as _;
    let uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    );
    deck.slides[3].image = Some(uri);

    let path = export_deck(&deck, dir.path()).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(std::fs::read(path).unwrap())).unwrap();
    assert_eq!(
        archive
            .file_names()
            .filter(|n| n.starts_with("ppt/media/") && n.ends_with(".png"))
            .count(),
        1
    );
}

#[test]
fn empty_artifacts_are_not_exported() {
    let dir = tempfile::tempdir().unwrap();
    let mut deck = demo_deck();
    deck.slides.clear();
    assert!(matches!(
        export_deck(&deck, dir.path()),
        Err(ExportError::Empty(_))
    ));
    assert!(matches!(
        export_word(&[], "x", dir.path()),
        Err(ExportError::Empty(_))
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
