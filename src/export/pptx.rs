//! PowerPoint package writer.
//!
//! Turns [`SlideLayout`]s into a minimal Office Open XML presentation: one
//! master, one blank layout, a theme, and one part per slide, zipped with
//! `zip`. Coordinates are converted from inches to EMU; text is escaped with
//! `quick_xml::escape`.

use super::layout::{layout_slide, Element, Frame, ImageSource, Paragraph, SlideLayout};
use super::{file_stem, write_output};
use crate::error::ExportError;
use crate::model::Deck;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const EMU_PER_INCH: f64 = 914_400.0;
/// 13.333 in × 7.5 in.
const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

fn xfrm(frame: &Frame) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(frame.x),
        emu(frame.y),
        emu(frame.w.max(0.01)),
        emu(frame.h.max(0.01))
    )
}

/// One relationship of a slide part.
struct Rel {
    id: String,
    kind: &'static str,
    target: String,
    external: bool,
}

/// A picture stored under `ppt/media/`.
struct Media {
    path: String,
    bytes: Vec<u8>,
}

fn rels_xml(rels: &[Rel]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for r in rels {
        let _ = write!(
            out,
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            r.id,
            r.kind,
            escape(r.target.as_str()),
            if r.external { r#" TargetMode="External""# } else { "" }
        );
    }
    out.push_str("</Relationships>");
    out
}

fn paragraph_xml(p: &Paragraph) -> String {
    let mut out = String::from("<a:p><a:pPr");
    if p.bullet {
        out.push_str(r#" marL="285750" indent="-285750""#);
    }
    out.push('>');
    if let Some(spacing) = p.line_spacing {
        let _ = write!(
            out,
            r#"<a:lnSpc><a:spcPct val="{}"/></a:lnSpc>"#,
            (spacing * 100_000.0).round() as i64
        );
    }
    if p.bullet {
        out.push_str(r#"<a:buFont typeface="Arial"/><a:buChar char="•"/>"#);
    } else {
        out.push_str("<a:buNone/>");
    }
    out.push_str("</a:pPr>");

    for run in &p.runs {
        let _ = write!(
            out,
            r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" i="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
            (run.size.max(1.0) * 100.0).round() as i64,
            u8::from(run.bold),
            u8::from(run.italic),
            run.color,
            escape(run.text.as_str())
        );
    }
    out.push_str("</a:p>");
    out
}

/// Build the XML of one slide, collecting its relationships and media.
fn slide_xml(
    layout: &SlideLayout,
    slide_no: usize,
    media: &mut Vec<Media>,
) -> (String, Vec<Rel>) {
    let mut rels = vec![Rel {
        id: "rId1".into(),
        kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout",
        target: "../slideLayouts/slideLayout1.xml".into(),
        external: false,
    }];

    let mut shapes = String::new();
    for (i, element) in layout.elements.iter().enumerate() {
        let shape_id = i + 2;
        match element {
            Element::Text { frame, paragraphs } => {
                let _ = write!(
                    shapes,
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="Text {shape_id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" lIns="91440" tIns="45720" rIns="91440" bIns="45720" anchor="t"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#,
                    xfrm(frame)
                );
                if paragraphs.is_empty() {
                    shapes.push_str("<a:p><a:endParaRPr lang=\"en-US\"/></a:p>");
                }
                for p in paragraphs {
                    shapes.push_str(&paragraph_xml(p));
                }
                shapes.push_str("</p:txBody></p:sp>");
            }
            Element::Panel { frame, fill, line } => {
                let _ = write!(
                    shapes,
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="Panel {shape_id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{fill}"/></a:solidFill><a:ln w="12700"><a:solidFill><a:srgbClr val="{line}"/></a:solidFill></a:ln></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#,
                    xfrm(frame)
                );
            }
            Element::Picture {
                frame,
                source,
                name,
            } => {
                let rel_id = format!("rId{}", rels.len() + 1);
                let blip = match source {
                    ImageSource::Embedded { bytes, .. } => {
                        let ext = source.extension().unwrap_or("png");
                        let file = format!("image{}-{}.{ext}", slide_no, media.len() + 1);
                        media.push(Media {
                            path: format!("ppt/media/{file}"),
                            bytes: bytes.clone(),
                        });
                        rels.push(Rel {
                            id: rel_id.clone(),
                            kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image",
                            target: format!("../media/{file}"),
                            external: false,
                        });
                        format!(r#"<a:blip r:embed="{rel_id}"/>"#)
                    }
                    ImageSource::External(url) => {
                        rels.push(Rel {
                            id: rel_id.clone(),
                            kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image",
                            target: url.clone(),
                            external: true,
                        });
                        format!(r#"<a:blip r:link="{rel_id}"/>"#)
                    }
                };
                let _ = write!(
                    shapes,
                    r#"<p:pic><p:nvPicPr><p:cNvPr id="{shape_id}" name="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill>{blip}<a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
                    escape(name.as_str()),
                    xfrm(frame)
                );
            }
        }
    }

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        layout.background
    );
    (xml, rels)
}

fn content_types(slide_count: usize) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Default Extension="gif" ContentType="image/gif"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/ppt/presProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"/><Override PartName="/ppt/viewProps.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"/><Override PartName="/ppt/tableStyles.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
    );
    for n in 1..=slide_count {
        let _ = write!(
            out,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        );
    }
    out.push_str("</Types>");
    out
}

fn presentation_xml(slide_count: usize) -> String {
    let ids: String = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut rels = vec![Rel {
        id: "rId1".into(),
        kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster",
        target: "slideMasters/slideMaster1.xml".into(),
        external: false,
    }];
    for n in 1..=slide_count {
        rels.push(Rel {
            id: format!("rId{}", n + 1),
            kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide",
            target: format!("slides/slide{n}.xml"),
            external: false,
        });
    }
    let tail: [(&'static str, &str); 4] = [
        ("http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme", "theme/theme1.xml"),
        ("http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps", "presProps.xml"),
        ("http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps", "viewProps.xml"),
        ("http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles", "tableStyles.xml"),
    ];
    for (kind, target) in tail {
        rels.push(Rel {
            id: format!("rId{}", rels.len() + 1),
            kind,
            target: target.into(),
            external: false,
        });
    }
    rels_xml(&rels)
}

fn root_rels() -> String {
    rels_xml(&[
        Rel {
            id: "rId1".into(),
            kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            target: "ppt/presentation.xml".into(),
            external: false,
        },
        Rel {
            id: "rId2".into(),
            kind: "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            target: "docProps/core.xml".into(),
            external: false,
        },
        Rel {
            id: "rId3".into(),
            kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties",
            target: "docProps/app.xml".into(),
            external: false,
        },
    ])
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>CaseLens</dc:creator></cp:coreProperties>"#,
        escape(title)
    )
}

fn app_xml(slide_count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>CaseLens</Application><PresentationFormat>Widescreen</PresentationFormat><Slides>{slide_count}</Slides></Properties>"#
    )
}

fn master_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="3200"/></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#
    )
}

fn layout_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme_xml() -> String {
    let solid = |c: &str| format!(r#"<a:solidFill><a:srgbClr val="{c}"/></a:solidFill>"#);
    let line = |w: u32| format!(r#"<a:ln w="{w}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="{NS_A}" name="CaseLens"><a:themeElements><a:clrScheme name="CaseLens"><a:dk1><a:srgbClr val="1E293B"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="0F172A"/></a:dk2><a:lt2><a:srgbClr val="F1F5F9"/></a:lt2><a:accent1><a:srgbClr val="4F46E5"/></a:accent1><a:accent2><a:srgbClr val="2563EB"/></a:accent2><a:accent3><a:srgbClr val="0EA5E9"/></a:accent3><a:accent4><a:srgbClr val="DC2626"/></a:accent4><a:accent5><a:srgbClr val="16A34A"/></a:accent5><a:accent6><a:srgbClr val="F59E0B"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="CaseLens"><a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="CaseLens"><a:fillStyleLst>{f}{f}{f}</a:fillStyleLst><a:lnStyleLst>{l1}{l2}{l3}</a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst>{f}{f}{f}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#,
        f = solid("FFFFFF"),
        l1 = line(6350),
        l2 = line(12700),
        l3 = line(19050),
    )
}

const PRES_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentationPr xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#;
const VIEW_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:viewPr xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#;
const TABLE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:tblStyleLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" def="{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}"/>"#;

fn single_rel(kind: &'static str, target: &str) -> String {
    rels_xml(&[Rel {
        id: "rId1".into(),
        kind,
        target: target.into(),
        external: false,
    }])
}

/// Render `deck` as PPTX bytes.
pub fn render_pptx(deck: &Deck) -> Result<Vec<u8>, ExportError> {
    if deck.slides.is_empty() {
        return Err(ExportError::Empty("the deck has no slides"));
    }
    let count = deck.slides.len();

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types(count).into_bytes()),
        ("_rels/.rels".into(), root_rels().into_bytes()),
        ("docProps/core.xml".into(), core_xml(&deck.presentation_title).into_bytes()),
        ("docProps/app.xml".into(), app_xml(count).into_bytes()),
        ("ppt/presentation.xml".into(), presentation_xml(count).into_bytes()),
        ("ppt/_rels/presentation.xml.rels".into(), presentation_rels(count).into_bytes()),
        ("ppt/presProps.xml".into(), PRES_PROPS.as_bytes().to_vec()),
        ("ppt/viewProps.xml".into(), VIEW_PROPS.as_bytes().to_vec()),
        ("ppt/tableStyles.xml".into(), TABLE_STYLES.as_bytes().to_vec()),
        ("ppt/theme/theme1.xml".into(), theme_xml().into_bytes()),
        ("ppt/slideMasters/slideMaster1.xml".into(), master_xml().into_bytes()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            rels_xml(&[
                Rel {
                    id: "rId1".into(),
                    kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout",
                    target: "../slideLayouts/slideLayout1.xml".into(),
                    external: false,
                },
                Rel {
                    id: "rId2".into(),
                    kind: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme",
                    target: "../theme/theme1.xml".into(),
                    external: false,
                },
            ])
            .into_bytes(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".into(), layout_xml().into_bytes()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            single_rel(
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster",
                "../slideMasters/slideMaster1.xml",
            )
            .into_bytes(),
        ),
    ];

    let mut media = Vec::new();
    for (i, slide) in deck.slides.iter().enumerate() {
        let n = i + 1;
        let layout = layout_slide(slide, &deck.subtitle);
        let (xml, rels) = slide_xml(&layout, n, &mut media);
        parts.push((format!("ppt/slides/slide{n}.xml"), xml.into_bytes()));
        parts.push((format!("ppt/slides/_rels/slide{n}.xml.rels"), rels_xml(&rels).into_bytes()));
    }
    parts.extend(media.into_iter().map(|m| (m.path, m.bytes)));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)
            .map_err(|e| ExportError::Package(e.to_string()))?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Write `deck` to `dir/<stem>_deck.pptx` and return the path.
pub fn export_deck(deck: &Deck, dir: &Path) -> Result<PathBuf, ExportError> {
    let bytes = render_pptx(deck)?;
    let file_name = format!("{}_deck.pptx", file_stem(&deck.presentation_title));
    write_output(dir, &file_name, &bytes)
}
