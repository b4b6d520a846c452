//! Table of contents parsing: EPUB 2 NCX `navMap` and EPUB 3 `nav` documents.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{EpubSplitError, Result};
use crate::package::{attribute, collapse_whitespace, text_content};
use crate::path;

/// One navigable entry, flattened in depth-first document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TocEntry {
    pub label: String,
    /// Archive path of the target document
    pub href: String,
    pub anchor: Option<String>,
}

#[derive(Default)]
struct PendingEntry {
    label: String,
    src: Option<String>,
}

/// Parse the `navMap` of an NCX document stored at `ncx_path`.
pub(crate) fn parse_ncx(ncx_path: &str, xml: &str) -> Result<Vec<TocEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut pending: Vec<PendingEntry> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_nav_map = false;
    let mut in_label = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"navMap" => in_nav_map = true,
                b"navPoint" if in_nav_map => {
                    open.push(pending.len());
                    pending.push(PendingEntry::default());
                }
                b"navLabel" if !open.is_empty() => in_label = true,
                b"content" => set_src(&mut pending, &open, attribute(&e, b"src")),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"content" => {
                set_src(&mut pending, &open, attribute(&e, b"src"));
            }
            Ok(Event::Text(e)) if in_label => {
                if let Some(&current) = open.last() {
                    push_text(&mut pending[current].label, &text_content(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"navMap" => in_nav_map = false,
                b"navPoint" => {
                    open.pop();
                }
                b"navLabel" => in_label = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(EpubSplitError::xml(ncx_path, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(finish(ncx_path, pending))
}

/// Parse the `<nav epub:type="toc">` list of an EPUB 3 navigation document.
pub(crate) fn parse_nav(nav_path: &str, xml: &str) -> Result<Vec<TocEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    // XHTML nav documents routinely use HTML entities and void elements.
    reader.check_end_names(false);

    let mut pending: Vec<PendingEntry> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut nav_depth = 0usize;
    let mut toc_nav_depth: Option<usize> = None;
    // Open `<a>` elements plus a `<span>` heading an entry; text counts while > 0.
    let mut label_depth = 0usize;
    // Nesting of `<span>`s inside the toc nav, and the level of the labelling one.
    let mut span_depth = 0usize;
    let mut label_span: Option<usize> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"nav" => {
                    nav_depth += 1;
                    let is_toc = attribute(&e, b"type")
                        .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"));
                    if is_toc && toc_nav_depth.is_none() {
                        toc_nav_depth = Some(nav_depth);
                    }
                }
                _ if toc_nav_depth.is_none() => {}
                b"li" => {
                    open.push(pending.len());
                    pending.push(PendingEntry::default());
                }
                b"a" => {
                    set_src(&mut pending, &open, attribute(&e, b"href"));
                    label_depth += 1;
                }
                b"span" => {
                    if label_depth == 0 && !open.is_empty() {
                        label_span = Some(span_depth);
                        label_depth += 1;
                    }
                    span_depth += 1;
                }
                _ => {}
            },
            Ok(Event::Text(e)) if label_depth > 0 => {
                if let Some(&current) = open.last() {
                    push_text(&mut pending[current].label, &text_content(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"nav" => {
                    if toc_nav_depth == Some(nav_depth) {
                        toc_nav_depth = None;
                        // Only the first toc nav is read.
                        if !pending.is_empty() {
                            break;
                        }
                    }
                    nav_depth = nav_depth.saturating_sub(1);
                }
                _ if toc_nav_depth.is_none() => {}
                b"li" => {
                    open.pop();
                }
                b"a" => label_depth = label_depth.saturating_sub(1),
                b"span" => {
                    span_depth = span_depth.saturating_sub(1);
                    if label_span == Some(span_depth) {
                        label_span = None;
                        label_depth = label_depth.saturating_sub(1);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(EpubSplitError::xml(nav_path, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(finish(nav_path, pending))
}

fn set_src(pending: &mut [PendingEntry], open: &[usize], src: Option<String>) {
    if let (Some(&current), Some(src)) = (open.last(), src) {
        pending[current].src.get_or_insert(src);
    }
}

fn push_text(label: &mut String, text: &str) {
    if !label.is_empty() {
        label.push(' ');
    }
    label.push_str(text);
}

/// Drop entries without a target or label and resolve targets from `doc_path`.
fn finish(doc_path: &str, pending: Vec<PendingEntry>) -> Vec<TocEntry> {
    pending
        .into_iter()
        .filter_map(|entry| {
            let src = entry.src?;
            let label = collapse_whitespace(&entry.label);
            if label.is_empty() {
                return None;
            }
            let (href, anchor) = path::resolve(doc_path, &src);
            Some(TocEntry {
                label,
                href,
                anchor,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="x"/></head>
  <docTitle><text>Ignored Title</text></docTitle>
  <navMap>
    <navPoint id="p1" playOrder="1">
      <navLabel><text>Part One</text></navLabel>
      <content src="Text/ch1.xhtml"/>
      <navPoint id="p2" playOrder="2">
        <navLabel><text>Section &amp; More</text></navLabel>
        <content src="Text/ch1.xhtml#sec-1"/>
      </navPoint>
    </navPoint>
    <navPoint id="p3" playOrder="3">
      <navLabel><text>
        Chapter
        Two
      </text></navLabel>
      <content src="Text/ch2.xhtml"/>
    </navPoint>
    <navPoint id="p4" playOrder="4">
      <navLabel><text></text></navLabel>
      <content src="Text/ch3.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

    #[test]
    fn test_parse_ncx_flattens_in_document_order() {
        let entries = parse_ncx("OEBPS/toc.ncx", NCX).unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Part One", "Section & More", "Chapter Two"]);
    }

    #[test]
    fn test_parse_ncx_resolves_targets() {
        let entries = parse_ncx("OEBPS/toc.ncx", NCX).unwrap();
        assert_eq!(entries[0].href, "OEBPS/Text/ch1.xhtml");
        assert_eq!(entries[0].anchor, None);
        assert_eq!(entries[1].href, "OEBPS/Text/ch1.xhtml");
        assert_eq!(entries[1].anchor.as_deref(), Some("sec-1"));
    }

    #[test]
    fn test_parse_nav() {
        let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Nav</title></head>
<body>
  <nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="Text/ch1.xhtml">Chapter <em>One</em></a>
        <ol>
          <li><a href="Text/ch1.xhtml#s1">Opening</a></li>
        </ol>
      </li>
      <li><span>Unlinked heading</span></li>
      <li><a href="Text/ch2.xhtml">Chapter&nbsp;Two</a></li>
      <li><a href="Text/ch3.xhtml"><span class="num">3.</span> The <span>Third</span> One</a></li>
      <li><span><span class="num">4.</span> Part Four</span>
        <ol><li><a href="Text/ch4.xhtml">Opening of four</a></li></ol>
      </li>
    </ol>
  </nav>
</body>
</html>"#;
        let entries = parse_nav("EPUB/nav.xhtml", nav).unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Chapter One",
                "Opening",
                "Chapter Two",
                "3. The Third One",
                "Opening of four"
            ]
        );
        assert_eq!(entries[0].href, "EPUB/Text/ch1.xhtml");
        assert_eq!(entries[1].anchor.as_deref(), Some("s1"));
        assert_eq!(entries[2].href, "EPUB/Text/ch2.xhtml");
    }

    #[test]
    fn test_parse_ncx_malformed() {
        let ncx = "<ncx><navMap><navPoint></navMap></ncx>";
        assert!(parse_ncx("toc.ncx", ncx).is_err());
    }
}
