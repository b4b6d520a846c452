//! EPUB implementation of [`ContainerSplitter`].

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::escape::escape;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{EpubSplitError, Result};
use crate::package::{self, CONTAINER_PATH, ManifestItem, NCX_MEDIA_TYPE, Package};
use crate::path;
use crate::splitter::{ContainerSplitter, SplitLine};
use crate::toc::{self, TocEntry};

const MIMETYPE: &[u8] = b"application/epub+zip";
const NCX_ID: &str = "epubsplit-ncx";

/// An open EPUB whose spine can be split into standalone EPUBs.
pub struct SplitEpub<R> {
    archive: ZipArchive<R>,
    package: Package,
    lines: Vec<SplitLine>,
}

impl SplitEpub<BufReader<File>> {
    /// Open an EPUB file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> SplitEpub<R> {
    /// Read the container, package and table of contents of an EPUB.
    pub fn new(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let container = read_text(&mut archive, CONTAINER_PATH)?;
        let opf_path = package::parse_container(&container)?;
        let opf = read_text(&mut archive, &opf_path)?;
        let package = Package::parse(&opf_path, &opf)?;

        let toc = read_toc(&mut archive, &package);
        let lines = build_lines(&package, &toc);

        log::debug!(
            "Opened {} ({} spine documents, {} TOC entries)",
            opf_path,
            lines.len(),
            toc.len()
        );

        Ok(Self {
            archive,
            package,
            lines,
        })
    }

    /// Title from the package metadata.
    pub fn title(&self) -> Option<&str> {
        self.package.title.as_deref()
    }

    pub fn split_lines(&self) -> &[SplitLine] {
        &self.lines
    }

    /// Write a new EPUB holding the selected lines, titled `title`.
    pub fn write_split_epub<W: Write + Seek>(
        &mut self,
        out: W,
        indices: &[usize],
        title: &str,
    ) -> Result<W> {
        if indices.is_empty() {
            return Err(EpubSplitError::EmptySelection);
        }
        let selected: Vec<SplitLine> = indices
            .iter()
            .map(|&index| {
                self.lines
                    .get(index)
                    .cloned()
                    .ok_or(EpubSplitError::LineOutOfRange {
                        index,
                        count: self.lines.len(),
                    })
            })
            .collect::<Result<_>>()?;

        let selected_hrefs: HashSet<&str> = selected.iter().map(|l| l.href.as_str()).collect();
        let spine_hrefs: HashSet<&str> = self.lines.iter().map(|l| l.href.as_str()).collect();
        let skipped_toc: HashSet<&str> = [self.package.ncx_item(), self.package.nav_item()]
            .into_iter()
            .flatten()
            .map(|item| item.href.as_str())
            .filter(|href| !selected_hrefs.contains(href))
            .collect();

        let candidates: Vec<ManifestItem> = self
            .package
            .manifest
            .iter()
            .filter(|item| {
                let href = item.href.as_str();
                !skipped_toc.contains(href)
                    && (!spine_hrefs.contains(href) || selected_hrefs.contains(href))
            })
            .cloned()
            .collect();

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = ZipWriter::new(out);
        zip.start_file("mimetype", stored)?;
        zip.write_all(MIMETYPE)?;

        zip.start_file(CONTAINER_PATH, deflated)?;
        zip.write_all(container_xml(&self.package.path).as_bytes())?;

        let mut written: Vec<ManifestItem> = Vec::with_capacity(candidates.len());
        let mut seen: HashSet<String> = HashSet::new();
        for item in candidates {
            if !seen.insert(item.href.clone()) {
                continue;
            }
            let bytes = match read_entry(&mut self.archive, &item.href) {
                Ok(bytes) => bytes,
                Err(EpubSplitError::MissingFile(name))
                    if !selected_hrefs.contains(name.as_str()) =>
                {
                    log::warn!("Manifest item '{}' is missing from the archive", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            zip.start_file(item.href.as_str(), deflated)?;
            zip.write_all(&bytes)?;
            written.push(item);
        }

        let identifier = split_identifier(self.package.identifier.as_deref(), indices);
        let ncx_path = format!("{}toc.ncx", path::parent_dir(&self.package.path));

        zip.start_file(ncx_path.as_str(), deflated)?;
        zip.write_all(ncx_xml(&identifier, title, &selected, &ncx_path).as_bytes())?;

        let opf = opf_xml(&self.package, &identifier, title, &written, &selected, &ncx_path);
        zip.start_file(self.package.path.as_str(), deflated)?;
        zip.write_all(opf.as_bytes())?;

        log::debug!("Wrote split EPUB '{}' with {} line(s)", title, selected.len());
        Ok(zip.finish()?)
    }
}

impl<R: Read + Seek> ContainerSplitter for SplitEpub<R> {
    fn enumerate_chapters(&mut self) -> Result<Vec<SplitLine>> {
        Ok(self.lines.clone())
    }

    fn extract_chapter(&mut self, indices: &[usize], label: &str) -> Result<Vec<u8>> {
        let cursor = self.write_split_epub(Cursor::new(Vec::new()), indices, label)?;
        Ok(cursor.into_inner())
    }

    fn extension(&self) -> &'static str {
        "epub"
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(EpubSplitError::MissingFile(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let bytes = read_entry(archive, name)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Prefer the NCX, fall back to the EPUB 3 nav document. A broken table of
/// contents degrades to an empty one rather than failing the whole book.
fn read_toc<R: Read + Seek>(archive: &mut ZipArchive<R>, package: &Package) -> Vec<TocEntry> {
    let sources = [
        package.ncx_item().map(|item| (item.href.clone(), true)),
        package.nav_item().map(|item| (item.href.clone(), false)),
    ];

    for (href, is_ncx) in sources.into_iter().flatten() {
        let parsed = read_text(archive, &href).and_then(|xml| {
            if is_ncx {
                toc::parse_ncx(&href, &xml)
            } else {
                toc::parse_nav(&href, &xml)
            }
        });
        match parsed {
            Ok(entries) if !entries.is_empty() => return entries,
            Ok(_) => log::debug!("Table of contents {} has no entries", href),
            Err(e) => log::warn!("Ignoring unreadable table of contents {}: {}", href, e),
        }
    }

    Vec::new()
}

fn build_lines(package: &Package, toc: &[TocEntry]) -> Vec<SplitLine> {
    package
        .spine_items()
        .into_iter()
        .map(|item| {
            let entries: Vec<&TocEntry> = toc.iter().filter(|e| e.href == item.href).collect();
            SplitLine {
                href: item.href.clone(),
                anchor: entries.first().and_then(|e| e.anchor.clone()),
                toc: entries.iter().map(|e| e.label.clone()).collect(),
            }
        })
        .collect()
}

fn split_identifier(original: Option<&str>, indices: &[usize]) -> String {
    let suffix: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    format!("{}-split-{}", original.unwrap_or("epubsplit"), suffix.join("-"))
}

fn container_xml(opf_path: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#,
        escape(opf_path)
    )
}

fn opf_xml(
    package: &Package,
    identifier: &str,
    title: &str,
    items: &[ManifestItem],
    selected: &[SplitLine],
    ncx_path: &str,
) -> String {
    let opf_path = package.path.as_str();
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );
    xml.push_str(&format!("    <dc:title>{}</dc:title>\n", escape(title)));
    for creator in &package.creators {
        xml.push_str(&format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>\n",
            escape(creator)
        ));
    }
    xml.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape(package.language.as_deref().unwrap_or("en"))
    ));
    xml.push_str(&format!(
        "    <dc:identifier id=\"bookid\">{}</dc:identifier>\n",
        escape(identifier)
    ));
    xml.push_str("  </metadata>\n  <manifest>\n");
    xml.push_str(&format!(
        "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
        NCX_ID,
        escape(&path::to_href(&path::relative_to(opf_path, ncx_path))),
        NCX_MEDIA_TYPE
    ));
    for item in items {
        xml.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            escape(&item.id),
            escape(&path::to_href(&path::relative_to(opf_path, &item.href))),
            escape(&item.media_type)
        ));
    }
    xml.push_str(&format!("  </manifest>\n  <spine toc=\"{}\">\n", NCX_ID));
    for line in selected {
        if let Some(item) = items.iter().find(|item| item.href == line.href) {
            xml.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape(&item.id)));
        }
    }
    xml.push_str("  </spine>\n</package>\n");
    xml
}

fn ncx_xml(identifier: &str, title: &str, selected: &[SplitLine], ncx_path: &str) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    xml.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape(identifier)
    ));
    xml.push_str(
        r#"    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
"#,
    );
    xml.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape(title)
    ));
    for (order, line) in selected.iter().enumerate() {
        let label = line.toc.first().map(String::as_str).unwrap_or(title);
        let mut src = path::to_href(&path::relative_to(ncx_path, &line.href));
        if let Some(anchor) = &line.anchor {
            src.push('#');
            src.push_str(anchor);
        }
        xml.push_str(&format!(
            "    <navPoint id=\"navpoint-{n}\" playOrder=\"{n}\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
            escape(label),
            escape(&src),
            n = order + 1
        ));
    }
    xml.push_str("  </navMap>\n</ncx>\n");
    xml
}
