//! Builder for small, valid EPUB files.
//!
//! Used by tests and for trying the splitter without a real book at hand.

use std::io::{Cursor, Write};
use std::path::Path;

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Which table of contents the generated book carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TocStyle {
    /// EPUB 2 package with a `toc.ncx`
    #[default]
    Ncx,
    /// EPUB 3 package with a navigation document
    Nav,
    /// No table of contents at all
    None,
}

#[derive(Debug, Clone)]
struct SampleChapter {
    title: Option<String>,
    sections: Vec<String>,
    body: String,
}

/// A book description that can be rendered to EPUB bytes.
#[derive(Debug, Clone)]
pub struct SampleEpub {
    title: String,
    author: Option<String>,
    chapters: Vec<SampleChapter>,
    toc_style: TocStyle,
}

impl SampleEpub {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            author: None,
            chapters: Vec::new(),
            toc_style: TocStyle::default(),
        }
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn toc_style(mut self, style: TocStyle) -> Self {
        self.toc_style = style;
        self
    }

    /// Add a chapter listed in the table of contents.
    pub fn chapter(mut self, title: &str, body: &str) -> Self {
        self.chapters.push(SampleChapter {
            title: Some(title.to_string()),
            sections: Vec::new(),
            body: body.to_string(),
        });
        self
    }

    /// Add a chapter whose sections appear as nested, anchored TOC entries.
    pub fn chapter_with_sections(mut self, title: &str, sections: &[&str]) -> Self {
        self.chapters.push(SampleChapter {
            title: Some(title.to_string()),
            sections: sections.iter().map(|s| s.to_string()).collect(),
            body: String::new(),
        });
        self
    }

    /// Add a chapter that has no table of contents entry.
    pub fn untitled_chapter(mut self, body: &str) -> Self {
        self.chapters.push(SampleChapter {
            title: None,
            sections: Vec::new(),
            body: body.to_string(),
        });
        self
    }

    /// Render the book as EPUB bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#,
        )?;

        zip.start_file("OEBPS/Styles/style.css", deflated)?;
        zip.write_all(b"body { font-family: serif; }\n")?;

        for (i, chapter) in self.chapters.iter().enumerate() {
            zip.start_file(format!("OEBPS/Text/{}", chapter_file(i)), deflated)?;
            zip.write_all(chapter_xhtml(chapter).as_bytes())?;
        }

        match self.toc_style {
            TocStyle::Ncx => {
                zip.start_file("OEBPS/toc.ncx", deflated)?;
                zip.write_all(self.ncx().as_bytes())?;
            }
            TocStyle::Nav => {
                zip.start_file("OEBPS/nav.xhtml", deflated)?;
                zip.write_all(self.nav().as_bytes())?;
            }
            TocStyle::None => {}
        }

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(self.opf().as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }

    /// Render the book and write it to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.build()?)?;
        Ok(())
    }

    fn opf(&self) -> String {
        let version = if self.toc_style == TocStyle::Nav { "3.0" } else { "2.0" };
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{}" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
"#,
            version,
            escape(&self.title)
        );
        if let Some(author) = &self.author {
            xml.push_str(&format!("    <dc:creator>{}</dc:creator>\n", escape(author)));
        }
        xml.push_str("    <dc:language>en</dc:language>\n");
        xml.push_str("    <dc:identifier id=\"uid\">urn:uuid:sample-epub</dc:identifier>\n");
        xml.push_str("  </metadata>\n  <manifest>\n");
        xml.push_str("    <item id=\"css\" href=\"Styles/style.css\" media-type=\"text/css\"/>\n");
        match self.toc_style {
            TocStyle::Ncx => xml.push_str(
                "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
            ),
            TocStyle::Nav => xml.push_str(
                "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
            ),
            TocStyle::None => {}
        }
        for i in 0..self.chapters.len() {
            xml.push_str(&format!(
                "    <item id=\"ch{}\" href=\"Text/{}\" media-type=\"application/xhtml+xml\"/>\n",
                i + 1,
                chapter_file(i)
            ));
        }
        xml.push_str("  </manifest>\n");
        if self.toc_style == TocStyle::Ncx {
            xml.push_str("  <spine toc=\"ncx\">\n");
        } else {
            xml.push_str("  <spine>\n");
        }
        for i in 0..self.chapters.len() {
            xml.push_str(&format!("    <itemref idref=\"ch{}\"/>\n", i + 1));
        }
        xml.push_str("  </spine>\n</package>\n");
        xml
    }

    fn ncx(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:sample-epub"/></head>
  <docTitle><text>{}</text></docTitle>
  <navMap>
"#,
            escape(&self.title)
        );
        let mut order = 0;
        for (i, chapter) in self.chapters.iter().enumerate() {
            let Some(title) = &chapter.title else { continue };
            order += 1;
            xml.push_str(&format!(
                "    <navPoint id=\"np{order}\" playOrder=\"{order}\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"Text/{}\"/>\n",
                escape(title),
                chapter_file(i)
            ));
            for (s, section) in chapter.sections.iter().enumerate() {
                order += 1;
                xml.push_str(&format!(
                    "      <navPoint id=\"np{order}\" playOrder=\"{order}\">\n        <navLabel><text>{}</text></navLabel>\n        <content src=\"Text/{}#sec-{}\"/>\n      </navPoint>\n",
                    escape(section),
                    chapter_file(i),
                    s + 1
                ));
            }
            xml.push_str("    </navPoint>\n");
        }
        xml.push_str("  </navMap>\n</ncx>\n");
        xml
    }

    fn nav(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Contents</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <ol>
"#,
        );
        for (i, chapter) in self.chapters.iter().enumerate() {
            let Some(title) = &chapter.title else { continue };
            xml.push_str(&format!(
                "      <li><a href=\"Text/{}\">{}</a>",
                chapter_file(i),
                escape(title)
            ));
            if !chapter.sections.is_empty() {
                xml.push_str("\n        <ol>\n");
                for (s, section) in chapter.sections.iter().enumerate() {
                    xml.push_str(&format!(
                        "          <li><a href=\"Text/{}#sec-{}\">{}</a></li>\n",
                        chapter_file(i),
                        s + 1,
                        escape(section)
                    ));
                }
                xml.push_str("        </ol>\n      ");
            }
            xml.push_str("</li>\n");
        }
        xml.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
        xml
    }
}

fn chapter_file(index: usize) -> String {
    format!("chapter-{:03}.xhtml", index + 1)
}

fn chapter_xhtml(chapter: &SampleChapter) -> String {
    let mut body = String::new();
    if let Some(title) = &chapter.title {
        body.push_str(&format!("  <h1>{}</h1>\n", escape(title)));
    }
    if !chapter.body.is_empty() {
        body.push_str(&format!("  <p>{}</p>\n", escape(&chapter.body)));
    }
    for (s, section) in chapter.sections.iter().enumerate() {
        body.push_str(&format!(
            "  <h2 id=\"sec-{}\">{}</h2>\n  <p>Text of {}.</p>\n",
            s + 1,
            escape(section),
            escape(section)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="../Styles/style.css"/>
</head>
<body>
{}</body>
</html>
"#,
        escape(chapter.title.as_deref().unwrap_or("Untitled")),
        body
    )
}
