//! OCF container and OPF package parsing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

use crate::error::{EpubSplitError, Result};
use crate::path;

pub(crate) const CONTAINER_PATH: &str = "META-INF/container.xml";
pub(crate) const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// One `<item>` of the package manifest, with `href` resolved from the archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_whitespace().any(|p| p == name))
    }
}

/// The parts of an OPF package document needed to enumerate and re-package chapters.
#[derive(Debug, Clone, Default)]
pub(crate) struct Package {
    /// Archive path of the OPF document itself
    pub path: String,
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub manifest: Vec<ManifestItem>,
    /// Spine idrefs in reading order
    pub spine: Vec<String>,
    /// Manifest id named by `<spine toc="...">`
    pub toc_id: Option<String>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// The EPUB 2 NCX, located through the spine attribute or by media type.
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.toc_id
            .as_deref()
            .and_then(|id| self.item(id))
            .or_else(|| self.manifest.iter().find(|item| item.media_type == NCX_MEDIA_TYPE))
    }

    /// The EPUB 3 navigation document.
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.has_property("nav"))
    }

    /// Manifest entries for the spine, skipping idrefs that point nowhere.
    pub fn spine_items(&self) -> Vec<&ManifestItem> {
        self.spine
            .iter()
            .filter_map(|idref| {
                let item = self.item(idref);
                if item.is_none() {
                    log::warn!("Spine references unknown manifest id '{}'", idref);
                }
                item
            })
            .collect()
    }

    /// Parse an OPF document stored at `path`.
    pub fn parse(path: &str, xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut package = Package {
            path: path.to_string(),
            ..Default::default()
        };

        let mut in_metadata = false;
        let mut capture: Option<MetadataField> = None;
        let mut text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"metadata" => in_metadata = true,
                    b"item" => package.push_item(path, &e),
                    b"spine" => package.toc_id = attribute(&e, b"toc"),
                    b"itemref" => package.push_itemref(&e),
                    name if in_metadata => {
                        capture = MetadataField::from_local_name(name);
                        text.clear();
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"item" => package.push_item(path, &e),
                    b"spine" => package.toc_id = attribute(&e, b"toc"),
                    b"itemref" => package.push_itemref(&e),
                    _ => {}
                },
                Ok(Event::Text(e)) if capture.is_some() => {
                    text.push_str(&text_content(&e));
                }
                Ok(Event::CData(e)) if capture.is_some() => {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"metadata" => in_metadata = false,
                    _ => {
                        if let Some(field) = capture.take() {
                            package.set_metadata(field, collapse_whitespace(&text));
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(EpubSplitError::xml(path, e)),
                _ => {}
            }
            buf.clear();
        }

        if package.spine.is_empty() {
            return Err(EpubSplitError::InvalidStructure(format!(
                "{} has an empty spine",
                path
            )));
        }

        Ok(package)
    }

    fn push_item(&mut self, opf_path: &str, e: &BytesStart) {
        let (Some(id), Some(href)) = (attribute(e, b"id"), attribute(e, b"href")) else {
            log::warn!("Skipping manifest item without id or href");
            return;
        };
        let (href, _) = path::resolve(opf_path, &href);
        self.manifest.push(ManifestItem {
            id,
            href,
            media_type: attribute(e, b"media-type").unwrap_or_default(),
            properties: attribute(e, b"properties"),
        });
    }

    fn push_itemref(&mut self, e: &BytesStart) {
        if let Some(idref) = attribute(e, b"idref") {
            self.spine.push(idref);
        }
    }

    fn set_metadata(&mut self, field: MetadataField, value: String) {
        if value.is_empty() {
            return;
        }
        match field {
            MetadataField::Title => {
                self.title.get_or_insert(value);
            }
            MetadataField::Creator => self.creators.push(value),
            MetadataField::Language => {
                self.language.get_or_insert(value);
            }
            MetadataField::Identifier => {
                self.identifier.get_or_insert(value);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MetadataField {
    Title,
    Creator,
    Language,
    Identifier,
}

impl MetadataField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"creator" => Some(Self::Creator),
            b"language" => Some(Self::Language),
            b"identifier" => Some(Self::Identifier),
            _ => None,
        }
    }
}

/// Read the OPF location out of `META-INF/container.xml`.
pub(crate) fn parse_container(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(full_path) = attribute(&e, b"full-path") {
                    return Ok(path::normalize(&full_path));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(EpubSplitError::xml(CONTAINER_PATH, e)),
            _ => {}
        }
        buf.clear();
    }

    Err(EpubSplitError::InvalidStructure(
        "container.xml names no rootfile".to_string(),
    ))
}

/// Value of the attribute whose local name is `name`, unescaped.
pub(crate) fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Unescaped text, tolerating the HTML entities XHTML content tends to carry.
pub(crate) fn text_content(e: &BytesText) -> String {
    match e.unescape() {
        Ok(value) => value.into_owned(),
        Err(_) => String::from_utf8_lossy(e).replace("&nbsp;", " "),
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
