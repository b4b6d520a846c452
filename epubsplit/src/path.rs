//! Archive path arithmetic.
//!
//! EPUB references are relative to the document that contains them, while ZIP
//! entries are addressed from the archive root. Everything inside this crate
//! works on root-relative, normalized paths and converts back to relative
//! references only when writing a new package.

use std::borrow::Cow;

/// Directory part of an archive path including the trailing slash, or `""`
/// for entries at the archive root.
pub(crate) fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Resolve `href` against the document at `base`, splitting off the fragment.
///
/// The path part is percent-decoded so it matches archive entry names. An
/// href made of only a fragment refers to `base` itself.
pub(crate) fn resolve(base: &str, href: &str) -> (String, Option<String>) {
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment.to_string()).filter(|f| !f.is_empty())),
        None => (href, None),
    };
    let path = decode(path);

    let joined = if path.is_empty() {
        base.to_string()
    } else if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("{}{}", parent_dir(base), path)
    };

    (normalize(&joined), fragment)
}

/// Collapse `.` and `..` segments and duplicate slashes.
pub(crate) fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn decode(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(_) => {
            log::warn!("Keeping href '{}' as written: not valid UTF-8 once decoded", path);
            Cow::Borrowed(path)
        }
    }
}

/// Percent-encode each segment of a relative archive path for use as an href.
pub(crate) fn to_href(relative: &str) -> String {
    relative
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Express the root-relative `target` as a reference from the document `base`.
pub(crate) fn relative_to(base: &str, target: &str) -> String {
    let base_dirs: Vec<&str> = parent_dir(base)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let target_parts: Vec<&str> = target.split('/').collect();
    let (target_dirs, file) = target_parts.split_at(target_parts.len().saturating_sub(1));

    let common = base_dirs
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", base_dirs.len() - common));
    parts.extend(&target_dirs[common..]);
    parts.extend(file);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/content.opf"), "OEBPS/");
        assert_eq!(parent_dir("content.opf"), "");
        assert_eq!(parent_dir("a/b/c.xhtml"), "a/b/");
    }

    #[test]
    fn test_resolve_relative_href() {
        assert_eq!(
            resolve("OEBPS/content.opf", "Text/ch1.xhtml"),
            ("OEBPS/Text/ch1.xhtml".to_string(), None)
        );
        assert_eq!(
            resolve("OEBPS/Text/nav.xhtml", "../Text/ch1.xhtml#sec"),
            ("OEBPS/Text/ch1.xhtml".to_string(), Some("sec".to_string()))
        );
    }

    #[test]
    fn test_resolve_fragment_only() {
        assert_eq!(
            resolve("OEBPS/ch1.xhtml", "#top"),
            ("OEBPS/ch1.xhtml".to_string(), Some("top".to_string()))
        );
        assert_eq!(
            resolve("OEBPS/ch1.xhtml", "ch2.xhtml#"),
            ("OEBPS/ch2.xhtml".to_string(), None)
        );
    }

    #[test]
    fn test_resolve_decodes_percent_escapes() {
        assert_eq!(
            resolve("OEBPS/content.opf", "Text/chapter%20one.xhtml#a%20b"),
            ("OEBPS/Text/chapter one.xhtml".to_string(), Some("a%20b".to_string()))
        );
        assert_eq!(
            resolve("OEBPS/content.opf", "Text/bad%FF.xhtml"),
            ("OEBPS/Text/bad%FF.xhtml".to_string(), None)
        );
    }

    #[test]
    fn test_to_href_encodes_segments() {
        assert_eq!(to_href("../Text/chapter one.xhtml"), "../Text/chapter%20one.xhtml");
        assert_eq!(to_href("Text/ch1.xhtml"), "Text/ch1.xhtml");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a/./b/../c.xhtml"), "a/c.xhtml");
        assert_eq!(normalize("/a//b.css"), "a/b.css");
        assert_eq!(normalize("../x.css"), "x.css");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("OEBPS/content.opf", "OEBPS/Text/ch1.xhtml"), "Text/ch1.xhtml");
        assert_eq!(relative_to("OEBPS/content.opf", "Images/cover.jpg"), "../Images/cover.jpg");
        assert_eq!(relative_to("content.opf", "ch1.xhtml"), "ch1.xhtml");
        assert_eq!(relative_to("OEBPS/Text/a.xhtml", "OEBPS/Styles/s.css"), "../Styles/s.css");
    }
}
