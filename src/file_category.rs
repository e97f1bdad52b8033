/// File categorization by extension.
///
/// An [`ExtensionMap`] is an ordered table from category name to the extensions
/// that belong to it. Lookups walk the table in order and return the first
/// category containing the extension, so an extension listed under two
/// categories always resolves to the earlier one. Anything unmatched lands in
/// [`FALLBACK_CATEGORY`].
///
/// # Examples
///
/// ```
/// use tidyfold::file_category::ExtensionMap;
///
/// let map = ExtensionMap::default();
/// assert_eq!(map.category_for(".jpg"), "Images");
/// assert_eq!(map.category_for("PDF"), "Documents");
/// assert_eq!(map.category_for(".unknownext"), "Others");
/// ```
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Category name for files whose extension matches no configured category.
pub const FALLBACK_CATEGORY: &str = "Others";

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Images",
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp", ".heic"],
    ),
    (
        "Videos",
        &[".mp4", ".mkv", ".mov", ".avi", ".wmv", ".flv", ".webm"],
    ),
    (
        "Documents",
        &[
            ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".odt", ".txt", ".md",
        ],
    ),
    ("Archives", &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2"]),
    (
        "Code",
        &[
            ".py", ".js", ".ts", ".java", ".c", ".cpp", ".cs", ".html", ".css", ".go", ".rs",
        ],
    ),
    ("Music", &[".mp3", ".wav", ".flac", ".aac", ".m4a", ".ogg"]),
];

/// Normalizes an extension to the lowercase, dot-prefixed form used as lookup key.
///
/// An empty input stays empty so that extensionless files never match a category.
///
/// ```
/// use tidyfold::file_category::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(".Tar"), ".tar");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.is_empty() || trimmed == "." {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Returns the normalized extension of a path, or an empty string if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| normalize_extension(&ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Detects a file's extension from its leading bytes.
///
/// Returns `None` when the file can't be read or its format isn't recognized.
pub fn detect_extension(path: &Path) -> Option<String> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => Some(normalize_extension(kind.extension())),
        Ok(None) => None,
        Err(e) => {
            log::debug!("Could not sniff {}: {}", path.display(), e);
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CategoryEntry {
    name: String,
    extensions: Vec<String>,
}

/// Ordered mapping from category name to its set of extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMap {
    entries: Vec<CategoryEntry>,
}

impl ExtensionMap {
    /// Creates an empty map. Every lookup on it returns [`FALLBACK_CATEGORY`].
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds extensions to a category, creating the category at the end of the
    /// table if it isn't present yet. Extensions are normalized and deduplicated.
    pub fn insert<I, S>(&mut self, category: &str, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = match self.entries.iter().position(|e| e.name == category) {
            Some(index) => index,
            None => {
                self.entries.push(CategoryEntry {
                    name: category.to_string(),
                    extensions: Vec::new(),
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        for ext in extensions {
            let ext = normalize_extension(ext.as_ref());
            if !ext.is_empty() && !entry.extensions.contains(&ext) {
                entry.extensions.push(ext);
            }
        }
    }

    /// Builder-style variant of [`ExtensionMap::insert`].
    pub fn with_category<I, S>(mut self, category: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(category, extensions);
        self
    }

    /// Maps an extension to its category name.
    ///
    /// The extension is lower-cased and dot-prefixed before lookup.
    pub fn category_for(&self, extension: &str) -> &str {
        let ext = normalize_extension(extension);
        if ext.is_empty() {
            return FALLBACK_CATEGORY;
        }
        self.entries
            .iter()
            .find(|entry| entry.extensions.iter().any(|e| *e == ext))
            .map(|entry| entry.name.as_str())
            .unwrap_or(FALLBACK_CATEGORY)
    }

    /// Maps a path to its category name using the final extension.
    pub fn category_for_path(&self, path: &Path) -> &str {
        self.category_for(&extension_of(path))
    }

    /// Classifies a path, optionally sniffing the content of extensionless files.
    pub fn classify(&self, path: &Path, sniff_extensionless: bool) -> &str {
        let ext = extension_of(path);
        if ext.is_empty()
            && sniff_extensionless
            && let Some(detected) = detect_extension(path)
        {
            return self.category_for(&detected);
        }
        self.category_for(&ext)
    }

    /// Category names in lookup order, without the fallback.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Extensions configured for a category.
    pub fn extensions(&self, category: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.name == category)
            .map(|entry| entry.extensions.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExtensionMap {
    fn default() -> Self {
        let mut map = Self::empty();
        for (name, extensions) in DEFAULT_CATEGORIES {
            map.insert(name, extensions.iter());
        }
        map
    }
}

impl Serialize for ExtensionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.extensions)?;
        }
        map.end()
    }
}

struct ExtensionMapVisitor;

impl<'de> Visitor<'de> for ExtensionMapVisitor {
    type Value = ExtensionMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from category name to a list of extensions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = ExtensionMap::empty();
        while let Some((name, extensions)) = access.next_entry::<String, Vec<String>>()? {
            map.insert(&name, extensions);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ExtensionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ExtensionMapVisitor)
    }
}
