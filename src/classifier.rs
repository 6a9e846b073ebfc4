//! File classification for organizing files into category folders.
//!
//! A file is labelled by the first matching tier:
//!
//! 1. its extension appears in the media table (images, videos, audio, archives),
//! 2. its lowercased stem contains a keyword from the rule table (resumes, invoices, ...),
//! 3. its extension appears in the fallback-group table (documents, spreadsheets, ...),
//! 4. otherwise `Misc_<EXT>` for files with an extension, or `Misc_Files`.
//!
//! # Examples
//!
//! ```
//! use smart_organizer::classifier::{Classifier, FileDescriptor};
//!
//! let classifier = Classifier::default();
//! assert_eq!(classifier.classify(&FileDescriptor::new("beach.JPG")).as_str(), "Images");
//! assert_eq!(classifier.classify(&FileDescriptor::new("My_Resume_2023.pdf")).as_str(), "Resumes");
//! assert_eq!(classifier.classify(&FileDescriptor::new("notes.txt")).as_str(), "Misc_Documents");
//! assert_eq!(classifier.classify(&FileDescriptor::new("data.xyz")).as_str(), "Misc_XYZ");
//! assert_eq!(classifier.classify(&FileDescriptor::new("LICENSE")).as_str(), "Misc_Files");
//! ```

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Label used for files that have no extension and match no rule.
pub const FALLBACK_LABEL: &str = "Misc_Files";

/// Prefix of the generic per-extension label.
const MISC_PREFIX: &str = "Misc_";

/// A category label, which is also the name of the category folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label, which doubles as the directory name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of a file in the source directory.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    path: PathBuf,
    name: String,
    stem: String,
    extension: Option<String>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty());

        Self {
            path,
            name,
            stem,
            extension,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full file name, including the extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Extension without the leading dot, in its original case.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// File name exactly as stored on disk.
    pub fn os_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }

    /// Extension exactly as stored on disk.
    pub fn os_extension(&self) -> Option<&OsStr> {
        self.path.extension().filter(|e| !e.is_empty())
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    /// Creation time of the file in local time.
    ///
    /// Falls back to the modification time on filesystems without birth
    /// times, and to the current time when neither is available.
    pub fn created(&self) -> io::Result<DateTime<Local>> {
        let metadata = self.path.metadata()?;
        let time = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());
        Ok(time)
    }

    /// Opens the file for streaming its content.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

/// Ordered table of category label to lowercase extensions.
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    groups: Vec<(Category, HashSet<String>)>,
}

impl ExtensionTable {
    /// Adds a group. Extensions are given without the leading dot.
    pub fn with_group(mut self, label: &str, extensions: &[&str]) -> Self {
        let extensions = extensions.iter().map(|e| e.to_lowercase()).collect();
        self.groups.push((Category::new(label), extensions));
        self
    }

    /// Media types: the strongest signal, checked before keywords.
    pub fn media() -> Self {
        Self::default()
            .with_group("Images", &["jpg", "jpeg", "png", "heic", "gif", "webp"])
            .with_group("Videos", &["mp4", "mov", "avi", "mkv", "flv"])
            .with_group("Audio", &["mp3", "wav", "aac", "m4a", "flac"])
            .with_group("Archives", &["zip", "rar", "7z", "dmg", "iso"])
    }

    /// Known document types that matched no keyword.
    pub fn fallback_groups() -> Self {
        Self::default()
            .with_group("Misc_Notebooks", &["ipynb"])
            .with_group("Misc_Presentations", &["ppt", "pptx", "key", "odp"])
            .with_group("Misc_Documents", &["doc", "docx", "odt", "rtf", "txt"])
            .with_group("Misc_Spreadsheets", &["xls", "xlsx", "csv"])
    }

    /// Exact lookup of a lowercase extension.
    pub fn lookup(&self, extension: &str) -> Option<&Category> {
        self.groups
            .iter()
            .find(|(_, extensions)| extensions.contains(extension))
            .map(|(category, _)| category)
    }
}

/// Ordered table of category label to filename keywords.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<(Category, Vec<String>)>,
}

impl RuleTable {
    /// Adds a rule. Keywords are matched case-insensitively.
    pub fn with_rule(mut self, label: &str, keywords: &[&str]) -> Self {
        let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.rules.push((Category::new(label), keywords));
        self
    }

    /// The built-in document rules.
    pub fn standard() -> Self {
        Self::default()
            .with_rule("Resumes", &["resume", "cv", "bio", "profile", "curriculum"])
            .with_rule("Invoices", &["invoice", "bill", "receipt", "payment"])
            .with_rule("Transcripts", &["transcript", "marksheet", "grade", "score"])
            .with_rule("Contracts", &["agreement", "contract", "offer", "nda"])
            .with_rule("Tax_Docs", &["w2", "1099", "tax", "return"])
    }

    /// Returns the first rule with a keyword contained in `name`.
    ///
    /// `name` must already be lowercased.
    pub fn match_name(&self, name: &str) -> Option<&Category> {
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(category, _)| category)
    }
}

/// Maps files to category labels. Tables are fixed at construction.
#[derive(Debug, Clone)]
pub struct Classifier {
    media: ExtensionTable,
    keywords: RuleTable,
    fallback: ExtensionTable,
}

impl Classifier {
    pub fn new(media: ExtensionTable, keywords: RuleTable, fallback: ExtensionTable) -> Self {
        Self {
            media,
            keywords,
            fallback,
        }
    }

    /// Determines the category for a file. Never fails.
    pub fn classify(&self, file: &FileDescriptor) -> Category {
        let extension = file.extension().map(str::to_lowercase);

        if let Some(ext) = extension.as_deref()
            && let Some(category) = self.media.lookup(ext)
        {
            return category.clone();
        }

        if let Some(category) = self.keywords.match_name(&file.stem().to_lowercase()) {
            return category.clone();
        }

        if let Some(ext) = extension.as_deref()
            && let Some(category) = self.fallback.lookup(ext)
        {
            return category.clone();
        }

        match extension {
            Some(ext) => Category::new(format!("{}{}", MISC_PREFIX, ext.to_uppercase())),
            None => Category::new(FALLBACK_LABEL),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            ExtensionTable::media(),
            RuleTable::standard(),
            ExtensionTable::fallback_groups(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> String {
        Classifier::default()
            .classify(&FileDescriptor::new(name))
            .as_str()
            .to_string()
    }

    #[test]
    fn test_media_extensions() {
        assert_eq!(classify("photo.png"), "Images");
        assert_eq!(classify("clip.MKV"), "Videos");
        assert_eq!(classify("song.m4a"), "Audio");
        assert_eq!(classify("installer.dmg"), "Archives");
    }

    #[test]
    fn test_media_wins_over_keywords() {
        assert_eq!(classify("resume_headshot.jpg"), "Images");
        assert_eq!(classify("invoice_scans.zip"), "Archives");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(classify("My_Resume_2023.pdf"), "Resumes");
        assert_eq!(classify("INVOICE-42.docx"), "Invoices");
        assert_eq!(classify("Final_Transcript.pdf"), "Transcripts");
        assert_eq!(classify("signed_NDA.pdf"), "Contracts");
        assert_eq!(classify("W2_2024.pdf"), "Tax_Docs");
    }

    #[test]
    fn test_keywords_win_over_fallback_groups() {
        assert_eq!(classify("payment_plan.xlsx"), "Invoices");
        assert_eq!(classify("notes.txt"), "Misc_Documents");
    }

    #[test]
    fn test_keywords_ignore_extension() {
        // "tax" only appears in the extension
        assert_eq!(classify("report.tax"), "Misc_TAX");
    }

    #[test]
    fn test_rule_order_decides_overlaps() {
        // Both "resume" and "invoice" match; Resumes is declared first
        assert_eq!(classify("resume_invoice.pdf"), "Resumes");
    }

    #[test]
    fn test_fallback_groups() {
        assert_eq!(classify("analysis.ipynb"), "Misc_Notebooks");
        assert_eq!(classify("slides.pptx"), "Misc_Presentations");
        assert_eq!(classify("table.CSV"), "Misc_Spreadsheets");
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(classify("data.xyz"), "Misc_XYZ");
        assert_eq!(classify("archive.tar.gz"), "Misc_GZ");
        assert_eq!(classify("Makefile"), FALLBACK_LABEL);
        assert_eq!(classify("trailing."), FALLBACK_LABEL);
    }

    #[test]
    fn test_descriptor_accessors() {
        let file = FileDescriptor::new("/tmp/base/Report.Final.PDF");
        assert_eq!(file.name(), "Report.Final.PDF");
        assert_eq!(file.stem(), "Report.Final");
        assert_eq!(file.extension(), Some("PDF"));
        assert!(!file.is_hidden());
        assert!(FileDescriptor::new(".DS_Store").is_hidden());
    }

    #[test]
    fn test_custom_tables() {
        let classifier = Classifier::new(
            ExtensionTable::default().with_group("Fonts", &["TTF"]),
            RuleTable::default().with_rule("Receipts", &["Receipt"]),
            ExtensionTable::default(),
        );
        assert_eq!(
            classifier.classify(&FileDescriptor::new("a.ttf")).as_str(),
            "Fonts"
        );
        assert_eq!(
            classifier
                .classify(&FileDescriptor::new("RECEIPT_1.pdf"))
                .as_str(),
            "Receipts"
        );
    }
}
