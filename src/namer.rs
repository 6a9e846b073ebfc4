//! Collision-free destination names.
//!
//! Organized files are renamed to `<Prefix>_<YYYY-MM-DD>_<NN><.ext>`, where the
//! sequence starts at `01` and increases until the candidate is free.
//! Quarantined duplicates keep their name, or become `Duplicate_<n>_<name>`
//! when that name is taken.
//!
//! ```
//! use chrono::NaiveDate;
//! use std::ffi::OsStr;
//! use smart_organizer::classifier::Category;
//! use smart_organizer::namer::{quarantine_name, standard_name};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
//! let pdf = OsStr::new("pdf");
//! let name = standard_name(&Category::new("Resumes"), date, Some(pdf), |c| {
//!     c == "Resume_2024-03-09_01.pdf"
//! });
//! assert_eq!(name, "Resume_2024-03-09_02.pdf");
//!
//! assert_eq!(quarantine_name(OsStr::new("bill.pdf"), |_| false), "bill.pdf");
//! ```

use crate::classifier::Category;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};

/// Categories shorter than this keep their trailing "s".
const SINGULARIZE_MIN_LEN: usize = 5;

/// Short prefixes for the media categories.
const PREFIX_OVERRIDES: &[(&str, &str)] = &[("Images", "Img"), ("Videos", "Vid"), ("Audio", "Aud")];

/// Derives the file name prefix for a category.
///
/// Media categories use a fixed short form. Any other label ending in a
/// lowercase `s` and at least five characters long loses that `s`
/// (`Resumes` → `Resume`); everything else is used as is.
pub fn prefix_for(category: &Category) -> Cow<'_, str> {
    let label = category.as_str();

    if let Some((_, prefix)) = PREFIX_OVERRIDES.iter().find(|(name, _)| *name == label) {
        return Cow::Borrowed(*prefix);
    }

    match label.strip_suffix('s') {
        Some(singular) if label.chars().count() >= SINGULARIZE_MIN_LEN => Cow::Borrowed(singular),
        _ => Cow::Borrowed(label),
    }
}

/// Returns the first free `<Prefix>_<date>_<NN><.ext>` name.
///
/// `occupied` is asked about each candidate file name in turn. The extension
/// is carried over byte for byte, so names that are not valid UTF-8 survive.
pub fn standard_name(
    category: &Category,
    date: NaiveDate,
    extension: Option<&OsStr>,
    mut occupied: impl FnMut(&OsStr) -> bool,
) -> OsString {
    let prefix = prefix_for(category);
    let date = date.format("%Y-%m-%d");

    (1u32..)
        .map(|seq| {
            let mut name = OsString::from(format!("{}_{}_{:02}", prefix, date, seq));
            if let Some(ext) = extension {
                name.push(".");
                name.push(ext);
            }
            name
        })
        .find(|candidate| !occupied(candidate.as_os_str()))
        .unwrap_or_default()
}

/// Returns the first free quarantine name for a duplicate.
pub fn quarantine_name(original: &OsStr, mut occupied: impl FnMut(&OsStr) -> bool) -> OsString {
    if !occupied(original) {
        return original.to_os_string();
    }

    (1u32..)
        .map(|n| {
            let mut name = OsString::from(format!("Duplicate_{}_", n));
            name.push(original);
            name
        })
        .find(|candidate| !occupied(candidate.as_os_str()))
        .unwrap_or_default()
}
