//! Section locator for the target tool's line-oriented model file.
//!
//! The file is a sequence of lines in which numbered sections open with a
//! `( N/` line and close with a line holding only `)`. This crate provides:
//! - **`Document`**: byte-preserving line buffer (encoding and line endings of
//!   untouched lines survive a rewrite)
//! - **`SectionMap`**: one-pass scan locating the element, stiffness, tail and
//!   bedding sections, with structural validation
//! - **anchors**: the lines after which generated records are inserted

mod document;
mod locate;

pub use document::{Document, LineEnding};
pub use locate::{
    CLOSE_MARKER, LocateError, Result, Section, SectionKind, SectionMap, locate_file,
};
