//! One-pass section scan and structural validation.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::document::Document;

/// A line holding only this marker closes the open section.
pub const CLOSE_MARKER: &str = ")";

/// UTF-8 byte order mark some editors put at the start of the file.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Leading tokens of material definition lines inside the stiffness section.
const MATERIAL_PREFIXES: [&str; 4] = ["S0", "GEI", "RO", "Mu"];

pub type Result<T> = std::result::Result<T, LocateError>;

/// Sections the patcher reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Element connectivity (`( 1/`), mandatory
    Elements,
    /// Material and stiffness definitions (`( 3/`), created when absent
    Stiffness,
    /// Last mandatory section of the file (`( 17/`)
    Tail,
    /// Bedding coefficients (`( 19/`), created when absent
    Bedding,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Elements,
        SectionKind::Stiffness,
        SectionKind::Tail,
        SectionKind::Bedding,
    ];

    pub fn number(self) -> u32 {
        match self {
            SectionKind::Elements => 1,
            SectionKind::Stiffness => 3,
            SectionKind::Tail => 17,
            SectionKind::Bedding => 19,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.number() == number)
    }

    pub fn is_mandatory(self) -> bool {
        matches!(self, SectionKind::Elements | SectionKind::Tail)
    }

    /// Opening delimiter line as written for newly created sections.
    pub fn opening(self) -> String {
        format!("( {}/", self.number())
    }

    fn name(self) -> &'static str {
        match self {
            SectionKind::Elements => "elements",
            SectionKind::Stiffness => "stiffness",
            SectionKind::Tail => "tail",
            SectionKind::Bedding => "bedding",
        }
    }

    /// Whether a trimmed line inside this section is a data record.
    fn is_record(self, line: &str) -> bool {
        let mut parts = tokens(line);
        let first = parts.next();
        match self {
            SectionKind::Elements => first
                .and_then(|t| t.parse::<i64>().ok())
                .is_some_and(|n| n > 0),
            SectionKind::Stiffness => first.is_some_and(|t| {
                t.parse::<i64>().is_ok() || MATERIAL_PREFIXES.contains(&t)
            }),
            SectionKind::Bedding => {
                first.is_some_and(|t| t.parse::<i64>().is_ok())
                    && parts.next().is_some_and(|t| t.parse::<f64>().is_ok())
            }
            SectionKind::Tail => false,
        }
    }

    fn slot(self) -> usize {
        match self {
            SectionKind::Elements => 0,
            SectionKind::Stiffness => 1,
            SectionKind::Tail => 2,
            SectionKind::Bedding => 3,
        }
    }
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}/)", self.name(), self.number())
    }
}

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing mandatory section {0}")]
    MissingSection(SectionKind),

    #[error("section {kind} opened at line {} is never closed", .line + 1)]
    Unclosed { kind: SectionKind, line: usize },

    #[error("section {kind} opened twice, at lines {} and {}", .first + 1, .second + 1)]
    Duplicate {
        kind: SectionKind,
        first: usize,
        second: usize,
    },

    #[error(
        "bedding section opens at line {} before the tail section closes at line {}",
        .bedding_start + 1,
        .tail_end + 1
    )]
    Misordered { bedding_start: usize, tail_end: usize },
}

/// A located, closed section. Line indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Line of the `( N/` delimiter
    pub start: usize,
    /// Line of the closing `)`
    pub end: usize,
    /// Last data record before `end`, if any
    pub last_record: Option<usize>,
}

impl Section {
    /// Line after which new records of this section are appended.
    pub fn append_anchor(&self) -> usize {
        self.last_record.unwrap_or(self.start)
    }

    /// Lines strictly between the delimiters.
    pub fn body(&self) -> std::ops::Range<usize> {
        self.start + 1..self.end
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSection {
    start: usize,
    end: Option<usize>,
    last_record: Option<usize>,
}

/// Positions of the tracked sections in one version of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMap {
    pub elements: Section,
    pub stiffness: Option<Section>,
    pub tail: Section,
    pub bedding: Option<Section>,
    pub line_count: usize,
}

impl SectionMap {
    /// Scan `lines` once and validate the section structure.
    pub fn scan<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut found: [Option<OpenSection>; 4] = [None; 4];
        // Number of whichever section is currently open, tracked or not, so
        // the `)` of an untracked section never closes a tracked one.
        let mut open: Option<u32> = None;

        for (i, raw) in lines.iter().enumerate() {
            let mut line = raw.as_ref();
            if i == 0 {
                line = line.trim_start_matches(BYTE_ORDER_MARK);
            }
            let line = line.trim();

            if let Some(number) = parse_opening(line) {
                if let Some(previous) = open {
                    debug!(
                        "section ({previous}/) still open when ({number}/) starts at line {}",
                        i + 1
                    );
                }
                open = Some(number);
                if let Some(kind) = SectionKind::from_number(number) {
                    if let Some(first) = found[kind.slot()] {
                        return Err(LocateError::Duplicate {
                            kind,
                            first: first.start,
                            second: i,
                        });
                    }
                    found[kind.slot()] = Some(OpenSection {
                        start: i,
                        end: None,
                        last_record: None,
                    });
                }
                continue;
            }

            let Some(number) = open else {
                continue;
            };
            let tracked = match SectionKind::from_number(number) {
                Some(kind) => found[kind.slot()].as_mut().map(|s| (kind, s)),
                None => None,
            };

            if line == CLOSE_MARKER {
                if let Some((_, section)) = tracked {
                    section.end = Some(i);
                }
                open = None;
                continue;
            }

            if let Some((kind, section)) = tracked
                && kind.is_record(line)
            {
                section.last_record = Some(i);
            }
        }

        let close = |kind: SectionKind| -> Result<Option<Section>> {
            match found[kind.slot()] {
                None => Ok(None),
                Some(OpenSection { start, end: None, .. }) => {
                    Err(LocateError::Unclosed { kind, line: start })
                }
                Some(OpenSection {
                    start,
                    end: Some(end),
                    last_record,
                }) => Ok(Some(Section {
                    kind,
                    start,
                    end,
                    last_record,
                })),
            }
        };

        let elements = close(SectionKind::Elements)?
            .ok_or(LocateError::MissingSection(SectionKind::Elements))?;
        let tail =
            close(SectionKind::Tail)?.ok_or(LocateError::MissingSection(SectionKind::Tail))?;
        let stiffness = close(SectionKind::Stiffness)?;
        let bedding = close(SectionKind::Bedding)?;

        if let Some(bedding) = bedding
            && bedding.start < tail.end
        {
            return Err(LocateError::Misordered {
                bedding_start: bedding.start,
                tail_end: tail.end,
            });
        }

        if stiffness.is_none() {
            warn!("no stiffness section {}", SectionKind::Stiffness);
        }
        if bedding.is_none() {
            warn!("no bedding section {}", SectionKind::Bedding);
        }

        Ok(Self {
            elements,
            stiffness,
            tail,
            bedding,
            line_count: lines.len(),
        })
    }

    pub fn get(&self, kind: SectionKind) -> Option<&Section> {
        match kind {
            SectionKind::Elements => Some(&self.elements),
            SectionKind::Stiffness => self.stiffness.as_ref(),
            SectionKind::Tail => Some(&self.tail),
            SectionKind::Bedding => self.bedding.as_ref(),
        }
    }

    /// Line after which support elements are appended: the last element
    /// record, or the opening line of an empty element section.
    pub fn support_anchor(&self) -> usize {
        self.elements.append_anchor()
    }

    /// Line after which stiffness records are appended, `None` when the
    /// section has to be created in front of the tail section.
    pub fn stiffness_anchor(&self) -> Option<usize> {
        self.stiffness.map(|s| s.append_anchor())
    }

    /// Line after which bedding records go: the last record of an existing
    /// bedding section, otherwise the closing line of the tail section (a new
    /// section is created right after it).
    pub fn bedding_anchor(&self) -> usize {
        match self.bedding {
            Some(section) => section.append_anchor(),
            None => self.tail.end,
        }
    }

    /// Largest positive record id inside the stiffness section, 0 if none.
    pub fn max_stiffness_id<S: AsRef<str>>(&self, lines: &[S]) -> i32 {
        let Some(section) = self.stiffness else {
            return 0;
        };
        lines[section.body()]
            .iter()
            .filter_map(|line| tokens(line.as_ref().trim()).next()?.parse::<i32>().ok())
            .filter(|&id| id > 0)
            .max()
            .unwrap_or(0)
    }
}

impl Document {
    /// Scan this document's lines.
    pub fn locate(&self) -> Result<SectionMap> {
        SectionMap::scan(&self.text_lines())
    }
}

/// Read `path` and locate its sections.
pub fn locate_file(path: impl AsRef<Path>) -> Result<(Document, SectionMap)> {
    let path = path.as_ref();
    let document = Document::read(path).map_err(|source| LocateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let map = document.locate()?;
    Ok((document, map))
}

/// Section number of a `( N/` line.
fn parse_opening(line: &str) -> Option<u32> {
    let rest = line.strip_prefix('(')?.trim_start();
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(digits_end);
    if !tail.trim_start().starts_with('/') {
        return None;
    }
    digits.parse().ok()
}

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == '/' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<&str> {
        src.lines().collect()
    }

    const FULL: &str = r#"model header
( 0/ 2; header /
)
( 1/
44 1 2 3 4 /
42 5 6 7 /
)
( 3/
1 S0 1.05541e+006 20 40/
 0 RO 0.2/
2 100.0000 100.0000 0 0 0 0 /
)
( 4/
1 0 0 0 /
)
( 17/
tail data
)
( 19/
7 12.500 0 0 0 /
)"#;

    #[test]
    fn locates_all_sections() {
        let src = lines(FULL);
        let map = SectionMap::scan(&src).expect("scan should succeed");

        assert_eq!(map.elements.start, 3);
        assert_eq!(map.elements.end, 6);
        assert_eq!(map.elements.last_record, Some(5));

        let stiffness = map.stiffness.expect("stiffness section");
        assert_eq!((stiffness.start, stiffness.end), (7, 11));
        assert_eq!(stiffness.last_record, Some(10));

        assert_eq!((map.tail.start, map.tail.end), (15, 17));

        let bedding = map.bedding.expect("bedding section");
        assert_eq!((bedding.start, bedding.end), (18, 20));
        assert_eq!(bedding.last_record, Some(19));
        assert_eq!(map.line_count, src.len());
    }

    #[test]
    fn anchors_follow_existing_records() {
        let src = lines(FULL);
        let map = SectionMap::scan(&src).expect("scan should succeed");
        assert_eq!(map.support_anchor(), 5);
        assert_eq!(map.stiffness_anchor(), Some(10));
        assert_eq!(map.bedding_anchor(), 19);
        assert_eq!(map.max_stiffness_id(&src), 2);
    }

    #[test]
    fn optional_sections_may_be_absent() {
        let src = lines("( 1/\n44 1 2 3 4 /\n)\n( 17/\nx\n)");
        let map = SectionMap::scan(&src).expect("scan should succeed");
        assert!(map.stiffness.is_none());
        assert!(map.bedding.is_none());
        assert_eq!(map.stiffness_anchor(), None);
        assert_eq!(map.bedding_anchor(), 5, "new bedding goes after tail close");
        assert_eq!(map.max_stiffness_id(&src), 0);
    }

    #[test]
    fn empty_sections_anchor_on_their_opening_line() {
        let src = lines("( 1/\n)\n( 3/\n)\n( 17/\n)\n( 19/\n)");
        let map = SectionMap::scan(&src).expect("scan should succeed");
        assert_eq!(map.support_anchor(), 0);
        assert_eq!(map.stiffness_anchor(), Some(2));
        assert_eq!(map.bedding_anchor(), 6);
    }

    #[test]
    fn skips_byte_order_mark_on_first_line() {
        let src = lines("\u{feff}( 1/\n44 1 2 3 4 /\n)\n( 17/\n)");
        let map = SectionMap::scan(&src).expect("scan should succeed");
        assert_eq!(map.elements.start, 0);
        assert_eq!(map.support_anchor(), 1);
    }

    #[test]
    fn untracked_section_close_does_not_close_tracked_one() {
        let src = lines("( 1/\n44 1 2 3 /\n( 4/\n)\n( 17/\n)");
        let err = SectionMap::scan(&src).expect_err("elements never closed");
        assert!(matches!(
            err,
            LocateError::Unclosed {
                kind: SectionKind::Elements,
                line: 0
            }
        ));
    }

    #[test]
    fn fails_on_missing_mandatory_sections() {
        let no_elements = lines("( 3/\n)\n( 17/\n)");
        let err = SectionMap::scan(&no_elements).expect_err("elements missing");
        assert!(matches!(
            err,
            LocateError::MissingSection(SectionKind::Elements)
        ));
        assert!(err.to_string().contains("elements (1/)"));

        let no_tail = lines("( 1/\n44 1 2 3 /\n)");
        let err = SectionMap::scan(&no_tail).expect_err("tail missing");
        assert!(matches!(err, LocateError::MissingSection(SectionKind::Tail)));
    }

    #[test]
    fn fails_on_unclosed_optional_section() {
        let src = lines("( 1/\n)\n( 17/\n)\n( 19/\n5 1.0 0 0 0 /");
        let err = SectionMap::scan(&src).expect_err("bedding never closed");
        assert_eq!(
            err.to_string(),
            "section bedding (19/) opened at line 5 is never closed"
        );
    }

    #[test]
    fn fails_when_bedding_precedes_tail() {
        let src = lines("( 1/\n)\n( 19/\n)\n( 17/\n)");
        let err = SectionMap::scan(&src).expect_err("misordered");
        assert!(matches!(
            err,
            LocateError::Misordered {
                bedding_start: 2,
                tail_end: 5
            }
        ));
    }

    #[test]
    fn fails_on_duplicate_section() {
        let src = lines("( 1/\n)\n( 1/\n)\n( 17/\n)");
        let err = SectionMap::scan(&src).expect_err("duplicate");
        assert!(matches!(
            err,
            LocateError::Duplicate {
                kind: SectionKind::Elements,
                first: 0,
                second: 2
            }
        ));
    }

    #[test]
    fn parses_opening_variants() {
        assert_eq!(parse_opening("( 1/"), Some(1));
        assert_eq!(parse_opening("(17/"), Some(17));
        assert_eq!(parse_opening("( 19 /"), Some(19));
        assert_eq!(parse_opening("( 0/ 2; header /"), Some(0));
        assert_eq!(parse_opening("(abc/"), None);
        assert_eq!(parse_opening("( 1"), None);
        assert_eq!(parse_opening(")"), None);
    }

    #[test]
    fn classifies_records_per_section() {
        assert!(SectionKind::Elements.is_record("44 1 2 3 4 /"));
        assert!(!SectionKind::Elements.is_record("0 1 2 /"));
        assert!(!SectionKind::Elements.is_record("text"));
        assert!(SectionKind::Stiffness.is_record("GEI 1 2/"));
        assert!(SectionKind::Stiffness.is_record("0 Mu 0.2/"));
        assert!(!SectionKind::Stiffness.is_record("comment"));
        assert!(SectionKind::Bedding.is_record("12 3.5 0 0 0 /"));
        assert!(!SectionKind::Bedding.is_record("12 /"));
    }

    #[test]
    fn locate_file_reports_missing_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.txt");
        let err = locate_file(&missing).expect_err("missing file");
        assert!(matches!(err, LocateError::Read { .. }));
        assert!(err.to_string().contains("absent.txt"));
    }
}
