//! Page selection strings such as `"1, [3-5], 9"`.

use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing or resolving a [`PageSelection`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageSelectionError {
    /// A comma-separated token was blank.
    #[error("empty token")]
    EmptyToken,
    /// A token is neither a page number nor a range.
    #[error("could not parse token '{0}'")]
    UnparsableToken(String),
    /// A token has an unmatched `[` or `]`.
    #[error("invalid brackets in token '{0}'")]
    InvalidBrackets(String),
    /// `all` appeared next to explicit pages.
    #[error("cannot mix 'all' with explicit page selections")]
    MixedAllWithExplicit,
    /// The document has no pages.
    #[error("invalid page count {0}")]
    InvalidPageCount(usize),
    /// Pages are 1-based.
    #[error("page must be >= 1 (got {0})")]
    PageBelowOne(usize),
    /// A range runs backwards.
    #[error("range start must be <= end (got {start}-{end})")]
    RangeStartAfterEnd {
        /// First page of the range.
        start: usize,
        /// Last page of the range.
        end: usize,
    },
    /// A selected page does not exist.
    #[error("page {page} is out of range (page_count={page_count})")]
    PageOutOfRange {
        /// The offending page.
        page: usize,
        /// Number of pages in the document.
        page_count: usize,
    },
}

/// Which pages of a multi-page source to parse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// Every page.
    #[default]
    All,
    /// 1-based ranges, sorted and merged so they neither overlap nor touch.
    Explicit(Vec<RangeInclusive<usize>>),
}

impl PageSelection {
    /// Parses a page selection.
    ///
    /// `None`, a blank string and `all` (any case) select every page.
    /// Otherwise the input is a comma-separated list of pages (`3`) and
    /// ranges (`1-3`, optionally bracketed as `[1-3]`).
    ///
    /// ```
    /// use oar_ocr_layout::pipeline::pages::PageSelection;
    ///
    /// let selection = PageSelection::parse(Some("1, [3-5], 4, 9")).unwrap();
    /// assert_eq!(selection, PageSelection::Explicit(vec![1..=1, 3..=5, 9..=9]));
    /// ```
    pub fn parse(raw: Option<&str>) -> Result<Self, PageSelectionError> {
        let Some(raw) = raw else {
            return Ok(Self::All);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let mut ranges = Vec::new();
        let mut saw_all = false;
        for token in trimmed.split(',').map(str::trim) {
            if token.is_empty() {
                return Err(PageSelectionError::EmptyToken);
            }
            if token.eq_ignore_ascii_case("all") {
                saw_all = true;
                continue;
            }
            let inner = unwrap_brackets(token)?;
            ranges.push(parse_range(inner, token)?);
        }

        match (saw_all, ranges.is_empty()) {
            (true, false) => Err(PageSelectionError::MixedAllWithExplicit),
            (true, true) => Ok(Self::All),
            (false, _) => Ok(Self::Explicit(merge_ranges(ranges)?)),
        }
    }

    /// Resolves the selection to ascending, deduplicated 1-based pages.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>, PageSelectionError> {
        if page_count < 1 {
            return Err(PageSelectionError::InvalidPageCount(page_count));
        }
        match self {
            Self::All => Ok((1..=page_count).collect()),
            Self::Explicit(ranges) => {
                let mut pages = Vec::new();
                for range in ranges {
                    if *range.start() < 1 {
                        return Err(PageSelectionError::PageBelowOne(*range.start()));
                    }
                    if *range.end() > page_count {
                        return Err(PageSelectionError::PageOutOfRange {
                            page: *range.end(),
                            page_count,
                        });
                    }
                    pages.extend(range.clone());
                }
                Ok(pages)
            }
        }
    }
}

impl FromStr for PageSelection {
    type Err = PageSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

fn unwrap_brackets(token: &str) -> Result<&str, PageSelectionError> {
    if !token.starts_with('[') && !token.ends_with(']') {
        return Ok(token);
    }
    token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
        .ok_or_else(|| PageSelectionError::InvalidBrackets(token.to_string()))
}

fn parse_range(inner: &str, token: &str) -> Result<RangeInclusive<usize>, PageSelectionError> {
    let cleaned: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    let parse_page = |part: &str| {
        part.parse::<usize>()
            .map_err(|_| PageSelectionError::UnparsableToken(token.to_string()))
    };

    let parts: Vec<&str> = cleaned.split('-').collect();
    let (start, end) = match parts.as_slice() {
        [single] => {
            let page = parse_page(single)?;
            (page, page)
        }
        [start, end] => (parse_page(start)?, parse_page(end)?),
        _ => return Err(PageSelectionError::UnparsableToken(token.to_string())),
    };

    if start < 1 {
        return Err(PageSelectionError::PageBelowOne(start));
    }
    if end < 1 {
        return Err(PageSelectionError::PageBelowOne(end));
    }
    if start > end {
        return Err(PageSelectionError::RangeStartAfterEnd { start, end });
    }
    Ok(start..=end)
}

fn merge_ranges(
    mut ranges: Vec<RangeInclusive<usize>>,
) -> Result<Vec<RangeInclusive<usize>>, PageSelectionError> {
    if ranges.is_empty() {
        return Err(PageSelectionError::EmptyToken);
    }
    ranges.sort_by_key(|range| (*range.start(), *range.end()));

    let mut merged: Vec<RangeInclusive<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                let end = (*last.end()).max(*range.end());
                *last = *last.start()..=end;
            }
            _ => merged.push(range),
        }
    }
    Ok(merged)
}
