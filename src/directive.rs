//! Embedded directive grammar.
//!
//! The wire syntax is frozen: `[[ACTION:<TYPE>|key1:value1|key2:value2|...]]`.
//! Values may contain `:` but not `]]`. Any number of directives may appear
//! anywhere in a completion; they are returned in appearance order and the
//! display text has every matched span removed.

use serde::Serialize;

const OPEN: &str = "[[ACTION:";
const CLOSE: &str = "]]";

#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    pub kind: String,
    /// Parameters in written order. Keys are unique; the first occurrence
    /// wins. Each segment is split on its first colon only, so values keep
    /// embedded colons (URLs, timestamps).
    pub params: Vec<(String, String)>,
}

impl Directive {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Parsed {
    /// Input text with every directive span removed, trimmed.
    pub display_text: String,
    pub directives: Vec<Directive>,
}

/// Extract all directives from a completion response.
#[must_use]
pub fn parse(text: &str) -> Parsed {
    let mut display = String::with_capacity(text.len());
    let mut directives = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            // Unterminated tag: not a directive, keep the text as-is.
            break;
        };
        display.push_str(&rest[..start]);
        directives.push(parse_body(&after_open[..end]));
        rest = &after_open[end + CLOSE.len()..];
    }
    display.push_str(rest);

    Parsed {
        display_text: display.trim().to_string(),
        directives,
    }
}

fn parse_body(body: &str) -> Directive {
    let mut segments = body.split('|');
    let kind = segments.next().unwrap_or_default().trim().to_string();

    let mut params: Vec<(String, String)> = Vec::new();
    for segment in segments {
        // First colon is structural; a segment without one is dropped
        // without aborting the rest of the directive.
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || params.iter().any(|(k, _)| k == key) {
            continue;
        }
        params.push((key.to_string(), value.trim().to_string()));
    }

    Directive { kind, params }
}

// ─── Raw-content sub-parsers (GENERATE_FILE) ────────────────────────────────

/// Spreadsheet rows from a markdown table in the raw response text: lines
/// starting with `|`, cells trimmed, empties dropped, dash-only separator
/// rows removed. Header row retained.
#[must_use]
pub fn spreadsheet_rows(raw: &str) -> Vec<Vec<String>> {
    raw.lines()
        .filter(|line| line.trim_start().starts_with('|'))
        .map(|line| {
            line.split('|')
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<String>>()
        })
        .filter(|row: &Vec<String>| !row.is_empty())
        .filter(|row| !is_separator_cell(&row[0]))
        .collect()
}

fn is_separator_cell(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| c == '-')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slide {
    pub title: String,
    pub body: String,
}

/// Slide blocks of the shape `Slide <n>: <title-line>` followed by body
/// lines, each running to the next `Slide <n>:` marker or end of text. When
/// no block is found, a single slide covering the whole text is emitted with
/// the filename as title.
#[must_use]
pub fn slide_blocks(raw: &str, filename: &str) -> Vec<Slide> {
    let mut markers = Vec::new();
    let mut from = 0;
    while let Some((start, content_start)) = find_slide_marker(raw, from) {
        markers.push((start, content_start));
        from = content_start;
    }

    if markers.is_empty() {
        return vec![Slide {
            title: filename.to_string(),
            body: raw.trim().to_string(),
        }];
    }

    let mut slides = Vec::with_capacity(markers.len());
    for (i, &(_, content_start)) in markers.iter().enumerate() {
        let content_end = markers
            .get(i + 1)
            .map_or(raw.len(), |&(next_start, _)| next_start);
        let block = raw[content_start..content_end].trim();
        let mut lines = block.lines();
        let title = lines.next().unwrap_or_default().trim().to_string();
        let body = lines.collect::<Vec<&str>>().join("\n").trim().to_string();
        slides.push(Slide { title, body });
    }
    slides
}

/// Locate the next `Slide <digits>:` marker at or after `from`. Returns the
/// marker start and the offset just past its colon.
fn find_slide_marker(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search_from = from;
    while let Some(rel) = text[search_from..].find("Slide ") {
        let start = search_from + rel;
        let after = &text[start + "Slide ".len()..];
        let digits = after.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with(':') {
            let content_start = start + "Slide ".len() + digits + 1;
            return Some((start, content_start));
        }
        search_from = start + "Slide ".len();
    }
    None
}
