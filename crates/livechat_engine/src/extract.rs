use crate::{FailureKind, FetchError};

/// Assignments the live chat page uses for its embedded state, most specific first.
const INITIAL_DATA_MARKERS: [&str; 3] = [
    "window[\"ytInitialData\"] =",
    "var ytInitialData =",
    "ytInitialData =",
];

/// Returns the JSON object assigned to `ytInitialData` inside an HTML page.
///
/// Everything after the marker is trimmed to the first balanced top-level
/// object, so trailing `;</script>` and following scripts are dropped.
pub fn extract_initial_data(html: &str) -> Result<&str, FetchError> {
    let start = INITIAL_DATA_MARKERS
        .iter()
        .find_map(|marker| html.find(marker).map(|idx| idx + marker.len()))
        .ok_or_else(|| {
            FetchError::new(FailureKind::MissingInitialData, "ytInitialData marker not found")
        })?;

    let rest = &html[start..];
    let open = rest.find('{').ok_or_else(|| {
        FetchError::new(FailureKind::MissingInitialData, "no object after marker")
    })?;
    let object = &rest[open..];
    let len = balanced_object_len(object).ok_or_else(|| {
        FetchError::new(FailureKind::MissingInitialData, "unterminated initial data object")
    })?;
    Ok(&object[..len])
}

/// Byte length of the object starting at `text[0] == '{'`, or `None` if it
/// never closes. Braces inside string literals are ignored.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
