use super::{Condition, Medicine};

/// Extracts the ranked condition list from a report document.
///
/// The document comes from a language model and is not guaranteed to be well formed,
/// so this scans for literal tag pairs instead of building a tree. It never fails:
/// a missing tag yields an empty field, an unterminated element runs to the end of
/// the input, and text without any `<condition>` yields an empty list.
pub fn parse_report(raw: &str) -> Vec<Condition> {
    let scope = elements(raw, "report").into_iter().next().unwrap_or(raw);
    elements(scope, "condition")
        .into_iter()
        .map(parse_condition)
        .collect()
}

fn parse_condition(body: &str) -> Condition {
    let medicines = elements(body, "medicine")
        .into_iter()
        .map(parse_medicine)
        .collect();

    // Medicine names must not be mistaken for the condition name.
    let own = strip_elements(&strip_elements(body, "medicines"), "medicine");

    Condition {
        name: first_text(&own, "name"),
        likelihood: first_text(&own, "likelihood"),
        description: first_text(&own, "description"),
        treatments: elements(&own, "treatment")
            .into_iter()
            .map(leaf_text)
            .collect(),
        medicines,
    }
}

fn parse_medicine(body: &str) -> Medicine {
    // Older prompts asked for `<medicine>Name</medicine>` without nested fields.
    if !body.contains('<') {
        return Medicine {
            name: leaf_text(body).trim().to_string(),
            ..Medicine::default()
        };
    }

    Medicine {
        name: first_text(body, "name"),
        dosage: first_text(body, "dosage"),
        alternatives: elements(body, "alternative")
            .into_iter()
            .map(leaf_text)
            .collect(),
    }
}

fn first_text(hay: &str, tag: &str) -> String {
    elements(hay, tag)
        .into_iter()
        .next()
        .map(leaf_text)
        .unwrap_or_default()
}

/// Locates the next opening tag. Returns the byte offset of `<`, the offset just
/// past `>`, and whether the tag was self-closing.
fn find_open(hay: &str, tag: &str, from: usize) -> Option<(usize, usize, bool)> {
    let needle = format!("<{}", tag);
    let mut pos = from;

    while let Some(rel) = hay[pos..].find(&needle) {
        let start = pos + rel;
        let after = start + needle.len();
        match hay[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => {
                let close = after + hay[after..].find('>')?;
                let self_closing = hay[..close].ends_with('/');
                return Some((start, close + 1, self_closing));
            }
            // A longer tag name sharing the prefix, e.g. `<medicines` for `medicine`.
            _ => pos = after,
        }
    }
    None
}

/// Inner text of every `<tag>...</tag>` element in document order.
fn elements<'a>(hay: &'a str, tag: &str) -> Vec<&'a str> {
    element_spans(hay, tag)
        .into_iter()
        .map(|(_, inner, _)| &hay[inner.0..inner.1])
        .collect()
}

/// `hay` with every `<tag>...</tag>` element removed.
fn strip_elements(hay: &str, tag: &str) -> String {
    let mut out = String::with_capacity(hay.len());
    let mut last = 0;
    for (start, _, end) in element_spans(hay, tag) {
        out.push_str(&hay[last..start]);
        last = end;
    }
    out.push_str(&hay[last..]);
    out
}

/// (element start, inner span, element end) for each element.
fn element_spans(hay: &str, tag: &str) -> Vec<(usize, (usize, usize), usize)> {
    let close = format!("</{}>", tag);
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some((start, inner_start, self_closing)) = find_open(hay, tag, pos) {
        if self_closing {
            spans.push((start, (inner_start, inner_start), inner_start));
            pos = inner_start;
            continue;
        }
        match hay[inner_start..].find(&close) {
            Some(rel) => {
                let inner_end = inner_start + rel;
                let end = inner_end + close.len();
                spans.push((start, (inner_start, inner_end), end));
                pos = end;
            }
            None => {
                spans.push((start, (inner_start, hay.len()), hay.len()));
                break;
            }
        }
    }
    spans
}

/// Text content of a leaf: nested tags dropped, entities decoded.
fn leaf_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                text.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    text.push_str(rest);
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
