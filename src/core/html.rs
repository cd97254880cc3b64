// src/core/html.rs
//
// Case-insensitive index scanning over raw markup. Targets one fixed
// portal layout; this is not a general HTML parser.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// `(start, end)` of the next `<o ...>...</c>` block at or after `from`.
pub fn next_tag_block_ci(s: &str, o: &str, c: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lower(s);
    let ol = to_lower(o);
    let cl = to_lower(c);
    let start = lc.get(from..)?.find(&ol)? + from;
    let open_end = s[start..].find('>')? + start + 1;
    let end_rel = lc[open_end..].find(&cl)?;
    let end = open_end + end_rel + c.len();
    Some((start, end))
}

/// Value of the `<input name="...">` whose name matches exactly.
/// Handles `value` appearing before or after `name` within the tag.
pub fn input_value(html: &str, name: &str) -> Option<String> {
    let lc = to_lower(html);
    let needle = format!(r#"name="{}""#, to_lower(name));
    let at = lc.find(&needle)?;
    let tag_start = html[..at].rfind('<')?;
    let tag_end = html[at..].find('>')? + at;
    let tag = &html[tag_start..tag_end];
    let tag_lc = &lc[tag_start..tag_end];

    let v = tag_lc.find(r#"value=""#)? + 7;
    let vend = tag[v..].find('"')? + v;
    Some(s!(&tag[v..vend]))
}

/// Verbatim `<svg>...</svg>` block of the element carrying `id`, or
/// the first SVG inside/after it when the id sits on a container.
pub fn svg_block_near_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let lc = to_lower(html);
    let needle = format!(r#"id="{}""#, to_lower(id));
    let at = lc.find(&needle)?;
    let tag_start = html[..at].rfind('<')?;

    let svg_start = if lc[tag_start..].starts_with("<svg") {
        tag_start
    } else {
        lc[at..].find("<svg")? + at
    };
    let end_rel = lc[svg_start..].find("</svg>")?;
    Some(&html[svg_start..svg_start + end_rel + "</svg>".len()])
}

/// Number of `<rect` occurrences — the QR-vs-logo discriminator.
pub fn count_rects(svg: &str) -> usize {
    let lc = to_lower(svg);
    let mut n = 0;
    let mut pos = 0;
    while let Some(i) = lc[pos..].find("<rect") {
        n += 1;
        pos += i + 5;
    }
    n
}
