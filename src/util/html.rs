use std::iter::Peekable;
use std::str::Chars;

/// Convert VersionOne's rich-text HTML into plain text for JIRA.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::new();
    let mut chars = html.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '<' if starts_tag(&chars) => {
                let mut tag = String::new();
                for t in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                    tag.push(t);
                }
                let name = tag_name(&tag);
                if !tag.starts_with('/') && matches!(name.as_str(), "script" | "style") {
                    skip_element(&mut chars, &name);
                }
                let text = tag_break(&tag);
                if !text.is_empty() {
                    pending_space = false;
                }
                out.push_str(text);
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&e) = chars.peek() {
                    if e == ';' || entity.len() > 10 || e.is_whitespace() || e == '<' {
                        break;
                    }
                    entity.push(e);
                    chars.next();
                }
                let decoded = if chars.peek() == Some(&';') {
                    decode_entity(&entity)
                } else {
                    None
                };
                match decoded {
                    Some(d) => {
                        chars.next();
                        flush_space(&mut out, &mut pending_space);
                        out.push(d);
                    }
                    None => {
                        flush_space(&mut out, &mut pending_space);
                        out.push('&');
                        out.push_str(&entity);
                    }
                }
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                flush_space(&mut out, &mut pending_space);
                out.push(c);
            }
        }
    }

    tidy(&out)
}

fn flush_space(out: &mut String, pending: &mut bool) {
    if *pending && !out.is_empty() && !out.ends_with('\n') && !out.ends_with(' ') {
        out.push(' ');
    }
    *pending = false;
}

/// A `<` opens a tag only when a tag name, `/` or `!` follows and a `>`
/// closes it. Anything else is literal text.
fn starts_tag(rest: &Peekable<Chars<'_>>) -> bool {
    let mut ahead = rest.clone();
    let opens = ahead
        .peek()
        .is_some_and(|c| c.is_ascii_alphabetic() || *c == '/' || *c == '!');
    opens && ahead.any(|c| c == '>')
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Drop everything up to and including `</name>`.
fn skip_element(chars: &mut Peekable<Chars<'_>>, name: &str) {
    let end = format!("</{name}");
    let mut seen = String::new();
    for c in chars.by_ref() {
        seen.push(c.to_ascii_lowercase());
        if seen.ends_with(&end) {
            break;
        }
    }
    for c in chars.by_ref() {
        if c == '>' {
            break;
        }
    }
}

/// Text a tag contributes on its own.
fn tag_break(tag: &str) -> &'static str {
    let closing = tag.starts_with('/');
    let name = tag_name(tag);

    match name.as_str() {
        "br" => "\n",
        "li" if closing => "",
        "li" => "\n* ",
        "p" | "div" | "ul" | "ol" | "tr" | "table" | "blockquote" | "pre" | "h1"
        | "h2" | "h3" | "h4" | "h5" | "h6" => "\n",
        _ => "",
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Trim every line and keep at most one blank line in a row.
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
