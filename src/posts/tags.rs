/// Normalizes user-supplied tags.
///
/// Each input string is split on whitespace. A token without `#` is kept as
/// is; a token with `#` yields its leading text (if any) followed by one
/// `#segment` element per non-empty segment, so `"#rust#async"` becomes
/// `["#rust", "#async"]`.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = Vec::new();
    for chunk in raw {
        for token in chunk.as_ref().split_whitespace() {
            if !token.contains('#') {
                out.push(token.to_string());
                continue;
            }
            let mut parts = token.split('#');
            if let Some(head) = parts.next().filter(|h| !h.is_empty()) {
                out.push(head.to_string());
            }
            out.extend(parts.filter(|p| !p.is_empty()).map(|p| format!("#{p}")));
        }
    }
    out
}
