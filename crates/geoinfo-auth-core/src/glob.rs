//! Wildcard matching shared by path and origin patterns

/// Match `text` against `pattern` where `*` consumes a run of at least
/// `star_min` bytes accepted by `accept` and `?` consumes one.
///
/// Single pass with one backtrack point (the most recent `*`), so the cost
/// is bounded by `pattern.len() * text.len()`.
pub(crate) fn wildcard_match(
    pattern: &[u8],
    text: &[u8],
    star_min: usize,
    accept: &dyn Fn(u8) -> bool,
) -> bool {
    let (mut p_idx, mut t_idx) = (0usize, 0usize);
    // (pattern index after the star, end of the text the star has taken)
    let mut star: Option<(usize, usize)> = None;

    loop {
        match pattern.get(p_idx) {
            Some(b'*') => {
                let end = t_idx + star_min;
                if end <= text.len() && text[t_idx..end].iter().all(|&b| accept(b)) {
                    star = Some((p_idx + 1, end));
                    p_idx += 1;
                    t_idx = end;
                    continue;
                }
            }
            Some(b'?') => {
                if t_idx < text.len() && accept(text[t_idx]) {
                    p_idx += 1;
                    t_idx += 1;
                    continue;
                }
            }
            Some(&c) => {
                if text.get(t_idx) == Some(&c) {
                    p_idx += 1;
                    t_idx += 1;
                    continue;
                }
            }
            None if t_idx == text.len() => return true,
            None => {}
        }

        // Let the last star take one more byte and retry from there
        match star {
            Some((after, taken)) if taken < text.len() && accept(text[taken]) => {
                star = Some((after, taken + 1));
                p_idx = after;
                t_idx = taken + 1;
            }
            _ => return false,
        }
    }
}
