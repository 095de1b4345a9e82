//! Line-level token search
//!
//! ODT snippets are not parsed; names are located with whole-token searches.
//! A token boundary is any character that is not alphanumeric, `_` or `-`.
//! All offsets returned here are byte offsets into the line.

/// Characters that may appear inside a name
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Start offsets of `name` where it is not glued to identifier characters
fn token_starts<'a>(line: &'a str, name: &'a str) -> impl Iterator<Item = usize> + 'a {
    line.match_indices(name)
        .map(|(start, _)| start)
        .filter(move |&start| {
            let before = line[..start].chars().next_back();
            let after = line[start + name.len()..].chars().next();
            !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
        })
}

/// Occurrences of `name` as a usage: a whole token not followed by `:`
pub fn usage_offsets<'a>(line: &'a str, name: &'a str) -> impl Iterator<Item = usize> + 'a {
    token_starts(line, name)
        .filter(move |&start| !name.is_empty() && !line[start + name.len()..].starts_with(':'))
}

/// First occurrence of `name` as a usage
pub fn find_usage(line: &str, name: &str) -> Option<usize> {
    usage_offsets(line, name).next()
}

/// Offset of a model key declaration, `<indent>Key: !Tag`
pub fn find_model_key(line: &str, key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    token_starts(line, key).find(|&start| {
        let preceded_by_space = line[..start]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        preceded_by_space && line[start + key.len()..].starts_with(": !")
    })
}

/// Offset of `name` in a `DEFINE <KEYWORD> <name>` header on this line
pub fn find_definition(line: &str, keyword: &str, name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    line.match_indices("DEFINE ").find_map(|(start, define)| {
        let after_define = start + define.len();
        let rest = line[after_define..].strip_prefix(keyword)?.strip_prefix(' ')?;
        let tail = rest.strip_prefix(name)?;
        if tail.chars().next().is_some_and(is_identifier_char) {
            return None;
        }
        Some(after_define + keyword.len() + 1)
    })
}

/// Split a `( $a, $b )` parameter list into trimmed names
pub fn split_parameters(list: &str) -> Vec<String> {
    list.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
