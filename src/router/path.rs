/// Join a prefix and a path into a normalized route path.
///
/// Slashes are trimmed from both parts and doubled slashes collapse. The result always
/// starts with `/`, never ends with one (except the root), and two empty inputs give `/`.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(build_path("api/", "/users/"), "/api/users");
/// assert_eq!(build_path("", ""), "/");
/// ```
#[must_use]
pub fn build_path(prefix: &str, path: &str) -> String {
    let prefix = collapse(prefix);
    let path = collapse(path);

    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => format!("/{prefix}"),
        (true, false) => format!("/{path}"),
        (false, false) => format!("/{prefix}/{path}"),
    }
}

/// Join any number of segments with [`build_path`] semantics.
#[must_use]
pub fn join_paths<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .fold(String::new(), |acc, part| build_path(&acc, part))
}

fn collapse(part: &str) -> String {
    part.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
