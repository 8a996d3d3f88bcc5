use std::path::{Component, Path};

/// True when `candidate` is a non-empty relative path that stays inside the
/// directory it is joined onto (no root, drive prefix, or `..` segment).
pub fn is_safe_relative(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.contains('\\') {
        return false;
    }
    let mut normal = 0usize;
    for comp in Path::new(candidate).components() {
        match comp {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    normal > 0
}

/// Drops a leading `./` so hints and defaults compare equal.
pub fn normalize_relative(candidate: &str) -> String {
    let mut s = candidate.trim();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.to_string()
}
