//! Repository-relative path arithmetic on `/`-separated strings.

/// Directory part of a repository path; `""` for files at the root.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name without its last extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

/// `./x`, `../x`, `.` and `..` are relative specifiers.
pub fn is_relative(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

/// Join `rel` onto `base` and collapse `.`/`..` segments.
///
/// `..` never climbs above the repository root; extra pops are ignored.
pub fn join(base: &str, rel: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    let rel = if let Some(stripped) = rel.strip_prefix('/') {
        stripped
    } else {
        stack.extend(base.split('/').filter(|p| !p.is_empty() && *p != "."));
        rel
    };

    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("src/a/b.ts"), "src/a");
        assert_eq!(parent_dir("main.py"), "");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("src/util.test.ts"), "util.test");
        assert_eq!(file_stem("Makefile"), "Makefile");
        assert_eq!(file_stem(".env"), ".env");
    }

    #[test]
    fn test_join_pops() {
        assert_eq!(join("src/a", "../b/c"), "src/b/c");
        assert_eq!(join("src/a", "./c"), "src/a/c");
        assert_eq!(join("src", "../../../x"), "x");
        assert_eq!(join("", "./b"), "b");
        assert_eq!(join("src/a", "/lib/x"), "lib/x");
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./b"));
        assert!(is_relative(".."));
        assert!(!is_relative(".hidden"));
        assert!(!is_relative("os"));
    }
}
