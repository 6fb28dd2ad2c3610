use std::path::{Component, Path, PathBuf};

pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                match std::env::current_dir() {
                    Ok(current_dir) => current_dir.join(path),
                    Err(_) => path.to_path_buf(),
                }
            };

            normalize_path(&absolute_path).display().to_string()
        }
    }
}

/// Resolves `.` and `..` components lexically, without touching the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept, so
/// `../x` stays `../x`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;

    /// Path rendered with `/` separators, as used by globs and source maps.
    fn to_slash_string(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn to_slash_string(&self) -> String {
        self.components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn to_slash_string(&self) -> String {
        self.as_path().to_slash_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("a/./b/../c.js", "a/c.js")]
    #[case("./bower_components/x/dist.js", "bower_components/x/dist.js")]
    #[case("../shared/x.js", "../shared/x.js")]
    #[case("a/../../x.js", "../x.js")]
    #[case("/a/../../x.js", "/x.js")]
    fn normalizes_lexically(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn slash_string_joins_components() {
        assert_eq!(Path::new("src/app/main.js").to_slash_string(), "src/app/main.js");
        assert_eq!(Path::new("main.js").to_slash_string(), "main.js");
    }

    #[test]
    fn display_of_missing_relative_path_is_absolute() {
        let shown = Path::new("does/not/exist.js").best_effort_path_display();
        assert!(Path::new(&shown).is_absolute());
        assert!(shown.ends_with("exist.js"));
    }
}
