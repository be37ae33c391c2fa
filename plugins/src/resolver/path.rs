use modlink_core::loader::NameResolver;

/// Resolves `./x` and `../x` against the directory of the referring module,
/// normalizing `.` and `..` segments. Leading `..` past the root are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl NameResolver for PathResolver {
    fn resolve(&self, name: &str, referrer: &str) -> String {
        let mut segments: Vec<&str> = referrer.split('/').filter(|s| !s.is_empty()).collect();
        // the referrer's own file name
        segments.pop();

        for seg in name.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_siblings_and_parents() {
        let r = PathResolver;
        assert_eq!(r.resolve("./util", "pkg/main"), "pkg/util");
        assert_eq!(r.resolve("../shared/log", "pkg/sub/main"), "pkg/shared/log");
        assert_eq!(r.resolve("./a/./b", "main"), "a/b");
        assert_eq!(r.resolve("../../x", "pkg/main"), "x");
    }
}
