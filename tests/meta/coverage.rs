//! Structural checks: every source file has a unit test file and vice versa

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::io;
    use std::path::Path;

    const TEST_MARKERS: [&str; 2] = ["#[test]", "#[tokio::test"];

    // Entry points and module organization files need no test file of their own
    fn needs_counterpart(relative: &str) -> bool {
        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        !matches!(file_name, "main.rs" | "lib.rs" | "mod.rs")
    }

    fn rust_files(dir: &Path, base: &Path, found: &mut BTreeSet<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                rust_files(&path, base, found)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                let relative = path
                    .strip_prefix(base)
                    .map_err(|_| io::Error::other("path outside of its base"))?;
                found.insert(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }

    fn collect(dir: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let base = Path::new(dir);
        if let Err(error) = rust_files(base, base, &mut found) {
            panic!("Failed to scan {dir}: {error}");
        }
        found
    }

    // Tests every source module is mirrored under tests/unit
    // Verified by deleting one unit test file
    #[test]
    fn test_all_src_files_have_unit_tests() {
        let tests = collect("tests/unit");
        let missing: Vec<String> = collect("src")
            .into_iter()
            .filter(|path| needs_counterpart(path) && !tests.contains(path))
            .map(|path| format!("  - src/{path} -> tests/unit/{path}"))
            .collect();

        assert!(
            missing.is_empty(),
            "Source files without unit tests:\n{}",
            missing.join("\n")
        );
    }

    // Tests no unit test file outlives its source module
    // Verified by adding a test file with no source counterpart
    #[test]
    fn test_all_unit_tests_have_src_counterparts() {
        let sources = collect("src");
        let orphaned: Vec<String> = collect("tests/unit")
            .into_iter()
            .filter(|path| needs_counterpart(path) && !sources.contains(path))
            .map(|path| format!("  - tests/unit/{path} -> src/{path} (missing)"))
            .collect();

        assert!(
            orphaned.is_empty(),
            "Unit test files without a source file:\n{}",
            orphaned.join("\n")
        );
    }

    // Tests every test file declares at least one test
    // Verified by removing the test attribute from one file
    #[test]
    fn test_all_test_files_contain_tests() {
        let mut empty = Vec::new();
        for relative in collect("tests") {
            if !needs_counterpart(&relative) {
                continue;
            }
            let path = Path::new("tests").join(&relative);
            let content = fs::read_to_string(&path).unwrap_or_default();
            if !TEST_MARKERS.iter().any(|marker| content.contains(marker)) {
                empty.push(format!("  - {}", path.display()));
            }
        }

        assert!(
            empty.is_empty(),
            "Test files without any test functions:\n{}",
            empty.join("\n")
        );
    }
}
