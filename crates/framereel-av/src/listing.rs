//! Directory listing helpers.
//!
//! Both functions look at a single directory level and return their
//! results sorted, so the position of a path in the returned vector can be
//! used as its frame index.

use std::path::{Path, PathBuf};

use framereel_core::Result;
use walkdir::WalkDir;

/// Regular files directly inside `dir` whose extension matches one of
/// `extensions`, case-insensitively, sorted by path.
///
/// Extensions may be given with or without the leading dot.
pub fn find_files_with_extensions(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let wanted: Vec<&str> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(dir = %dir.display(), count = files.len(), "listed frame files");
    Ok(files)
}

/// Sub-directories directly inside `base` whose path contains `pattern`,
/// sorted by path.
pub fn find_sub_dirs_with_pattern(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(base).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() && entry.path().to_string_lossy().contains(pattern) {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts() -> Vec<String> {
        vec![".jpeg".into(), ".jpg".into(), ".png".into()]
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn filters_and_sorts_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.JPEG", "notes.txt", "d.jpg.bak", "noext"] {
            touch(tmp.path(), name);
        }

        let files = find_files_with_extensions(tmp.path(), &exts()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.JPEG"]);
    }

    #[test]
    fn skips_directories_and_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("sub.png")).unwrap();
        touch(&tmp.path().join("sub.png"), "nested.png");
        touch(tmp.path(), "top.png");

        let files = find_files_with_extensions(tmp.path(), &exts()).unwrap();
        assert_eq!(files, vec![tmp.path().join("top.png")]);
    }

    #[test]
    fn extensions_without_dot_work() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "x.Png");
        let files = find_files_with_extensions(tmp.path(), &["png".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn zero_padded_names_sort_numerically() {
        let tmp = tempfile::tempdir().unwrap();
        for i in [10, 2, 1, 0] {
            touch(tmp.path(), &format!("frame_{i:05}.png"));
        }
        let files = find_files_with_extensions(tmp.path(), &exts()).unwrap();
        assert!(files[0].ends_with("frame_00000.png"));
        assert!(files[3].ends_with("frame_00010.png"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_files_with_extensions(&tmp.path().join("nope"), &exts()).is_err());
    }

    #[test]
    fn sub_dirs_matching_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["Video_2", "Video_1", "Other", "video_lower"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        touch(tmp.path(), "Video_file.txt");

        let dirs = find_sub_dirs_with_pattern(tmp.path(), "Video_").unwrap();
        assert_eq!(
            dirs,
            vec![tmp.path().join("Video_1"), tmp.path().join("Video_2")]
        );
    }
}
