use metasort::cli::{SortCommand, run_cli};
use metasort::history::HISTORY_FILE_NAME;
/// Integration tests for metasort
///
/// These tests run the complete scan, plan, sort and undo workflow against
/// real temporary directories.
///
/// Test categories:
/// 1. Sorting through the command layer
/// 2. Dry-run previews
/// 3. Undo and history handling
/// 4. Ranking
/// 5. Library workflows with custom extractors
/// 6. Edge cases and error scenarios
use metasort::{
    AttributeMap, Blacklist, CompiledFilters, Error, ExtensionFilter, OperationHistory, Result,
    SortLevels, SortSession,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture that sets up a temporary directory with configurable
/// file structure for testing.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_file(&self, name: &str, content: &[u8]) {
        let file_path = self.path().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content)
            .expect("Failed to write file content");
    }

    fn create_text_file(&self, name: &str, content: &str) {
        self.create_file(name, content.as_bytes());
    }

    fn create_subdir(&self, name: &str) {
        let dir_path = self.path().join(name);
        fs::create_dir(&dir_path).expect("Failed to create subdirectory");
    }

    fn create_files(&self, files: &[(&str, &[u8])]) {
        for (name, content) in files {
            self.create_file(name, content);
        }
    }

    fn assert_dir_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_dir(),
            "Directory should exist: {}",
            path.display()
        );
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    /// Count directories in the test directory (non-recursive).
    fn count_dirs(&self) -> usize {
        fs::read_dir(self.path())
            .expect("Failed to read directory")
            .filter_map(|entry| entry.ok())
            .filter(|e| e.path().is_dir())
            .count()
    }

    /// List all files recursively, relative to the root, excluding the history file.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), &mut files);
        let mut relative: Vec<PathBuf> = files
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|n| n != HISTORY_FILE_NAME))
            .filter_map(|p| p.strip_prefix(self.path()).ok().map(Path::to_path_buf))
            .collect();
        relative.sort();
        relative
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }

    fn sort(&self, levels: &[&str], extensions: &[&str], dry_run: bool) -> Result<()> {
        run_cli(
            SortCommand::Sort {
                dir: self.path().to_path_buf(),
                levels: levels.iter().map(|l| l.to_string()).collect(),
                extensions: extensions.iter().map(|e| e.to_string()).collect(),
                dry_run,
            },
            None,
        )
    }

    fn undo(&self) -> Result<()> {
        run_cli(
            SortCommand::Undo {
                dir: self.path().to_path_buf(),
            },
            None,
        )
    }
}

/// Extractor that reads `key=value` lines from the file itself.
fn key_value_extractor(path: &Path) -> Result<AttributeMap> {
    let content = fs::read_to_string(path).map_err(|e| Error::ExtractionFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

// ============================================================================
// Test Data
// ============================================================================

/// PNG file header (minimal, just enough to be detected as PNG)
const PNG_HEADER: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 image
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, // bit depth, color
    0xDE,
];

/// PDF file header (minimal)
const PDF_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

// ============================================================================
// Test Suite 1: Sorting
// ============================================================================

#[test]
fn test_sort_by_content_category() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("photo.png", PNG_HEADER), ("report.pdf", PDF_HEADER)]);
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &[], false)
        .expect("Sort should succeed");

    fixture.assert_file_exists("Images/photo.png");
    fixture.assert_file_exists("Documents/report.pdf");
    fixture.assert_file_exists("Documents/notes.txt");
    fixture.assert_not_exists("photo.png");
    fixture.assert_file_exists(HISTORY_FILE_NAME);
}

#[test]
fn test_sort_two_levels() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("photo.png", PNG_HEADER), ("report.pdf", PDF_HEADER)]);
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category", "File-Extension"], &[], false)
        .expect("Sort should succeed");

    assert_eq!(
        fixture.list_files_recursive(),
        vec![
            PathBuf::from("Documents/pdf/report.pdf"),
            PathBuf::from("Documents/txt/notes.txt"),
            PathBuf::from("Images/png/photo.png"),
        ]
    );
}

#[test]
fn test_extension_filter_leaves_other_files() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.png", PNG_HEADER);
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &["PNG"], false)
        .expect("Sort should succeed");

    fixture.assert_file_exists("Images/photo.png");
    fixture.assert_file_exists("notes.txt");
    fixture.assert_not_exists("Documents");
}

#[test]
fn test_missing_attribute_goes_to_unknown_folder() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Artist"], &[], false)
        .expect("Sort should succeed");

    fixture.assert_file_exists("Unknown_Artist/notes.txt");
}

#[test]
fn test_hidden_files_and_subdirectories_stay_put() {
    let fixture = TestFixture::new();
    fixture.create_text_file(".hidden", "secret");
    fixture.create_subdir("keep");
    fixture.create_text_file("keep/inner.txt", "inner");
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &[], false)
        .expect("Sort should succeed");

    fixture.assert_file_exists(".hidden");
    fixture.assert_file_exists("keep/inner.txt");
    fixture.assert_file_exists("Documents/notes.txt");
}

#[test]
fn test_sort_empty_directory() {
    let fixture = TestFixture::new();

    fixture
        .sort(&["Content-Category"], &[], false)
        .expect("Sort should succeed on empty directory");

    assert_eq!(fixture.count_dirs(), 0);
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

// ============================================================================
// Test Suite 2: Dry Run
// ============================================================================

#[test]
fn test_dry_run_moves_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.png", PNG_HEADER);
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &[], true)
        .expect("Dry run should succeed");

    fixture.assert_file_exists("photo.png");
    fixture.assert_file_exists("notes.txt");
    assert_eq!(fixture.count_dirs(), 0);
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

// ============================================================================
// Test Suite 3: Undo
// ============================================================================

#[test]
fn test_sort_then_undo_restores_layout() {
    let fixture = TestFixture::new();
    fixture.create_files(&[("photo.png", PNG_HEADER), ("report.pdf", PDF_HEADER)]);
    fixture.create_text_file("notes.txt", "plain text");
    let before = fixture.list_files_recursive();

    fixture
        .sort(&["Content-Category", "File-Extension"], &[], false)
        .expect("Sort should succeed");
    fixture.undo().expect("Undo should succeed");

    assert_eq!(fixture.list_files_recursive(), before);
    assert_eq!(fixture.count_dirs(), 0, "Emptied folders should be removed");
    fixture.assert_not_exists(HISTORY_FILE_NAME);
}

#[test]
fn test_undo_keeps_preexisting_directories() {
    let fixture = TestFixture::new();
    fixture.create_subdir("Documents");
    fixture.create_text_file("Documents/old.txt", "already here");
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &[], false)
        .expect("Sort should succeed");
    fixture.assert_file_exists("Documents/notes.txt");

    fixture.undo().expect("Undo should succeed");
    fixture.assert_file_exists("notes.txt");
    fixture.assert_file_exists("Documents/old.txt");
    fixture.assert_dir_exists("Documents");
}

#[test]
fn test_undo_without_history() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "plain text");

    let result = fixture.undo();
    assert!(matches!(result, Err(Error::NoHistory { .. })));
}

#[test]
fn test_second_undo_has_nothing_to_do() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "plain text");

    fixture
        .sort(&["Content-Category"], &[], false)
        .expect("Sort should succeed");
    fixture.undo().expect("First undo should succeed");

    assert!(matches!(fixture.undo(), Err(Error::NoHistory { .. })));
    fixture.assert_file_exists("notes.txt");
}

#[test]
fn test_undo_skips_files_moved_away() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "a");
    fixture.create_text_file("b.txt", "b");

    fixture
        .sort(&["File-Extension"], &[], false)
        .expect("Sort should succeed");
    fs::remove_file(fixture.path().join("txt/b.txt")).unwrap();

    let root = fs::canonicalize(fixture.path()).unwrap();
    let history = OperationHistory::load(&root).unwrap();
    let mut session = SortSession::with_history(history, CompiledFilters::default());
    let report = session.revert();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped.len(), 1);
    fixture.assert_file_exists("a.txt");
    fixture.assert_not_exists("b.txt");
    fixture.assert_not_exists("txt");
}

// ============================================================================
// Test Suite 4: Ranking
// ============================================================================

#[test]
fn test_rank_command() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.png", PNG_HEADER);
    fixture.create_text_file("notes.txt", "plain text");

    let result = run_cli(
        SortCommand::Rank {
            dir: fixture.path().to_path_buf(),
            blacklist: None,
            limit: Some(3),
        },
        None,
    );

    assert!(result.is_ok());
    fixture.assert_file_exists("photo.png");
}

#[test]
fn test_ranking_counts_and_blacklist() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one.txt", "Artist=Queen\nAlbum=Innuendo\nX-Parsed-By=parser");
    fixture.create_text_file("two.txt", "Artist=ABBA\nX-Parsed-By=parser");
    fixture.create_text_file("three.txt", "Artist=Queen\nX-Parsed-By=parser");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    session.scan(&key_value_extractor, None).unwrap();

    let ranking = session.rank(&Blacklist::parse("X-Parsed\n"));
    let names: Vec<(&str, usize)> = ranking
        .iter()
        .map(|attr| (attr.name.as_str(), attr.count))
        .collect();
    assert_eq!(names, vec![("Artist", 3), ("Album", 1)]);

    // the same store ranks the same way every time
    let again = session.rank(&Blacklist::parse("X-Parsed\n"));
    assert_eq!(ranking, again);
}

// ============================================================================
// Test Suite 5: Library Workflows
// ============================================================================

#[test]
fn test_values_are_sanitized_into_folder_names() {
    let fixture = TestFixture::new();
    fixture.create_text_file("song.txt", "Artist=AC/DC\nAlbum=  Back: In Black ");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    session.scan(&key_value_extractor, None).unwrap();
    let levels = SortLevels::new(["Artist", "Album"]).unwrap();
    session.sort(&levels, &ExtensionFilter::default()).unwrap();

    fixture.assert_file_exists("AC_DC/Back_ In Black/song.txt");
}

#[test]
fn test_partial_failure_is_revertible() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "Artist=First");
    fixture.create_text_file("b.txt", "Artist=Second");
    fixture.create_text_file("c.txt", "Artist=Third");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    session.scan(&key_value_extractor, None).unwrap();

    // a regular file where the second folder has to go
    fixture.create_text_file("Second", "in the way");

    let levels = SortLevels::new(["Artist"]).unwrap();
    let result = session.sort(&levels, &ExtensionFilter::default());
    assert!(matches!(result, Err(Error::DirectoryCreationFailed { .. })));
    assert_eq!(session.history().len(), 1);
    fixture.assert_file_exists("First/a.txt");
    fixture.assert_file_exists("b.txt");
    fixture.assert_file_exists("c.txt");

    let report = session.revert();
    assert_eq!(report.restored, 1);
    assert!(report.is_complete_success());
    fixture.assert_file_exists("a.txt");
    fixture.assert_not_exists("First");
    fixture.assert_file_exists("Second");
}

#[test]
fn test_revert_without_sort_is_noop() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "Artist=First");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    let report = session.revert();

    assert_eq!(report.total_processed(), 0);
    assert_eq!(report.removed_dirs, 0);
    fixture.assert_file_exists("a.txt");
}

// ============================================================================
// Test Suite 6: Edge Cases
// ============================================================================

#[test]
fn test_duplicate_levels_rejected() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "plain text");

    let result = fixture.sort(&["Content-Category", "Content-Category"], &[], false);
    assert!(matches!(result, Err(Error::InvalidLevels { .. })));
    fixture.assert_file_exists("notes.txt");
}

#[test]
fn test_sort_nonexistent_directory() {
    let result = run_cli(
        SortCommand::Sort {
            dir: PathBuf::from("/non/existent/path"),
            levels: vec!["Content-Category".to_string()],
            extensions: Vec::new(),
            dry_run: false,
        },
        None,
    );

    assert!(matches!(result, Err(Error::InvalidBasePath { .. })));
}

#[test]
fn test_sort_again_replaces_history() {
    let fixture = TestFixture::new();
    fixture.create_text_file("notes.txt", "plain text");
    fixture.create_file("photo.png", PNG_HEADER);

    fixture
        .sort(&["Content-Category"], &["txt"], false)
        .expect("First sort should succeed");
    fixture
        .sort(&["Content-Category"], &["png"], false)
        .expect("Second sort should succeed");

    let root = fs::canonicalize(fixture.path()).unwrap();
    let history = OperationHistory::load(&root).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history.records[0].target.ends_with("Images/photo.png"));

    fixture.undo().expect("Undo should succeed");
    fixture.assert_file_exists("photo.png");
    fixture.assert_file_exists("Documents/notes.txt");
}

#[test]
fn test_undo_in_copied_folder_leaves_original_alone() {
    let fixture = TestFixture::new();
    fixture.create_subdir("music");
    fixture.create_text_file("music/notes.txt", "plain text");
    let music = fixture.path().join("music");

    run_cli(
        SortCommand::Sort {
            dir: music.clone(),
            levels: vec!["Content-Category".to_string()],
            extensions: Vec::new(),
            dry_run: false,
        },
        None,
    )
    .expect("Sort should succeed");

    // a copy of the sorted folder, history file included
    fixture.create_subdir("backup");
    fixture.create_subdir("backup/Documents");
    fs::copy(
        music.join("Documents/notes.txt"),
        fixture.path().join("backup/Documents/notes.txt"),
    )
    .unwrap();
    fs::copy(
        music.join(HISTORY_FILE_NAME),
        fixture.path().join("backup").join(HISTORY_FILE_NAME),
    )
    .unwrap();

    let result = run_cli(
        SortCommand::Undo {
            dir: fixture.path().join("backup"),
        },
        None,
    );

    assert!(matches!(result, Err(Error::InvalidHistoryFormat { .. })));
    fixture.assert_file_exists("music/Documents/notes.txt");
    fixture.assert_file_exists("backup/Documents/notes.txt");
    fixture.assert_not_exists("music/notes.txt");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_name_does_not_stop_the_run() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fixture = TestFixture::new();
    let odd_name = OsStr::from_bytes(b"a\xff.txt");
    // some filesystems refuse non UTF-8 names outright
    if fs::write(fixture.path().join(odd_name), "Artist=Queen").is_err() {
        return;
    }
    fixture.create_text_file("b.txt", "Artist=Queen");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    let report = session.scan(&key_value_extractor, None).unwrap();
    assert_eq!(report.failed.len(), 1);

    let levels = SortLevels::new(["Artist"]).unwrap();
    session
        .sort(&levels, &ExtensionFilter::default())
        .expect("Sort should succeed");

    fixture.assert_file_exists("Queen/b.txt");
    assert!(fixture.path().join(odd_name).is_file());
}

#[test]
fn test_control_characters_do_not_stop_the_run() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "Artist=Queen\0David Bowie");
    fixture.create_text_file("b.txt", "Artist=Queen");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    session.scan(&key_value_extractor, None).unwrap();
    let levels = SortLevels::new(["Artist"]).unwrap();
    session
        .sort(&levels, &ExtensionFilter::default())
        .expect("Sort should succeed");

    fixture.assert_file_exists("Queen_David Bowie/a.txt");
    fixture.assert_file_exists("Queen/b.txt");
}

#[test]
fn test_failed_rename_keeps_only_completed_moves() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.txt", "Artist=Queen");
    fixture.create_text_file("b.txt", "Artist=Queen");
    fixture.create_text_file("c.txt", "Artist=Queen");

    let mut session = SortSession::new(fixture.path(), CompiledFilters::default());
    session.scan(&key_value_extractor, None).unwrap();

    // a non-empty directory where b.txt has to land
    fs::create_dir_all(fixture.path().join("Queen/b.txt")).unwrap();
    fixture.create_text_file("Queen/b.txt/keep", "k");

    let levels = SortLevels::new(["Artist"]).unwrap();
    let result = session.sort(&levels, &ExtensionFilter::default());
    assert!(matches!(result, Err(Error::MoveFailed { .. })));
    assert_eq!(session.history().len(), 1);

    let report = session.revert();
    assert_eq!(report.restored, 1);
    fixture.assert_file_exists("a.txt");
    fixture.assert_file_exists("b.txt");
    fixture.assert_file_exists("c.txt");
    fixture.assert_file_exists("Queen/b.txt/keep");
}
