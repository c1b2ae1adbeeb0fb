//! Rolling, retention and background zip archives of rotating file handlers.
//!
//! Every test renders `$message$` entries of a fixed size: `- log: entry-NN\n`
//! is 16 bytes, so with `max_bytes = 40` a roll follows every third entry.

mod common;

use common::{files_with_prefix, line_tree, zip_entries};
use nrt_logging::{Logger, RotationPolicy, StreamHandler, enter_frame};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const MAX_BYTES: u64 = 40;

fn rotating(path: &Path, max_archive_files: usize, compress: bool) -> Arc<StreamHandler> {
    let handler = StreamHandler::rotating_file(
        path,
        RotationPolicy {
            max_bytes: MAX_BYTES,
            max_archive_files,
            compress,
        },
    );
    handler.set_line_template("$message$");
    Arc::new(handler)
}

fn write_entries(handler: &StreamHandler, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        handler.info(format!("entry-{i:02}"))?;
    }
    Ok(())
}

fn archive_suffix_ok(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let suffix = name
        .strip_prefix("app.log.")
        .unwrap_or_default()
        .trim_end_matches(".zip");
    let parts: Vec<&str> = suffix.split('-').collect();
    parts.len() >= 3
        && parts[0].len() == 8
        && parts[1].len() == 6
        && parts[2].len() == 6
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
}

/// Archives on disk, counting the plain and zip form of one archive once.
fn archive_count(dir: &Path) -> usize {
    files_with_prefix(dir, "app.log.")
        .iter()
        .filter(|p| archive_suffix_ok(p))
        .filter_map(|p| p.file_name()?.to_str().map(|n| n.trim_end_matches(".zip").to_string()))
        .collect::<BTreeSet<_>>()
        .len()
}

#[test]
fn test_rolls_once_per_threshold_crossing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 5, false);

    write_entries(&handler, 10)?;
    handler.close()?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 3, "{archives:?}");
    assert!(archives.iter().all(|p| archive_suffix_ok(p)), "{archives:?}");
    let contents: Vec<String> = archives
        .iter()
        .map(|p| fs::read_to_string(p).map(|text| line_tree(&text)))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        contents,
        [
            "entry-00 entry-01 entry-02",
            "entry-03 entry-04 entry-05",
            "entry-06 entry-07 entry-08",
        ]
    );
    assert_eq!(line_tree(&fs::read_to_string(&active)?), "entry-09");
    Ok(())
}

#[test]
fn test_retention_keeps_newest_archives() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 2, false);

    write_entries(&handler, 10)?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 2, "{archives:?}");
    assert_eq!(
        line_tree(&fs::read_to_string(&archives[0])?),
        "entry-03 entry-04 entry-05"
    );
    assert_eq!(
        line_tree(&fs::read_to_string(&archives[1])?),
        "entry-06 entry-07 entry-08"
    );
    Ok(())
}

#[test]
fn test_zero_archives_discards_rolled_files() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 0, true);

    write_entries(&handler, 7)?;
    handler.close()?;

    assert!(files_with_prefix(dir.path(), "app.log.").is_empty());
    assert_eq!(line_tree(&fs::read_to_string(&active)?), "entry-06");
    Ok(())
}

#[test]
fn test_compressed_archives_hold_one_labelled_entry() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 5, true);

    write_entries(&handler, 10)?;
    handler.close()?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 3, "{archives:?}");
    let mut trees = Vec::new();
    for archive in &archives {
        let name = archive.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.ends_with(".zip"), "{name}");
        assert!(archive_suffix_ok(archive), "{name}");

        let entries = zip_entries(archive);
        assert_eq!(entries.len(), 1);
        let (entry_name, contents) = &entries[0];
        assert_eq!(entry_name, &format!("app_{}", name.trim_end_matches(".zip")));
        trees.push(line_tree(contents));
    }
    assert_eq!(
        trees,
        [
            "entry-00 entry-01 entry-02",
            "entry-03 entry-04 entry-05",
            "entry-06 entry-07 entry-08",
        ]
    );
    Ok(())
}

#[test]
fn test_compressed_retention_after_close() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 1, true);

    write_entries(&handler, 10)?;
    handler.close()?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 1, "{archives:?}");
    let entries = zip_entries(&archives[0]);
    assert_eq!(line_tree(&entries[0].1), "entry-06 entry-07 entry-08");
    Ok(())
}

#[test]
fn test_archive_label_names_zip_entry() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let handler = rotating(&active, 5, true);
    handler.set_archive_label("billing");

    write_entries(&handler, 3)?;
    handler.close()?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 1);
    let (entry_name, _) = &zip_entries(&archives[0])[0];
    assert!(entry_name.starts_with("billing_app.log."), "{entry_name}");
    Ok(())
}

#[test]
fn test_existing_file_counts_toward_limit() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    fs::write(&active, "- log: old\n- log: old\n- log: old\n")?;
    let handler = rotating(&active, 5, false);

    write_entries(&handler, 1)?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 1);
    assert_eq!(
        line_tree(&fs::read_to_string(&archives[0])?),
        "old old old entry-00"
    );
    assert_eq!(fs::read_to_string(&active)?, "");
    Ok(())
}

fn caller(logger: &Logger) -> anyhow::Result<()> {
    enter_frame!();
    logger.info("A1")?;
    callee(logger, &["B1", "B2", "B3"])?;
    logger.info("A2")?;
    Ok(())
}

fn callee(logger: &Logger, messages: &[&str]) -> anyhow::Result<()> {
    enter_frame!();
    for message in messages {
        logger.info(*message)?;
    }
    Ok(())
}

#[test]
fn test_each_file_is_a_complete_tree() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let active = dir.path().join("app.log");
    let logger = Logger::new("tree");
    logger.add_stream_handler(rotating(&active, 5, false), true);

    caller(&logger)?;

    let archives = files_with_prefix(dir.path(), "app.log.");
    assert_eq!(archives.len(), 1);
    assert_eq!(line_tree(&fs::read_to_string(&archives[0])?), "A1(B1 B2)");
    assert_eq!(line_tree(&fs::read_to_string(&active)?), "B3 A2");
    Ok(())
}

#[test]
fn test_compressed_archive_count_stays_within_limit_after_every_write() -> anyhow::Result<()> {
    for max_archive_files in [1, 3] {
        let dir = TempDir::new()?;
        let active = dir.path().join("app.log");
        let handler = rotating(&active, max_archive_files, true);

        for i in 0..300 {
            handler.info(format!("entry-{:02}", i % 100))?;
            let count = archive_count(dir.path());
            assert!(
                count <= max_archive_files,
                "{count} archives on disk after entry {i}, limit {max_archive_files}"
            );
        }
        handler.close()?;

        assert_eq!(archive_count(dir.path()), max_archive_files);
        let leftovers: Vec<_> = files_with_prefix(dir.path(), "app.log.")
            .into_iter()
            .filter(|p| !p.to_string_lossy().ends_with(".zip"))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }
    Ok(())
}
