use anyhow::Result;
use omnistamp::codecs::registry::HandlerRegistry;
use omnistamp::codecs::{BlockState, FileTypeCodec, HASH_CLOSE, HASH_OPEN};
use omnistamp::codecs::python::PythonCodec;
use omnistamp::core::digest;
use omnistamp::core::engine::{CorruptedPolicy, DirectoryOptions, StampEngine, StampOptions};
use omnistamp::core::report::{RunReport, StampStatus};
use regex::Regex;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn apply_options() -> StampOptions {
    StampOptions {
        author: Some("tester".into()),
        apply: true,
        corrupted: CorruptedPolicy::Regenerate,
        repair: false,
    }
}

/// Reads a top-level field value out of a `#`-commented block.
fn field(content: &str, name: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?m)^# {}: (.+)$", name)).unwrap();
    re.captures(content)
        .map(|c| c[1].trim_matches('\'').trim_matches('"').to_string())
}

#[test]
fn fresh_python_file_gets_block_with_new_identity() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "print('hello')\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let report = engine.stamp_path(&path);
    assert_eq!(report.status, StampStatus::Success);

    let run = RunReport::from_files(vec![report]);
    assert_eq!(run.exit_code(), 0);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with(HASH_OPEN));
    assert!(content.contains(HASH_CLOSE));
    assert!(content.ends_with("print('hello')\n"));

    let uuid = field(&content, "uuid").expect("uuid present");
    let uuid_re =
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap();
    assert!(uuid_re.is_match(&uuid), "uuid: {}", uuid);
    assert!(field(&content, "created_at").is_some());
    assert_eq!(field(&content, "author").as_deref(), Some("tester"));
    let hash = field(&content, "hash").expect("hash present");
    assert_eq!(hash.len(), 64);
}

#[test]
fn restamp_of_unmodified_output_is_byte_identical() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "x = 1\n\n\ny = 2\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());

    assert_eq!(engine.stamp_path(&path).status, StampStatus::Success);
    let first = fs::read_to_string(&path).unwrap();

    let report = engine.stamp_path(&path);
    assert_eq!(report.status, StampStatus::Unchanged);
    let second = fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);

    // And a third pass for good measure: still a fixpoint.
    assert_eq!(engine.stamp_path(&path).status, StampStatus::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn body_edit_preserves_identity_and_moves_hash() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "x = 1\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    engine.stamp_path(&path);

    let before = fs::read_to_string(&path).unwrap();
    let uuid_before = field(&before, "uuid").unwrap();
    let created_before = field(&before, "created_at").unwrap();
    let hash_before = field(&before, "hash").unwrap();

    let mut edited = before.clone();
    edited.push_str("z = 3\n");
    fs::write(&path, &edited).unwrap();

    let report = engine.stamp_path(&path);
    assert_eq!(report.status, StampStatus::Success);

    let after = fs::read_to_string(&path).unwrap();
    assert_eq!(field(&after, "uuid").unwrap(), uuid_before);
    assert_eq!(field(&after, "created_at").unwrap(), created_before);
    assert_ne!(field(&after, "hash").unwrap(), hash_before);
    assert!(after.ends_with("z = 3\n"));
}

#[test]
fn stamped_hash_matches_recomputed_digest() -> Result<()> {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "value = 42\n")?;

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    engine.stamp_path(&path);

    let content = fs::read_to_string(&path)?;
    let codec = PythonCodec;
    let extraction = codec.extract(&path, &content)?;
    let record = match extraction.block {
        BlockState::Present(record) => record,
        other => panic!("expected Present, got {:?}", other),
    };

    let recomputed = digest::record_digest(&record, &extraction.body)?;
    assert_eq!(record.hash.as_deref(), Some(recomputed.as_str()));
    Ok(())
}

#[test]
fn shebang_stays_on_line_zero_and_stamp_converges() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("script.py");
    fs::write(&path, "#!/usr/bin/env python\nimport os\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    engine.stamp_path(&path);

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "#!/usr/bin/env python");
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], HASH_OPEN);
    assert!(content.ends_with("import os\n"));

    let report = engine.stamp_path(&path);
    assert_eq!(report.status, StampStatus::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn tree_file_with_embedded_block_errors_untouched() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join(".onextree");
    let content = format!("{}\n# name: sneaky\n{}\nname: root\n", HASH_OPEN, HASH_CLOSE);
    fs::write(&path, &content).unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let report = engine.stamp_path(&path);

    assert_eq!(report.status, StampStatus::Error);
    assert!(
        report.messages.iter().any(|m| m.contains("not allowed")),
        "messages: {:?}",
        report.messages
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn clean_tree_file_is_left_alone() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join(".onextree");
    fs::write(&path, "name: root\nchildren: []\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let report = engine.stamp_path(&path);

    assert_eq!(report.status, StampStatus::Unchanged);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "name: root\nchildren: []\n"
    );
}

#[test]
fn malformed_block_under_strict_policy_is_an_error() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    let content = format!("{}\n# uuid: [broken\n{}\nx = 1\n", HASH_OPEN, HASH_CLOSE);
    fs::write(&path, &content).unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(
        &registry,
        StampOptions {
            corrupted: CorruptedPolicy::Strict,
            ..apply_options()
        },
    );
    let report = engine.stamp_path(&path);

    assert_eq!(report.status, StampStatus::Error);
    assert!(report.messages.iter().any(|m| m.contains("YAML parse error")));
    assert_eq!(fs::read_to_string(&path).unwrap(), content);

    let run = RunReport::from_files(vec![report]);
    assert_eq!(run.exit_code(), 1);
}

#[test]
fn repair_overrides_strict_policy() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(
        &path,
        format!("{}\n# uuid: [broken\n{}\nx = 1\n", HASH_OPEN, HASH_CLOSE),
    )
    .unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(
        &registry,
        StampOptions {
            corrupted: CorruptedPolicy::Strict,
            repair: true,
            ..apply_options()
        },
    );
    let report = engine.stamp_path(&path);

    assert_eq!(report.status, StampStatus::Warning);
    let content = fs::read_to_string(&path).unwrap();
    assert!(field(&content, "uuid").is_some());
    assert!(content.ends_with("x = 1\n"));
}

#[test]
fn dry_run_reports_without_writing() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "x = 1\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(
        &registry,
        StampOptions {
            apply: false,
            ..apply_options()
        },
    );
    let report = engine.stamp_path(&path);

    assert_eq!(report.status, StampStatus::Success);
    assert!(report.dry_run);
    assert!(report.hash.is_some());
    assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
}

fn seed_project(root: &Path) {
    fs::create_dir_all(root.join("pkg")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("target")).unwrap();
    fs::write(root.join("tool.py"), "print(1)\n").unwrap();
    fs::write(root.join("pkg/util.py"), "def f():\n    return 2\n").unwrap();
    fs::write(root.join("README.md"), "# Project\n\nWords.\n").unwrap();
    fs::write(root.join("conf.yaml"), "key: value\n").unwrap();
    fs::write(root.join(".gitignore"), "target/\n").unwrap();
    fs::write(root.join("notes.txt"), "unsupported\n").unwrap();
    fs::write(root.join(".git/config.py"), "never = 'touched'\n").unwrap();
    fs::write(root.join("target/gen.py"), "never = 'touched'\n").unwrap();
}

#[test]
fn directory_stamp_covers_eligible_files_and_converges() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    seed_project(root);

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let run = engine
        .stamp_directory(root, &DirectoryOptions::default())
        .expect("directory run");

    assert_eq!(run.files.len(), 5, "files: {:#?}", run.files);
    assert!(run.files.iter().all(|f| f.status == StampStatus::Success));
    assert_eq!(run.exit_code(), 0);

    // Ignored directories and unsupported files were never touched.
    assert_eq!(
        fs::read_to_string(root.join(".git/config.py")).unwrap(),
        "never = 'touched'\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("target/gen.py")).unwrap(),
        "never = 'touched'\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("notes.txt")).unwrap(),
        "unsupported\n"
    );

    // Second run: every file is already settled.
    let rerun = engine
        .stamp_directory(root, &DirectoryOptions::default())
        .expect("rerun");
    assert!(rerun.files.iter().all(|f| f.status == StampStatus::Unchanged));
    assert_eq!(rerun.exit_code(), 0);
}

#[test]
fn directory_stamp_include_filter_restricts_and_warns() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    seed_project(root);

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let opts = DirectoryOptions {
        include: vec!["py".to_string(), "txt".to_string()],
        ..Default::default()
    };
    let run = engine.stamp_directory(root, &opts).expect("directory run");

    let stamped: Vec<&str> = run
        .files
        .iter()
        .filter(|f| f.status == StampStatus::Success)
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(stamped.len(), 2);
    assert!(stamped.iter().all(|p| p.ends_with(".py")));

    // The txt file was explicitly included but has no codec: warning.
    assert!(run.files.iter().any(|f| {
        f.status == StampStatus::Warning && f.path.ends_with("notes.txt")
    }));
    assert_eq!(run.exit_code(), 1);

    // Markdown/YAML/ignore files were filtered out entirely.
    assert_eq!(
        fs::read_to_string(root.join("README.md")).unwrap(),
        "# Project\n\nWords.\n"
    );
}

#[test]
fn non_recursive_run_stays_at_top_level() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    seed_project(root);

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let opts = DirectoryOptions {
        recursive: false,
        ..Default::default()
    };
    engine.stamp_directory(root, &opts).expect("directory run");

    assert_eq!(
        fs::read_to_string(root.join("pkg/util.py")).unwrap(),
        "def f():\n    return 2\n"
    );
    let top = fs::read_to_string(root.join("tool.py")).unwrap();
    assert!(top.starts_with(HASH_OPEN));
}

#[test]
fn parallel_directory_run_stamps_every_file_once() -> Result<()> {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    for i in 0..40 {
        fs::write(root.join(format!("mod_{:02}.py", i)), format!("v = {}\n", i))?;
    }

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    let run = engine.stamp_directory(root, &DirectoryOptions::default())?;

    assert_eq!(run.files.len(), 40);
    assert!(run.files.iter().all(|f| f.status == StampStatus::Success));

    // No stray temp files from atomic writes.
    let leftovers: Vec<String> = fs::read_dir(root)?
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| !n.ends_with(".py"))
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);

    let rerun = engine.stamp_directory(root, &DirectoryOptions::default())?;
    assert!(rerun.files.iter().all(|f| f.status == StampStatus::Unchanged));
    Ok(())
}

#[test]
fn named_missing_or_unsupported_paths_are_fatal() {
    let tmp = tempdir().expect("tempdir");
    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());

    let missing = tmp.path().join("ghost.py");
    assert!(engine.stamp_files(&[missing]).is_err());

    let unsupported = tmp.path().join("main.rs");
    fs::write(&unsupported, "fn main() {}\n").unwrap();
    assert!(engine.stamp_files(&[unsupported]).is_err());
}

#[test]
fn author_override_moves_hash_but_not_identity() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tool.py");
    fs::write(&path, "x = 1\n").unwrap();

    let registry = HandlerRegistry::with_defaults().expect("registry");
    let engine = StampEngine::new(&registry, apply_options());
    engine.stamp_path(&path);
    let before = fs::read_to_string(&path).unwrap();

    let other = StampEngine::new(
        &registry,
        StampOptions {
            author: Some("someone-else".into()),
            ..apply_options()
        },
    );
    let report = other.stamp_path(&path);
    assert_eq!(report.status, StampStatus::Success);

    let after = fs::read_to_string(&path).unwrap();
    assert_eq!(field(&after, "uuid"), field(&before, "uuid"));
    assert_eq!(field(&after, "created_at"), field(&before, "created_at"));
    assert_eq!(field(&after, "author").as_deref(), Some("someone-else"));
    assert_ne!(field(&after, "hash"), field(&before, "hash"));
}
