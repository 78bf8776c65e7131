use gradebookd::backup;
use gradebookd::{Assignment, SchoolClass, Store, Student, StudentSubmission};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos(),
        uuid::Uuid::new_v4()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Store with one class, one student and a graded submission holding a scan.
fn populated(root: &Path) -> (String, String) {
    let mut store = Store::open(root);
    let class = SchoolClass::new("Terminale");
    let class_id = class.id.clone();
    store.add_class(class).expect("add class");
    let student = Student::new("Marie Curie", &class_id);
    let student_id = student.id.clone();
    store.add_student(student).expect("add student");
    let assignment = Assignment::new("Lab report", &class_id, None);
    let assignment_id = assignment.id.clone();
    store.add_assignment(assignment).expect("add assignment");

    let scan = root.join("scan.jpg");
    std::fs::write(&scan, [0xFF, 0xD8, 0xFF, 0xE0, 0, 1, 2]).expect("write scan");
    let mut sub = StudentSubmission::new(&student_id, &assignment_id);
    sub.image_paths.push(
        store
            .images()
            .import_image(&scan, &sub.id)
            .expect("import scan"),
    );
    sub.final_grade = Some(17.5);
    let sub_id = sub.id.clone();
    store.add_submission(sub).expect("add submission");
    (class_id, sub_id)
}

#[test]
fn zip_export_and_import_roundtrip() {
    let source = temp_dir("gradebook-backup-src");
    let target = temp_dir("gradebook-backup-dst");
    let out_dir = temp_dir("gradebook-backup-out");
    let (class_id, sub_id) = populated(&source);

    let bundle_path = out_dir.join("gradebook.zip");
    let export =
        backup::export_data_bundle(&source.join("data"), &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    // manifest + classes, students, assignments, submissions, rubrics + one scan
    assert_eq!(export.entry_count, 7);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    archive
        .by_name("data/classes.json")
        .expect("classes entry in bundle");
    archive
        .by_name(&format!("images/{}/scan.jpg", sub_id))
        .expect("scan entry in bundle");
    assert!(archive.by_name("data/tests.json").is_err());

    // Something already present in the target is replaced wholesale.
    let stale = Store::open(&target);
    drop(stale);
    std::fs::write(target.join("data/images/leftover.png"), b"x").expect("write leftover");

    let import = backup::import_data_bundle(&bundle_path, &target.join("data"))
        .expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.entry_count, 6);
    assert!(!target.join("data/images/leftover.png").exists());
    assert!(!target.join("data.importing").exists());
    assert!(!target.join("data.previous").exists());

    let original = Store::open(&source);
    let restored = Store::open(&target);
    assert_eq!(restored.class(&class_id), original.class(&class_id));
    assert_eq!(restored.submission(&sub_id), original.submission(&sub_id));
    assert_eq!(restored.rubrics(), original.rubrics());
    let rel = restored
        .submission(&sub_id)
        .map(|s| s.image_paths[0].clone())
        .expect("image path");
    assert!(restored.images().load(&rel).is_some());

    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_bundle_leaves_live_data_alone() {
    let source = temp_dir("gradebook-tamper-src");
    let out_dir = temp_dir("gradebook-tamper-out");
    let (class_id, _) = populated(&source);
    let classes_before = std::fs::read(source.join("data/classes.json")).expect("read classes");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let out = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        let manifest = serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "version": 1,
            "appVersion": "0.0.0",
            "exportedAt": "2026-01-01T00:00:00Z",
            "entries": [{
                "name": "data/classes.json",
                "size": 2,
                "sha256": "0000000000000000000000000000000000000000000000000000000000000000"
            }]
        });
        zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
        zip.start_file("data/classes.json", opts).expect("classes");
        zip.write_all(b"[]").expect("write classes");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_data_bundle(&bundle_path, &source.join("data"))
        .expect_err("tampered bundle must be rejected");
    assert!(format!("{:#}", err).contains("checksum mismatch"));
    assert_eq!(
        std::fs::read(source.join("data/classes.json")).expect("reread classes"),
        classes_before
    );
    assert!(!source.join("data.importing").exists());
    assert!(Store::open(&source).class(&class_id).is_some());

    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn foreign_zip_is_rejected() {
    let dir = temp_dir("gradebook-foreign");
    let bundle_path = dir.join("other.zip");
    {
        let out = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(out);
        zip.start_file("manifest.json", zip::write::FileOptions::default())
            .expect("manifest");
        zip.write_all(br#"{"format":"something-else","version":3,"appVersion":"1","exportedAt":"2026-01-01T00:00:00Z","entries":[]}"#)
            .expect("write manifest");
        zip.finish().expect("finish zip");
    }
    let err = backup::import_data_bundle(&bundle_path, &dir.join("data"))
        .expect_err("foreign bundle");
    assert!(err.to_string().contains("unsupported bundle format"));
    assert!(!dir.join("data").exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn oversized_entry_is_rejected_before_reading() {
    let source = temp_dir("gradebook-oversize-src");
    let out_dir = temp_dir("gradebook-oversize-out");
    let (class_id, _) = populated(&source);
    let classes_before = std::fs::read(source.join("data/classes.json")).expect("read classes");

    let bundle_path = out_dir.join("oversized.zip");
    {
        let out = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        let manifest = serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "version": 1,
            "appVersion": "0.0.0",
            "exportedAt": "2026-01-01T00:00:00Z",
            "entries": [{
                "name": "data/classes.json",
                "size": 2,
                "sha256": "0000000000000000000000000000000000000000000000000000000000000000"
            }]
        });
        zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
        zip.start_file("data/classes.json", opts).expect("classes");
        zip.write_all(&vec![b' '; 1 << 20]).expect("write classes");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_data_bundle(&bundle_path, &source.join("data"))
        .expect_err("oversized entry must be rejected");
    assert!(format!("{:#}", err).contains("size mismatch"));
    assert_eq!(
        std::fs::read(source.join("data/classes.json")).expect("reread classes"),
        classes_before
    );
    assert!(!source.join("data.importing").exists());
    assert!(Store::open(&source).class(&class_id).is_some());

    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(out_dir);
}
