use gradebookd::{
    Assignment, SchoolClass, Store, StoreError, Student, StudentSubmission, Test,
};
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

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

struct Fixture {
    root: PathBuf,
    store: Store,
    class_id: String,
    student_ids: Vec<String>,
    assignment_id: String,
    submission_ids: Vec<String>,
}

/// One class, two students, one assignment, three submissions with a scan each.
fn fixture(prefix: &str) -> Fixture {
    let root = temp_dir(prefix);
    let mut store = Store::open(&root);

    let class = SchoolClass::new("CM2");
    let class_id = class.id.clone();
    store.add_class(class).expect("add class");

    let mut student_ids = Vec::new();
    for name in ["Ada Lovelace", "Blaise Pascal"] {
        let s = Student::new(name, &class_id);
        student_ids.push(s.id.clone());
        store.add_student(s).expect("add student");
    }
    let assignment = Assignment::new("Rédaction", &class_id, None);
    let assignment_id = assignment.id.clone();
    store.add_assignment(assignment).expect("add assignment");
    let extra = Assignment::new("Dictée", &class_id, None);
    let extra_id = extra.id.clone();
    store.add_assignment(extra).expect("add second assignment");

    let scan = root.join("scan.png");
    std::fs::write(&scan, PNG).expect("write scan");

    let pairs = [
        (student_ids[0].clone(), assignment_id.clone()),
        (student_ids[1].clone(), assignment_id.clone()),
        (student_ids[0].clone(), extra_id),
    ];
    let mut submission_ids = Vec::new();
    for (student_id, a_id) in pairs {
        let mut sub = StudentSubmission::new(&student_id, &a_id);
        let rel = store
            .images()
            .import_image(&scan, &sub.id)
            .expect("import scan");
        sub.image_paths.push(rel);
        sub.final_grade = Some(12.0);
        submission_ids.push(sub.id.clone());
        store.add_submission(sub).expect("add submission");
    }

    Fixture {
        root,
        store,
        class_id,
        student_ids,
        assignment_id,
        submission_ids,
    }
}

fn image_dirs(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = std::fs::read_dir(root.join("data/images"))
        .expect("list images")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    out.sort();
    out
}

#[test]
fn class_delete_cascades_through_everything() {
    let mut fx = fixture("gradebook-cascade-class");
    assert_eq!(image_dirs(&fx.root).len(), 3);
    fx.store
        .add_test(Test::new(&fx.assignment_id, "Accord du participe", Vec::new()))
        .expect("add test");

    fx.store.delete_class(&fx.class_id).expect("delete class");

    for store in [&fx.store, &Store::open(&fx.root)] {
        assert!(store.class(&fx.class_id).is_none());
        assert!(store.classes().is_empty());
        assert!(store.students_in_class(&fx.class_id).is_empty());
        assert!(store.assignments_in_class(&fx.class_id).is_empty());
        for id in &fx.submission_ids {
            assert!(store.submission(id).is_none());
        }
        assert!(store.tests_for_assignment(&fx.assignment_id).is_empty());
        // Rubrics are independent of classes.
        assert_eq!(store.rubrics().len(), 1);
    }
    assert!(image_dirs(&fx.root).is_empty());

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn student_delete_removes_submissions_and_roster_entry() {
    let mut fx = fixture("gradebook-cascade-student");
    let gone = fx.student_ids[0].clone();
    fx.store.delete_student(&gone).expect("delete student");

    let class = fx.store.class(&fx.class_id).expect("class survives");
    assert_eq!(class.student_ids, vec![fx.student_ids[1].clone()]);
    assert!(fx.store.submissions_for_student(&gone).is_empty());
    assert_eq!(fx.store.submissions_for_student(&fx.student_ids[1]).len(), 1);
    assert_eq!(image_dirs(&fx.root), vec![fx.submission_ids[1].clone()]);

    let reopened = Store::open(&fx.root);
    assert_eq!(reopened.class(&fx.class_id), fx.store.class(&fx.class_id));
    assert!(reopened.student(&gone).is_none());

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn assignment_delete_removes_submissions_tests_and_listing() {
    let mut fx = fixture("gradebook-cascade-assignment");
    fx.store
        .add_test(Test::new(&fx.assignment_id, "Conjugaison", Vec::new()))
        .expect("add test");
    fx.store
        .delete_assignment(&fx.assignment_id)
        .expect("delete assignment");

    let class = fx.store.class(&fx.class_id).expect("class");
    assert!(!class.assignment_ids.contains(&fx.assignment_id));
    assert_eq!(class.assignment_ids.len(), 1);
    assert!(fx.store.submissions_for_assignment(&fx.assignment_id).is_empty());
    assert!(fx.store.tests_for_assignment(&fx.assignment_id).is_empty());
    assert_eq!(image_dirs(&fx.root), vec![fx.submission_ids[2].clone()]);
    assert_eq!(fx.store.student(&fx.student_ids[0]).map(|s| s.name.as_str()), Some("Ada Lovelace"));

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn detach_survives_independent_class_update() {
    let mut fx = fixture("gradebook-detach");
    let gone = fx.student_ids[1].clone();

    // A caller holding a stale copy renames the class after the delete.
    let mut stale = fx.store.class(&fx.class_id).cloned().expect("class");
    fx.store.delete_student(&gone).expect("delete student");
    stale.name = "CM2 bis".to_string();
    fx.store.update_class(stale).expect("update class");

    let class = fx.store.class(&fx.class_id).expect("class");
    assert_eq!(class.name, "CM2 bis");
    assert!(!class.student_ids.contains(&gone));

    // Deleting again is a no-op.
    fx.store.delete_student(&gone).expect("second delete");
    assert_eq!(
        fx.store.class(&fx.class_id).map(|c| c.student_ids.len()),
        Some(1)
    );

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn moving_a_student_updates_both_rosters() {
    let mut fx = fixture("gradebook-move");
    let other = SchoolClass::new("CM1");
    let other_id = other.id.clone();
    fx.store.add_class(other).expect("add class");

    let mut ada = fx
        .store
        .student(&fx.student_ids[0])
        .cloned()
        .expect("student");
    ada.class_id = other_id.clone();
    fx.store.update_student(ada).expect("move");

    assert_eq!(
        fx.store.class(&fx.class_id).map(|c| c.student_ids.clone()),
        Some(vec![fx.student_ids[1].clone()])
    );
    assert_eq!(
        fx.store.class(&other_id).map(|c| c.student_ids.clone()),
        Some(vec![fx.student_ids[0].clone()])
    );

    let mut lost = fx
        .store
        .student(&fx.student_ids[1])
        .cloned()
        .expect("student");
    lost.class_id = "nowhere".to_string();
    assert!(matches!(
        fx.store.update_student(lost),
        Err(StoreError::MissingParent { kind: "class", .. })
    ));

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn rejects_dangling_parents_and_duplicate_pairs() {
    let mut fx = fixture("gradebook-reject");

    assert!(matches!(
        fx.store.add_student(Student::new("Orphan Kid", "no-such-class")),
        Err(StoreError::MissingParent { kind: "class", .. })
    ));
    assert!(matches!(
        fx.store
            .add_submission(StudentSubmission::new("no-such-student", &fx.assignment_id)),
        Err(StoreError::MissingParent { kind: "student", .. })
    ));
    assert!(matches!(
        fx.store.add_test(Test::new("no-such-assignment", "Quiz", Vec::new())),
        Err(StoreError::MissingParent { kind: "assignment", .. })
    ));

    let dup = StudentSubmission::new(&fx.student_ids[0], &fx.assignment_id);
    let err = fx.store.add_submission(dup).expect_err("duplicate pair");
    assert!(matches!(err, StoreError::DuplicateSubmission { .. }));
    assert_eq!(err.code(), "conflict");

    let mut bad = fx
        .store
        .submission(&fx.submission_ids[0])
        .cloned()
        .expect("submission");
    bad.final_grade = Some(f64::NAN);
    assert!(matches!(
        fx.store.update_submission(bad),
        Err(StoreError::InvalidGrade(_))
    ));

    let again = fx.store.class(&fx.class_id).cloned().expect("class");
    assert!(matches!(
        fx.store.add_class(again),
        Err(StoreError::DuplicateId { kind: "class", .. })
    ));

    assert_eq!(fx.store.submissions_for_assignment(&fx.assignment_id).len(), 2);

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn submission_delete_removes_image_directory() {
    let mut fx = fixture("gradebook-sub-delete");
    let target = fx.submission_ids[0].clone();
    let rel = fx
        .store
        .submission(&target)
        .map(|s| s.image_paths[0].clone())
        .expect("image path");
    assert!(fx.store.images().resolve(&rel).is_file());

    fx.store.delete_submission(&target).expect("delete submission");
    assert!(!fx.store.images().resolve(&rel).exists());
    assert!(!fx.root.join("data/images").join(&target).exists());
    assert!(fx.store.images().load(&rel).is_none());

    let _ = std::fs::remove_dir_all(&fx.root);
}

#[test]
fn image_paths_outside_the_submission_are_never_deleted() {
    let mut fx = fixture("gradebook-image-escape");
    let classes_file = fx.root.join("data/classes.json");

    fx.store
        .delete_submission(&fx.submission_ids[1])
        .expect("free the pair");
    let mut escaping = StudentSubmission::new(&fx.student_ids[1], &fx.assignment_id);
    escaping.image_paths = vec!["../classes.json".to_string()];
    let err = fx
        .store
        .add_submission(escaping.clone())
        .expect_err("escaping path");
    assert!(matches!(err, StoreError::InvalidImagePath { .. }));
    assert_eq!(err.code(), "bad_params");
    escaping.image_paths = vec!["/etc/hosts".to_string()];
    assert!(fx.store.add_submission(escaping.clone()).is_err());
    escaping.image_paths = Vec::new();
    escaping.id = "..".to_string();
    assert!(matches!(
        fx.store.add_submission(escaping),
        Err(StoreError::InvalidImagePath { .. })
    ));

    let mut existing = fx
        .store
        .submission(&fx.submission_ids[0])
        .cloned()
        .expect("submission");
    existing.image_paths.push(format!("{}/../../classes.json", existing.id));
    assert!(fx.store.update_submission(existing).is_err());

    // A hand-edited submissions file is still cleaned up safely.
    let target = fx.submission_ids[0].clone();
    drop(fx.store);
    let subs_path = fx.root.join("data/submissions.json");
    let mut subs: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&subs_path).expect("read submissions"))
            .expect("parse submissions");
    for sub in subs.as_array_mut().expect("array") {
        if sub["id"] == serde_json::json!(target) {
            sub["imagePaths"] = serde_json::json!(["../classes.json"]);
        }
    }
    std::fs::write(&subs_path, serde_json::to_vec_pretty(&subs).expect("encode"))
        .expect("write submissions");

    let mut store = Store::open(&fx.root);
    store.delete_submission(&target).expect("delete submission");
    assert!(classes_file.is_file());
    assert!(store.submission(&target).is_none());
    assert!(Store::open(&fx.root).class(&fx.class_id).is_some());

    let _ = std::fs::remove_dir_all(&fx.root);
}
