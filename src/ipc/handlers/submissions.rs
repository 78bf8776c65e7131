use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_str, get_required_str, get_typed, to_json, with_store, Handler};
use crate::ipc::types::{AppState, Request};
use crate::model::{AnalysisResult, StudentSubmission};
use crate::store::Store;
use serde_json::json;

/// Lists by `assignmentId` or by `studentId`; with both, returns the single
/// matching submission (if any) as a one-element list.
fn submissions_list(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_optional_str(params, "assignmentId");
    let student_id = get_optional_str(params, "studentId");
    let subs = match (student_id, assignment_id) {
        (Some(s), Some(a)) => store.submission_for(&s, &a).into_iter().collect::<Vec<_>>(),
        (Some(s), None) => store.submissions_for_student(&s),
        (None, Some(a)) => store.submissions_for_assignment(&a),
        (None, None) => {
            return Err(HandlerErr::bad_params("missing assignmentId or studentId"));
        }
    };
    Ok(json!({ "submissions": to_json(&subs) }))
}

fn submissions_get(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let submission_id = get_required_str(params, "submissionId")?;
    let sub = store
        .submission(&submission_id)
        .ok_or_else(|| HandlerErr::not_found("submission"))?;
    Ok(json!({ "submission": to_json(sub) }))
}

fn apply_fields(sub: &mut StudentSubmission, params: &serde_json::Value) -> Result<(), HandlerErr> {
    if let Some(paths) = get_typed::<Vec<String>>(params, "imagePaths")? {
        sub.image_paths = paths;
    }
    if let Some(analysis) = get_typed::<Option<AnalysisResult>>(params, "analysis")? {
        sub.analysis = analysis;
    }
    if let Some(grade) = get_typed::<Option<f64>>(params, "finalGrade")? {
        sub.final_grade = grade;
    }
    Ok(())
}

fn submissions_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let assignment_id = get_required_str(params, "assignmentId")?;
    let mut sub = StudentSubmission::new(student_id, assignment_id);
    apply_fields(&mut sub, params)?;
    let id = sub.id.clone();
    store.add_submission(sub)?;
    Ok(json!({ "submission": to_json(&store.submission(&id)) }))
}

/// Partial update of images, analysis and grade. `null` clears the optional
/// fields.
fn submissions_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let submission_id = get_required_str(params, "submissionId")?;
    let mut sub = store
        .submission(&submission_id)
        .cloned()
        .ok_or_else(|| HandlerErr::not_found("submission"))?;
    apply_fields(&mut sub, params)?;
    store.update_submission(sub)?;
    Ok(json!({ "submission": to_json(&store.submission(&submission_id)) }))
}

fn submissions_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let submission_id = get_required_str(params, "submissionId")?;
    let existed = store.submission(&submission_id).is_some();
    store.delete_submission(&submission_id)?;
    Ok(json!({ "deleted": existed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "submissions.list" => submissions_list,
        "submissions.get" => submissions_get,
        "submissions.create" => submissions_create,
        "submissions.update" => submissions_update,
        "submissions.delete" => submissions_delete,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
