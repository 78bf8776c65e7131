use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, to_json, with_store, Handler};
use crate::ipc::types::{AppState, Request};
use crate::stats;
use crate::store::Store;
use serde_json::json;

fn stats_student(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let s = stats::student_stats(store, &student_id).ok_or_else(|| HandlerErr::not_found("student"))?;
    Ok(json!({ "stats": to_json(&s) }))
}

fn stats_class(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let s = stats::class_stats(store, &class_id).ok_or_else(|| HandlerErr::not_found("class"))?;
    Ok(json!({ "stats": to_json(&s) }))
}

fn stats_assignment(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let s = stats::assignment_stats(store, &assignment_id)
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    Ok(json!({ "stats": to_json(&s) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "stats.student" => stats_student,
        "stats.class" => stats_class,
        "stats.assignment" => stats_assignment,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
