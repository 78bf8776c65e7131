use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_str, get_required_name, get_required_str, get_typed, to_json, with_store,
    Handler,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Assignment;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde_json::json;

fn assignments_list(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if store.class(&class_id).is_none() {
        return Err(HandlerErr::not_found("class"));
    }
    Ok(json!({ "assignments": to_json(&store.assignments_in_class(&class_id)) }))
}

fn assignments_get(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let assignment = store
        .assignment(&assignment_id)
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    Ok(json!({ "assignment": to_json(assignment) }))
}

fn assignments_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let title = get_required_name(params, "title")?;
    let due_date = get_typed::<Option<DateTime<Utc>>>(params, "dueDate")?.flatten();
    let assignment = Assignment::new(title, class_id, due_date);
    let id = assignment.id.clone();
    store.add_assignment(assignment)?;
    Ok(json!({ "assignment": to_json(&store.assignment(&id)) }))
}

/// Partial update; `dueDate: null` clears the due date.
fn assignments_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let mut assignment = store
        .assignment(&assignment_id)
        .cloned()
        .ok_or_else(|| HandlerErr::not_found("assignment"))?;
    if params.get("title").is_some() {
        assignment.title = get_required_name(params, "title")?;
    }
    if let Some(due) = get_typed::<Option<DateTime<Utc>>>(params, "dueDate")? {
        assignment.due_date = due;
    }
    if let Some(class_id) = get_optional_str(params, "classId") {
        assignment.class_id = class_id;
    }
    store.update_assignment(assignment)?;
    Ok(json!({ "assignment": to_json(&store.assignment(&assignment_id)) }))
}

fn assignments_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let existed = store.assignment(&assignment_id).is_some();
    store.delete_assignment(&assignment_id)?;
    Ok(json!({ "deleted": existed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "assignments.list" => assignments_list,
        "assignments.get" => assignments_get,
        "assignments.create" => assignments_create,
        "assignments.update" => assignments_update,
        "assignments.delete" => assignments_delete,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
