use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_str, get_required_name, get_required_str, to_json, with_store, Handler,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::store::Store;
use serde_json::json;

fn students_list(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if store.class(&class_id).is_none() {
        return Err(HandlerErr::not_found("class"));
    }
    Ok(json!({ "students": to_json(&store.students_in_class(&class_id)) }))
}

fn students_get(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = store
        .student(&student_id)
        .ok_or_else(|| HandlerErr::not_found("student"))?;
    Ok(json!({ "student": to_json(student) }))
}

fn students_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_name(params, "name")?;
    let student = Student::new(name, class_id);
    let id = student.id.clone();
    store.add_student(student)?;
    Ok(json!({ "student": to_json(&store.student(&id)) }))
}

/// Partial update: `name` renames, `classId` moves the student.
fn students_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let mut student = store
        .student(&student_id)
        .cloned()
        .ok_or_else(|| HandlerErr::not_found("student"))?;
    if params.get("name").is_some() {
        student.rename(get_required_name(params, "name")?);
    }
    if let Some(class_id) = get_optional_str(params, "classId") {
        student.class_id = class_id;
    }
    store.update_student(student)?;
    Ok(json!({ "student": to_json(&store.student(&student_id)) }))
}

fn students_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let existed = store.student(&student_id).is_some();
    store.delete_student(&student_id)?;
    Ok(json!({ "deleted": existed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "students.list" => students_list,
        "students.get" => students_get,
        "students.create" => students_create,
        "students.update" => students_update,
        "students.delete" => students_delete,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
