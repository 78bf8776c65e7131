use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_name, get_required_str, to_json, with_store, Handler};
use crate::ipc::types::{AppState, Request};
use crate::model::SchoolClass;
use crate::store::Store;
use serde_json::json;

fn classes_list(store: &mut Store, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // Counts come along so the UI can render a dashboard without extra calls.
    let classes = store
        .classes_by_name()
        .into_iter()
        .map(|c| {
            let mut v = to_json(c);
            v["studentCount"] = json!(c.student_ids.len());
            v["assignmentCount"] = json!(c.assignment_ids.len());
            v
        })
        .collect::<Vec<_>>();
    Ok(json!({ "classes": classes }))
}

fn classes_get(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = store
        .class(&class_id)
        .ok_or_else(|| HandlerErr::not_found("class"))?;
    Ok(json!({ "class": to_json(class) }))
}

fn classes_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_name(params, "name")?;
    let class = SchoolClass::new(name);
    let id = class.id.clone();
    store.add_class(class)?;
    Ok(json!({ "class": to_json(&store.class(&id)) }))
}

fn classes_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_name(params, "name")?;
    let mut class = store
        .class(&class_id)
        .cloned()
        .ok_or_else(|| HandlerErr::not_found("class"))?;
    class.name = name;
    store.update_class(class)?;
    Ok(json!({ "class": to_json(&store.class(&class_id)) }))
}

fn classes_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let existed = store.class(&class_id).is_some();
    store.delete_class(&class_id)?;
    Ok(json!({ "deleted": existed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "classes.list" => classes_list,
        "classes.get" => classes_get,
        "classes.create" => classes_create,
        "classes.update" => classes_update,
        "classes.delete" => classes_delete,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
