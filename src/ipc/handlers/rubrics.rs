use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_optional_str, get_required_name, get_required_str, get_typed, to_json, with_store,
    Handler,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{GradingRubric, RubricCriterion};
use crate::store::Store;
use serde_json::json;

fn validate_max_score(v: f64) -> Result<f64, HandlerErr> {
    if !v.is_finite() || v <= 0.0 {
        return Err(HandlerErr::bad_params("maxScore must be a positive number"));
    }
    Ok(v)
}

fn rubrics_list(store: &mut Store, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "rubrics": to_json(store.rubrics()) }))
}

fn rubrics_get(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rubric_id = get_required_str(params, "rubricId")?;
    let rubric = store
        .rubric(&rubric_id)
        .ok_or_else(|| HandlerErr::not_found("rubric"))?;
    Ok(json!({ "rubric": to_json(rubric) }))
}

fn rubrics_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_name(params, "name")?;
    let description = get_optional_str(params, "description").unwrap_or_default();
    let criteria = get_typed::<Vec<RubricCriterion>>(params, "criteria")?.unwrap_or_default();
    let max_score = validate_max_score(get_typed::<f64>(params, "maxScore")?.unwrap_or(20.0))?;
    let rubric = GradingRubric::new(name, description, criteria, max_score);
    let id = rubric.id.clone();
    store.add_rubric(rubric)?;
    Ok(json!({ "rubric": to_json(&store.rubric(&id)) }))
}

fn rubrics_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rubric_id = get_required_str(params, "rubricId")?;
    let mut rubric = store
        .rubric(&rubric_id)
        .cloned()
        .ok_or_else(|| HandlerErr::not_found("rubric"))?;
    if params.get("name").is_some() {
        rubric.name = get_required_name(params, "name")?;
    }
    if let Some(d) = get_optional_str(params, "description") {
        rubric.description = d;
    }
    if let Some(c) = get_typed::<Vec<RubricCriterion>>(params, "criteria")? {
        rubric.criteria = c;
    }
    if let Some(m) = get_typed::<f64>(params, "maxScore")? {
        rubric.max_score = validate_max_score(m)?;
    }
    store.update_rubric(rubric)?;
    Ok(json!({ "rubric": to_json(&store.rubric(&rubric_id)) }))
}

fn rubrics_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rubric_id = get_required_str(params, "rubricId")?;
    let existed = store.rubric(&rubric_id).is_some();
    store.delete_rubric(&rubric_id)?;
    Ok(json!({ "deleted": existed }))
}

/// Suggested grade for a submission; uses the default rubric when no
/// `rubricId` is given.
fn rubrics_score(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let submission_id = get_required_str(params, "submissionId")?;
    let rubric = match get_optional_str(params, "rubricId") {
        Some(id) => store.rubric(&id),
        None => store.default_rubric(),
    }
    .ok_or_else(|| HandlerErr::not_found("rubric"))?;
    let sub = store
        .submission(&submission_id)
        .ok_or_else(|| HandlerErr::not_found("submission"))?;
    let Some(analysis) = sub.analysis.as_ref() else {
        return Err(HandlerErr::bad_params("submission has no analysis result"));
    };
    Ok(json!({
        "rubricId": rubric.id,
        "score": rubric.score(analysis),
        "maxScore": rubric.max_score,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "rubrics.list" => rubrics_list,
        "rubrics.get" => rubrics_get,
        "rubrics.create" => rubrics_create,
        "rubrics.update" => rubrics_update,
        "rubrics.delete" => rubrics_delete,
        "rubrics.score" => rubrics_score,
        _ => return None,
    };
    Some(with_store(state, req, f))
}
