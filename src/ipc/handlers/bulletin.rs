use super::context::{calc_inputs, payload};
use crate::annual::{compute_annual_summary, AnnualContext, AnnualInput};
use crate::bulletin::{assemble, compute_trimester_bulletin, TermInput};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::SubjectGradeEntry;
use serde_json::json;

// Selection keys are resolved by `calc_inputs`, leniently; drop them before the strict parse.
fn without_selection_keys(params: &serde_json::Value) -> serde_json::Value {
    let mut out = params.clone();
    if let Some(obj) = out.as_object_mut() {
        for key in ["locale", "track", "competencyTable"] {
            obj.remove(key);
        }
    }
    out
}

fn assemble_line(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let inputs = calc_inputs(state, req)?;
    let entry: SubjectGradeEntry = payload(req, "entry")?;
    let line = assemble(&entry, inputs.track, inputs.locale, &inputs.table);
    Ok(json!(line))
}

fn compute_term(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let inputs = calc_inputs(state, req)?;
    // The term shape is the params object itself; `entries` is the only required key.
    if req.params.get("entries").is_none() {
        return Err(HandlerErr::bad_params("missing entries"));
    }
    let term: TermInput = serde_json::from_value(without_selection_keys(&req.params))
        .map_err(|e| HandlerErr::bad_payload("params", e))?;

    let bulletin = compute_trimester_bulletin(&term, inputs.track, inputs.locale, &inputs.table);
    let issue_count: usize = bulletin.lines.iter().map(|l| l.issues.len()).sum();
    tracing::debug!(
        subjects = bulletin.lines.len(),
        issues = issue_count,
        average = bulletin.weighted_average,
        track = inputs.track.as_str(),
        "term bulletin computed"
    );
    Ok(json!(bulletin))
}

fn compute_annual(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let inputs = calc_inputs(state, req)?;
    let terms = req
        .params
        .get("terms")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing terms"))?;
    if terms.len() != 3 {
        return Err(HandlerErr {
            code: "bad_params",
            message: "terms must contain exactly 3 entries".to_string(),
            details: Some(json!({ "count": terms.len() })),
        });
    }
    let input: AnnualInput = serde_json::from_value(without_selection_keys(&req.params))
        .map_err(|e| HandlerErr::bad_payload("params", e))?;

    let ctx = AnnualContext {
        locale: inputs.locale,
        track: inputs.track,
        table: &inputs.table,
    };
    let summary = compute_annual_summary(&input, &ctx);
    tracing::debug!(
        issues = summary.issues.len(),
        decision = ?summary.decision,
        "annual summary computed"
    );
    Ok(json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "bulletin.assembleLine" => assemble_line(state, req),
        "bulletin.computeTerm" => compute_term(state, req),
        "bulletin.computeAnnual" => compute_annual(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
