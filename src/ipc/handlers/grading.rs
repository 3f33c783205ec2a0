use super::context::{calc_inputs, payload};
use crate::grading::{classify_competency, classify_cote};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{clamp_mark, InputIssue, IssueKind};
use crate::weighting::{weighted_totals, WeightedMark};
use serde_json::json;

fn competency_table(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let inputs = calc_inputs(state, req)?;
    Ok(json!({
        "locale": inputs.locale,
        "source": inputs.table_source,
        "bands": inputs.table.bands(),
        "gaps": inputs.table.coverage_gaps(),
    }))
}

fn classify(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let inputs = calc_inputs(state, req)?;
    let mark: f64 = payload(req, "mark")?;

    let mut issues: Vec<InputIssue> = Vec::new();
    let mark = clamp_mark("mark", mark, &mut issues);
    let competency = classify_competency(mark, &inputs.table);
    Ok(json!({
        "mark": mark,
        "cote": classify_cote(mark),
        "competencyCode": competency.code,
        "competencyLabel": competency.label(inputs.locale),
        "issues": issues,
    }))
}

fn weighted_average(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let entries: Vec<WeightedMark> = payload(req, "entries")?;
    let totals = weighted_totals(entries);
    let mut issues: Vec<InputIssue> = Vec::new();
    if totals.saturated {
        issues.push(InputIssue::new(
            "totalCoefficient",
            totals.total_coefficient as f64,
            IssueKind::CoefficientOverflow,
        ));
    }
    Ok(json!({
        "weightedAverage": totals.average(),
        "totalCoefficient": totals.total_coefficient,
        "issues": issues,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grading.competencyTable" => competency_table(state, req),
        "grading.classify" => classify(state, req),
        "grading.weightedAverage" => weighted_average(req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
