use super::setup::workspace_defaults;
use crate::competency::{CompetencyRecord, CompetencyTable, TableSource};
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::model::{Locale, Track};
use serde::de::DeserializeOwned;

/// Locale, track and competency table for one computation, with request
/// params taking precedence over workspace setup, and setup over built-ins.
pub struct CalcInputs {
    pub locale: Locale,
    pub track: Track,
    pub table: CompetencyTable,
    pub table_source: TableSource,
}

pub fn payload<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, HandlerErr> {
    let Some(raw) = req.params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(raw.clone()).map_err(|e| HandlerErr::bad_payload(key, e))
}

pub fn optional_payload<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr::bad_payload(key, e)),
    }
}

fn optional_enum<T>(
    req: &Request,
    key: &str,
    parse: fn(&str) -> Option<T>,
    allowed: &str,
) -> Result<Option<T>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(parse)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be one of: {}", key, allowed))),
    }
}

pub fn calc_inputs(state: &AppState, req: &Request) -> Result<CalcInputs, HandlerErr> {
    let defaults = workspace_defaults(state);
    let locale = optional_enum(req, "locale", Locale::parse, "fr, en")?.unwrap_or(defaults.locale);
    let track =
        optional_enum(req, "track", Track::parse, "general, technical")?.unwrap_or(defaults.track);

    let requested: Option<Vec<CompetencyRecord>> = optional_payload(req, "competencyTable")?;
    let (table, table_source) = match (requested, defaults.competency_records) {
        (Some(records), _) if !records.is_empty() => {
            (CompetencyTable::from_records(&records), TableSource::Request)
        }
        (_, Some(records)) if !records.is_empty() => {
            (CompetencyTable::from_records(&records), TableSource::Workspace)
        }
        _ => (CompetencyTable::builtin(locale), TableSource::Builtin),
    };

    Ok(CalcInputs {
        locale,
        track,
        table,
        table_source,
    })
}
