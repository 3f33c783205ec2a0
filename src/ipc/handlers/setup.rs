use crate::competency::CompetencyRecord;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Locale, Track};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Bulletin,
    Competency,
}

impl SetupSection {
    const ALL: [SetupSection; 2] = [SetupSection::Bulletin, SetupSection::Competency];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "bulletin" => Some(Self::Bulletin),
            "competency" => Some(Self::Competency),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bulletin => "bulletin",
            Self::Competency => "competency",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Bulletin => "setup.bulletin",
            Self::Competency => "setup.competency",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Bulletin => json!({
            "defaultLocale": "fr",
            "defaultTrack": "general"
        }),
        SetupSection::Competency => json!({
            "records": null
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_records(v: &Value) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    let records: Vec<CompetencyRecord> = serde_json::from_value(v.clone())
        .map_err(|e| format!("records must be a list of competency records: {}", e))?;
    if records.is_empty() {
        return Err("records must not be empty; use null for the built-in table".into());
    }
    for r in &records {
        if r.code.trim().is_empty() {
            return Err("records[].code must not be empty".into());
        }
        if r.grade_range.min > r.grade_range.max {
            return Err(format!(
                "records[{}].gradeRange.min must be <= max",
                r.code.trim()
            ));
        }
    }
    serde_json::to_value(records).map_err(|e| e.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Bulletin => match k.as_str() {
                "defaultLocale" => {
                    let locale = v
                        .as_str()
                        .and_then(Locale::parse)
                        .ok_or_else(|| "defaultLocale must be one of: fr, en".to_string())?;
                    obj.insert(k.clone(), Value::String(locale.as_str().to_string()));
                }
                "defaultTrack" => {
                    let track = v.as_str().and_then(Track::parse).ok_or_else(|| {
                        "defaultTrack must be one of: general, technical".to_string()
                    })?;
                    obj.insert(k.clone(), Value::String(track.as_str().to_string()));
                }
                _ => return Err(format!("unknown bulletin field: {}", k)),
            },
            SetupSection::Competency => match k.as_str() {
                "records" => {
                    obj.insert(k.clone(), parse_records(v)?);
                }
                _ => return Err(format!("unknown competency field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed stored value must not block computation.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

/// Workspace-level fallbacks for locale, track and competency table.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceDefaults {
    pub locale: Locale,
    pub track: Track,
    pub competency_records: Option<Vec<CompetencyRecord>>,
}

pub fn workspace_defaults(state: &AppState) -> WorkspaceDefaults {
    let Some(conn) = state.db.as_ref() else {
        return WorkspaceDefaults::default();
    };

    let bulletin = match load_section(conn, SetupSection::Bulletin) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read bulletin setup; using defaults");
            default_section(SetupSection::Bulletin)
        }
    };
    let competency = match load_section(conn, SetupSection::Competency) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read competency setup; using built-in table");
            default_section(SetupSection::Competency)
        }
    };

    WorkspaceDefaults {
        locale: bulletin
            .get("defaultLocale")
            .and_then(|v| v.as_str())
            .and_then(Locale::parse)
            .unwrap_or_default(),
        track: bulletin
            .get("defaultTrack")
            .and_then(|v| v.as_str())
            .and_then(Track::parse)
            .unwrap_or_default(),
        competency_records: competency
            .get("records")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut out = Map::new();
    for section in SetupSection::ALL {
        let value = match load_section(conn, section) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        out.insert(section.name().to_string(), value);
    }
    ok(&req.id, Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        tracing::warn!(error = %e, section = section.name(), "setup write failed");
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    let updated_at = db::settings_updated_at(conn, section.key()).ok().flatten();
    tracing::info!(section = section.name(), "setup updated");
    ok(&req.id, json!({ "ok": true, "updatedAt": updated_at }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
