use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Some(Self::Fr),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    #[default]
    General,
    Technical,
}

impl Track {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Some(Self::General),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Technical => "technical",
        }
    }
}

/// Grouping tag for technical-track bulletins. Ignored on the general track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletinSection {
    General,
    Scientific,
    Literary,
    Technical,
    #[default]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectGradeEntry {
    pub subject_name: String,
    pub teacher_name: String,
    pub coefficient: i64,
    pub raw_mark: f64,
    pub final_mark: f64,
    pub competencies: Vec<String>,
    #[serde(deserialize_with = "ids_as_strings")]
    pub comment_ids: Vec<String>,
    pub appreciation: String,
    pub section: BulletinSection,
}

// Comment ids arrive as strings from newer forms and as integers from older ones.
// Anything else is kept as its JSON text so it still shows up as literal comment.
fn ids_as_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisciplineRecord {
    pub justified_absence_hours: u32,
    pub unjustified_absence_hours: u32,
    pub late_count: u32,
    pub punishment_hours: u32,
    pub conduct_warnings: u32,
    pub conduct_blames: u32,
    pub suspension_days: u32,
    pub dismissed: u8,
}

impl DisciplineRecord {
    pub fn total_absence_hours(&self) -> u32 {
        self.justified_absence_hours
            .saturating_add(self.unjustified_absence_hours)
    }
}

/// Year-level counters that get spread back over the three terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnualDisciplineCounter {
    pub justified_absence_hours: u32,
    pub unjustified_absence_hours: u32,
    pub late_count: u32,
    pub punishment_hours: u32,
    pub suspension_days: u32,
}

/// Identity and school metadata. Carried through to the output untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StudentInfo {
    /// Identity fields a printable record cannot go without.
    pub fn missing_identity(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").is_empty();
        let mut missing = Vec::new();
        if blank(&self.full_name) {
            missing.push("fullName");
        }
        if blank(&self.registration_number) {
            missing.push("registrationNumber");
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    MarkOutOfRange,
    MarkNotFinite,
    NegativeCoefficient,
    AverageOutOfRange,
    RankExceedsClassSize,
    CoefficientOverflow,
}

/// A tolerated input problem. The computation carried on with a degraded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputIssue {
    pub field: String,
    pub value: f64,
    pub kind: IssueKind,
}

impl InputIssue {
    pub fn new(field: impl Into<String>, value: f64, kind: IssueKind) -> Self {
        Self {
            field: field.into(),
            value,
            kind,
        }
    }
}

pub const MARK_MIN: f64 = 0.0;
pub const MARK_MAX: f64 = 20.0;

/// Clamp a mark (or average) into [0,20], recording an issue when it had to move.
pub fn clamp_mark(field: &str, value: f64, issues: &mut Vec<InputIssue>) -> f64 {
    if !value.is_finite() {
        issues.push(InputIssue::new(field, 0.0, IssueKind::MarkNotFinite));
        return MARK_MIN;
    }
    if !(MARK_MIN..=MARK_MAX).contains(&value) {
        issues.push(InputIssue::new(field, value, IssueKind::MarkOutOfRange));
        return value.clamp(MARK_MIN, MARK_MAX);
    }
    value
}
