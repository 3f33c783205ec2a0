use crate::competency::{CompetencyBand, CompetencyTable};
use crate::model::Locale;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cote {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    D,
}

// Lower bounds are inclusive.
const COTE_LADDER: [(f64, Cote); 6] = [
    (18.0, Cote::APlus),
    (16.0, Cote::A),
    (15.0, Cote::BPlus),
    (14.0, Cote::B),
    (12.0, Cote::CPlus),
    (10.0, Cote::C),
];

/// Letter grade for a mark already clamped to [0,20].
pub fn classify_cote(mark: f64) -> Cote {
    COTE_LADDER
        .iter()
        .find(|(floor, _)| mark >= *floor)
        .map(|(_, cote)| *cote)
        .unwrap_or(Cote::D)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Competency {
    pub code: String,
    pub label_fr: String,
    pub label_en: String,
}

impl Competency {
    pub fn label(&self, locale: Locale) -> &str {
        match locale {
            Locale::Fr => &self.label_fr,
            Locale::En => &self.label_en,
        }
    }
}

impl From<&CompetencyBand> for Competency {
    fn from(band: &CompetencyBand) -> Self {
        Self {
            code: band.code.clone(),
            label_fr: band.label_fr.clone(),
            label_en: band.label_en.clone(),
        }
    }
}

/// First band (by descending `min`) containing the mark, else the CNA fallback.
/// Does not clamp; callers pass marks already in range.
pub fn classify_competency(mark: f64, table: &CompetencyTable) -> Competency {
    table
        .bands()
        .iter()
        .find(|band| band.contains(mark))
        .map(Competency::from)
        .unwrap_or_else(|| Competency::from(&CompetencyTable::fallback_band()))
}
