use crate::model::{Locale, MARK_MAX, MARK_MIN};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyBand {
    pub code: String,
    pub label_fr: String,
    pub label_en: String,
    pub min: f64,
    pub max: f64,
}

impl CompetencyBand {
    fn new(code: &str, label_fr: &str, label_en: &str, min: f64, max: f64) -> Self {
        Self {
            code: code.to_string(),
            label_fr: label_fr.to_string(),
            label_en: label_en.to_string(),
            min,
            max,
        }
    }

    pub fn contains(&self, mark: f64) -> bool {
        self.min <= mark && mark <= self.max
    }
}

/// Competency band record as served by the school backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyRecord {
    pub code: String,
    #[serde(default)]
    pub description_fr: String,
    #[serde(default)]
    pub description_en: String,
    pub grade_range: GradeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TableSource {
    Builtin,
    Workspace,
    Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CoverageProblem {
    Gap,
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGap {
    pub kind: CoverageProblem,
    pub from: f64,
    pub to: f64,
}

/// Ordered set of competency bands. Never mutated once built; a locale or
/// source change means building a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencyTable {
    bands: Vec<CompetencyBand>,
}

impl CompetencyTable {
    /// Bands are kept sorted by descending `min`, the order classification scans them in.
    pub fn new(mut bands: Vec<CompetencyBand>) -> Self {
        bands.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(Ordering::Equal));
        Self { bands }
    }

    /// The five-band ministry default. Codes differ per locale (CTBA vs CVWA).
    pub fn builtin(locale: Locale) -> Self {
        let pick = |fr: &'static str, en: &'static str| match locale {
            Locale::Fr => fr,
            Locale::En => en,
        };
        Self::new(vec![
            CompetencyBand::new(
                pick("CTBA", "CVWA"),
                "Compétences très bien acquises",
                "Competences very well acquired",
                16.0,
                20.0,
            ),
            CompetencyBand::new(
                pick("CBA", "CWA"),
                "Compétences bien acquises",
                "Competences well acquired",
                14.0,
                16.0,
            ),
            CompetencyBand::new(
                "CA",
                "Compétences acquises",
                "Competences acquired",
                12.0,
                14.0,
            ),
            CompetencyBand::new(
                pick("CMA", "CAA"),
                "Compétences moyennement acquises",
                "Competences averagely acquired",
                10.0,
                12.0,
            ),
            Self::fallback_band(),
        ])
    }

    pub fn from_records(records: &[CompetencyRecord]) -> Self {
        Self::new(
            records
                .iter()
                .map(|r| CompetencyBand {
                    code: r.code.trim().to_string(),
                    label_fr: r.description_fr.clone(),
                    label_en: r.description_en.clone(),
                    min: r.grade_range.min,
                    max: r.grade_range.max,
                })
                .collect(),
        )
    }

    /// Lowest tier, returned when no band matches.
    pub fn fallback_band() -> CompetencyBand {
        CompetencyBand::new(
            "CNA",
            "Compétences non acquises",
            "Competences not acquired",
            0.0,
            10.0,
        )
    }

    pub fn bands(&self) -> &[CompetencyBand] {
        &self.bands
    }

    /// Uncovered sub-ranges and overlaps of [0,20]. Shared endpoints between
    /// adjacent bands are expected (the higher band wins) and are not overlaps.
    pub fn coverage_gaps(&self) -> Vec<CoverageGap> {
        let mut ascending: Vec<&CompetencyBand> = self.bands.iter().collect();
        ascending.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal));

        let mut out = Vec::new();
        let mut covered_to = MARK_MIN;
        let mut started = false;
        for band in ascending {
            if band.max < MARK_MIN || band.min > MARK_MAX {
                continue;
            }
            let start = band.min.max(MARK_MIN);
            if !started {
                if start > MARK_MIN {
                    out.push(CoverageGap {
                        kind: CoverageProblem::Gap,
                        from: MARK_MIN,
                        to: start,
                    });
                }
                started = true;
            } else if start > covered_to {
                out.push(CoverageGap {
                    kind: CoverageProblem::Gap,
                    from: covered_to,
                    to: start,
                });
            } else if start < covered_to {
                out.push(CoverageGap {
                    kind: CoverageProblem::Overlap,
                    from: start,
                    to: covered_to.min(band.max),
                });
            }
            covered_to = covered_to.max(band.max.min(MARK_MAX));
        }

        if !started {
            out.push(CoverageGap {
                kind: CoverageProblem::Gap,
                from: MARK_MIN,
                to: MARK_MAX,
            });
        } else if covered_to < MARK_MAX {
            out.push(CoverageGap {
                kind: CoverageProblem::Gap,
                from: covered_to,
                to: MARK_MAX,
            });
        }
        out
    }
}
