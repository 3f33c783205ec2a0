use crate::bulletin::{compute_trimester_bulletin, TermInput};
use crate::competency::CompetencyTable;
use crate::grading::{classify_cote, Cote};
use crate::model::{
    AnnualDisciplineCounter, DisciplineRecord, InputIssue, IssueKind, Locale, Track, MARK_MAX,
    MARK_MIN,
};
use crate::weighting::round2;
use serde::{Deserialize, Serialize};

/// Class council decision. Recorded as supplied, never derived from averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Passe,
    Redouble,
    Renvoye,
}

impl Decision {
    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Passe, Locale::Fr) => "Admis(e) en classe supérieure",
            (Self::Passe, Locale::En) => "Promoted to the next class",
            (Self::Redouble, Locale::Fr) => "Redouble",
            (Self::Redouble, Locale::En) => "Repeats the class",
            (Self::Renvoye, Locale::Fr) => "Renvoyé(e)",
            (Self::Renvoye, Locale::En) => "Dismissed",
        }
    }
}

/// A term's average: typed in by the council, or computed from the term's rows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TermSource {
    Entered(f64),
    Computed(Box<TermInput>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualInput {
    pub terms: [TermSource; 3],
    #[serde(default)]
    pub annual_discipline: AnnualDisciplineCounter,
    #[serde(default)]
    pub annual_average: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub total_students: Option<u32>,
    #[serde(default)]
    pub decision: Option<Decision>,
    #[serde(default)]
    pub final_appreciation: String,
    #[serde(default)]
    pub holiday_recommendations: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualSummary {
    pub term1_average: f64,
    pub term2_average: f64,
    pub term3_average: f64,
    pub annual_average: Option<f64>,
    pub annual_cote: Option<Cote>,
    pub annual_rank: Option<u32>,
    pub total_students: Option<u32>,
    pub decision: Option<Decision>,
    pub decision_label: Option<&'static str>,
    pub final_appreciation: String,
    pub holiday_recommendations: String,
    pub per_term_discipline: [DisciplineRecord; 3],
    pub issues: Vec<InputIssue>,
}

/// Spreads the year counter evenly: each term gets `floor(counter / 3)`.
/// The remainder is dropped, so the three terms can sum to less than the counter.
/// Warnings, blames and dismissal are not part of the counter and stay 0.
pub fn redistribute_discipline(counter: &AnnualDisciplineCounter) -> [DisciplineRecord; 3] {
    let share = DisciplineRecord {
        justified_absence_hours: counter.justified_absence_hours / 3,
        unjustified_absence_hours: counter.unjustified_absence_hours / 3,
        late_count: counter.late_count / 3,
        punishment_hours: counter.punishment_hours / 3,
        suspension_days: counter.suspension_days / 3,
        ..Default::default()
    };
    [share; 3]
}

/// Range-check and round a human-entered average.
fn entered_average(field: &str, value: f64, issues: &mut Vec<InputIssue>) -> f64 {
    if !value.is_finite() {
        issues.push(InputIssue::new(field, 0.0, IssueKind::MarkNotFinite));
        return MARK_MIN;
    }
    if !(MARK_MIN..=MARK_MAX).contains(&value) {
        issues.push(InputIssue::new(field, value, IssueKind::AverageOutOfRange));
        return round2(value.clamp(MARK_MIN, MARK_MAX));
    }
    round2(value)
}

pub struct AnnualContext<'a> {
    pub locale: Locale,
    pub track: Track,
    pub table: &'a CompetencyTable,
}

#[allow(clippy::too_many_arguments)]
pub fn build_annual(
    term_averages: [f64; 3],
    annual_discipline: &AnnualDisciplineCounter,
    manual_annual_average: Option<f64>,
    manual_rank: Option<u32>,
    total_students: Option<u32>,
    decision: Option<Decision>,
    final_appreciation: &str,
    holiday_recommendations: &str,
    locale: Locale,
) -> AnnualSummary {
    let mut issues = Vec::new();
    let [t1, t2, t3] = term_averages;
    let term1_average = entered_average("term1Average", t1, &mut issues);
    let term2_average = entered_average("term2Average", t2, &mut issues);
    let term3_average = entered_average("term3Average", t3, &mut issues);
    let annual_average =
        manual_annual_average.map(|v| entered_average("annualAverage", v, &mut issues));

    if let (Some(rank), Some(total)) = (manual_rank, total_students) {
        if rank > total {
            issues.push(InputIssue::new(
                "annualRank",
                rank as f64,
                IssueKind::RankExceedsClassSize,
            ));
        }
    }

    AnnualSummary {
        term1_average,
        term2_average,
        term3_average,
        annual_average,
        annual_cote: annual_average.map(classify_cote),
        annual_rank: manual_rank,
        total_students,
        decision,
        decision_label: decision.map(|d| d.label(locale)),
        final_appreciation: final_appreciation.to_string(),
        holiday_recommendations: holiday_recommendations.to_string(),
        per_term_discipline: redistribute_discipline(annual_discipline),
        issues,
    }
}

/// A term's average plus, for computed terms, every issue raised while
/// computing it, qualified as `term2.lines[0].rawMark`.
fn term_average(
    position: usize,
    source: &TermSource,
    ctx: &AnnualContext<'_>,
) -> (f64, Vec<InputIssue>) {
    match source {
        TermSource::Entered(v) => (*v, Vec::new()),
        TermSource::Computed(input) => {
            let track = input.track.unwrap_or(ctx.track);
            let locale = input.locale.unwrap_or(ctx.locale);
            let term = compute_trimester_bulletin(input, track, locale, ctx.table);
            let issues = term
                .all_issues()
                .into_iter()
                .map(|issue| InputIssue {
                    field: format!("term{}.{}", position, issue.field),
                    ..issue
                })
                .collect();
            (term.weighted_average, issues)
        }
    }
}

pub fn compute_annual_summary(input: &AnnualInput, ctx: &AnnualContext<'_>) -> AnnualSummary {
    let (t1, mut term_issues) = term_average(1, &input.terms[0], ctx);
    let (t2, issues2) = term_average(2, &input.terms[1], ctx);
    let (t3, issues3) = term_average(3, &input.terms[2], ctx);
    term_issues.extend(issues2);
    term_issues.extend(issues3);

    let mut summary = build_annual(
        [t1, t2, t3],
        &input.annual_discipline,
        input.annual_average,
        input.rank,
        input.total_students,
        input.decision,
        &input.final_appreciation,
        &input.holiday_recommendations,
        ctx.locale,
    );
    summary.issues.extend(term_issues);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectGradeEntry;

    fn summary(terms: [f64; 3], annual: Option<f64>) -> AnnualSummary {
        build_annual(
            terms,
            &AnnualDisciplineCounter::default(),
            annual,
            Some(4),
            Some(52),
            Some(Decision::Passe),
            "Bon élève",
            "Réviser les fractions",
            Locale::Fr,
        )
    }

    #[test]
    fn redistribution_drops_remainder() {
        let counter = AnnualDisciplineCounter {
            justified_absence_hours: 10,
            unjustified_absence_hours: 9,
            late_count: 2,
            punishment_hours: 7,
            suspension_days: 3,
        };
        let per_term = redistribute_discipline(&counter);
        for t in &per_term {
            assert_eq!(t.justified_absence_hours, 3);
            assert_eq!(t.unjustified_absence_hours, 3);
            assert_eq!(t.late_count, 0);
            assert_eq!(t.punishment_hours, 2);
            assert_eq!(t.suspension_days, 1);
            assert_eq!(t.conduct_warnings, 0);
            assert_eq!(t.dismissed, 0);
        }
    }

    #[test]
    fn redistributed_sum_never_exceeds_counter() {
        for hours in 0..40_u32 {
            let counter = AnnualDisciplineCounter {
                justified_absence_hours: hours,
                ..Default::default()
            };
            let sum: u32 = redistribute_discipline(&counter)
                .iter()
                .map(|t| t.justified_absence_hours)
                .sum();
            assert!(sum <= hours);
            assert_eq!(sum == hours, hours % 3 == 0, "hours={}", hours);
        }
    }

    #[test]
    fn annual_average_is_never_filled_in() {
        let s = summary([12.0, 13.0, 14.0], None);
        assert_eq!(s.annual_average, None);
        assert_eq!(s.annual_cote, None);
        assert_eq!(s.decision, Some(Decision::Passe));
        assert_eq!(s.decision_label, Some("Admis(e) en classe supérieure"));
    }

    #[test]
    fn entered_averages_are_rounded_and_range_checked() {
        let s = summary([12.345_6, 21.0, -3.0], Some(15.994));
        assert_eq!(s.term1_average, 12.35);
        assert_eq!(s.term2_average, 20.0);
        assert_eq!(s.term3_average, 0.0);
        assert_eq!(s.annual_average, Some(15.99));
        assert_eq!(s.annual_cote, Some(Cote::BPlus));
        let fields: Vec<&str> = s.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["term2Average", "term3Average"]);
    }

    #[test]
    fn decision_is_stored_not_derived() {
        let s = build_annual(
            [18.0, 18.5, 19.0],
            &AnnualDisciplineCounter::default(),
            Some(18.5),
            Some(60),
            Some(52),
            Some(Decision::Redouble),
            "",
            "",
            Locale::En,
        );
        assert_eq!(s.decision, Some(Decision::Redouble));
        assert_eq!(s.decision_label, Some("Repeats the class"));
        assert_eq!(s.issues.len(), 1);
        assert_eq!(s.issues[0].kind, IssueKind::RankExceedsClassSize);
    }

    #[test]
    fn computed_terms_use_term_weighted_average() {
        let term = TermInput {
            entries: vec![
                SubjectGradeEntry {
                    subject_name: "Maths".to_string(),
                    coefficient: 6,
                    raw_mark: 15.0,
                    ..Default::default()
                },
                SubjectGradeEntry {
                    subject_name: "Anglais".to_string(),
                    coefficient: 3,
                    raw_mark: 12.0,
                    ..Default::default()
                },
                SubjectGradeEntry {
                    subject_name: "SVT".to_string(),
                    coefficient: 4,
                    raw_mark: 16.0,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let input = AnnualInput {
            terms: [
                TermSource::Entered(11.0),
                TermSource::Computed(Box::new(term)),
                TermSource::Entered(12.5),
            ],
            annual_discipline: AnnualDisciplineCounter::default(),
            annual_average: Some(12.7),
            rank: None,
            total_students: None,
            decision: None,
            final_appreciation: String::new(),
            holiday_recommendations: String::new(),
        };
        let table = CompetencyTable::builtin(Locale::Fr);
        let ctx = AnnualContext {
            locale: Locale::Fr,
            track: Track::General,
            table: &table,
        };
        let s = compute_annual_summary(&input, &ctx);
        assert_eq!(s.term2_average, 14.62);
        assert_eq!(s.annual_average, Some(12.7));
        assert_eq!(compute_annual_summary(&input, &ctx), s);
    }

    #[test]
    fn computed_term_issues_reach_the_summary() {
        let term = TermInput {
            entries: vec![
                SubjectGradeEntry {
                    subject_name: "Chimie".to_string(),
                    coefficient: -3,
                    raw_mark: 25.0,
                    ..Default::default()
                },
                SubjectGradeEntry {
                    subject_name: "Histoire".to_string(),
                    coefficient: 2,
                    raw_mark: 12.0,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let input = AnnualInput {
            terms: [
                TermSource::Entered(10.0),
                TermSource::Computed(Box::new(term)),
                TermSource::Entered(12.0),
            ],
            annual_discipline: AnnualDisciplineCounter::default(),
            annual_average: None,
            rank: None,
            total_students: None,
            decision: None,
            final_appreciation: String::new(),
            holiday_recommendations: String::new(),
        };
        let table = CompetencyTable::builtin(Locale::Fr);
        let ctx = AnnualContext {
            locale: Locale::Fr,
            track: Track::General,
            table: &table,
        };
        let s = compute_annual_summary(&input, &ctx);
        assert_eq!(s.term2_average, 12.0);
        let found: Vec<(&str, IssueKind)> = s
            .issues
            .iter()
            .map(|i| (i.field.as_str(), i.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("term2.lines[0].rawMark", IssueKind::MarkOutOfRange),
                ("term2.lines[0].coefficient", IssueKind::NegativeCoefficient),
            ]
        );
        assert_eq!(s.issues[0].value, 25.0);
    }

    #[test]
    fn term_sources_parse_from_numbers_or_objects() {
        let raw = serde_json::json!({
            "terms": [10.5, { "entries": [{ "rawMark": 12, "coefficient": 2 }] }, 13],
            "decision": "RENVOYE"
        });
        let input: AnnualInput = serde_json::from_value(raw).expect("parse annual input");
        assert_eq!(input.terms[0], TermSource::Entered(10.5));
        assert!(matches!(input.terms[1], TermSource::Computed(_)));
        assert_eq!(input.decision, Some(Decision::Renvoye));
    }
}
