use crate::comments;
use crate::competency::CompetencyTable;
use crate::grading::{classify_competency, classify_cote, Cote};
use crate::model::{
    clamp_mark, BulletinSection, DisciplineRecord, InputIssue, IssueKind, Locale, StudentInfo,
    SubjectGradeEntry, Track, MARK_MAX,
};
use crate::weighting::{
    effective_coefficient, round2, weighted_average, weighted_contribution, weighted_totals,
    WeightedMark,
};
use serde::{Deserialize, Serialize};

const COMPETENCY_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletinLine {
    pub subject_name: String,
    pub teacher_name: String,
    pub coefficient: i64,
    pub effective_coefficient: i64,
    pub raw_mark: f64,
    pub final_mark: f64,
    pub authoritative_mark: f64,
    pub weighted_contribution: f64,
    pub percentage: f64,
    pub cote: Cote,
    pub competency_code: String,
    pub competency_label: String,
    pub evaluated_competencies: String,
    pub comments: Vec<String>,
    pub appreciation: String,
    pub section: BulletinSection,
    pub issues: Vec<InputIssue>,
}

/// The mark a track scores on: `rawMark` for general, `finalMark` for technical.
/// The other mark is echoed but never read.
pub fn selected_mark(entry: &SubjectGradeEntry, track: Track) -> (&'static str, f64) {
    match track {
        Track::Technical => ("finalMark", entry.final_mark),
        Track::General => ("rawMark", entry.raw_mark),
    }
}

pub fn assemble(
    entry: &SubjectGradeEntry,
    track: Track,
    locale: Locale,
    table: &CompetencyTable,
) -> BulletinLine {
    let mut issues = Vec::new();
    let (field, selected) = selected_mark(entry, track);
    let mark = clamp_mark(field, selected, &mut issues);
    if entry.coefficient < 0 {
        issues.push(InputIssue::new(
            "coefficient",
            entry.coefficient as f64,
            IssueKind::NegativeCoefficient,
        ));
    }

    let competency = classify_competency(mark, table);
    let evaluated_competencies = entry
        .competencies
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(COMPETENCY_SEPARATOR);

    BulletinLine {
        subject_name: entry.subject_name.clone(),
        teacher_name: entry.teacher_name.clone(),
        coefficient: entry.coefficient,
        effective_coefficient: effective_coefficient(entry.coefficient),
        raw_mark: entry.raw_mark,
        final_mark: entry.final_mark,
        authoritative_mark: mark,
        weighted_contribution: weighted_contribution(mark, entry.coefficient),
        percentage: round2(mark / MARK_MAX * 100.0),
        cote: classify_cote(mark),
        competency_label: competency.label(locale).to_string(),
        competency_code: competency.code,
        evaluated_competencies,
        comments: comments::resolve(&entry.comment_ids, locale),
        appreciation: entry.appreciation.clone(),
        section: entry.section,
        issues,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSubtotal {
    pub section: BulletinSection,
    pub subject_count: usize,
    pub total_coefficient: i64,
    pub total_weighted_points: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimesterBulletin {
    pub student: StudentInfo,
    pub track: Track,
    pub locale: Locale,
    pub lines: Vec<BulletinLine>,
    pub discipline: DisciplineRecord,
    pub total_absence_hours: u32,
    pub total_coefficient: i64,
    pub total_weighted_points: f64,
    pub weighted_average: f64,
    pub average_cote: Cote,
    pub average_competency_code: String,
    pub average_competency_label: String,
    pub sections: Vec<SectionSubtotal>,
    pub missing_identity: Vec<&'static str>,
    pub printable: bool,
    /// Term-level issues. Line issues stay on their lines.
    pub issues: Vec<InputIssue>,
}

impl TrimesterBulletin {
    /// Every issue on the term, line issues first, with fields qualified
    /// by their position (`lines[2].rawMark`).
    pub fn all_issues(&self) -> Vec<InputIssue> {
        let mut out: Vec<InputIssue> = self
            .lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| {
                line.issues.iter().map(move |issue| InputIssue {
                    field: format!("lines[{}].{}", i, issue.field),
                    ..issue.clone()
                })
            })
            .collect();
        out.extend(self.issues.iter().cloned());
        out
    }
}

fn line_weights(lines: &[BulletinLine]) -> impl Iterator<Item = WeightedMark> + '_ {
    lines.iter().map(|l| WeightedMark {
        mark: l.authoritative_mark,
        coefficient: l.coefficient,
    })
}

/// Technical-track subtotals, one per section in first-appearance order.
fn section_subtotals(lines: &[BulletinLine]) -> Vec<SectionSubtotal> {
    let mut order: Vec<BulletinSection> = Vec::new();
    for l in lines {
        if !order.contains(&l.section) {
            order.push(l.section);
        }
    }
    order
        .into_iter()
        .map(|section| {
            let members: Vec<BulletinLine> = lines
                .iter()
                .filter(|l| l.section == section)
                .cloned()
                .collect();
            let totals = weighted_totals(line_weights(&members));
            SectionSubtotal {
                section,
                subject_count: members.len(),
                total_coefficient: totals.total_coefficient,
                total_weighted_points: round2(totals.weighted_sum),
                average: totals.average(),
            }
        })
        .collect()
}

pub fn build_term(
    student: &StudentInfo,
    entries: &[SubjectGradeEntry],
    discipline: &DisciplineRecord,
    track: Track,
    locale: Locale,
    table: &CompetencyTable,
) -> TrimesterBulletin {
    let lines: Vec<BulletinLine> = entries
        .iter()
        .map(|e| assemble(e, track, locale, table))
        .collect();

    let totals = weighted_totals(line_weights(&lines));
    let weighted_average = weighted_average(line_weights(&lines));
    // Section sums are bounded by the overall sum, so one check covers them.
    let mut issues = Vec::new();
    if totals.saturated {
        issues.push(InputIssue::new(
            "totalCoefficient",
            totals.total_coefficient as f64,
            IssueKind::CoefficientOverflow,
        ));
    }
    let overall = classify_competency(weighted_average, table);
    let sections = match track {
        Track::Technical => section_subtotals(&lines),
        Track::General => Vec::new(),
    };
    let missing_identity = student.missing_identity();

    TrimesterBulletin {
        student: student.clone(),
        track,
        locale,
        total_absence_hours: discipline.total_absence_hours(),
        discipline: *discipline,
        total_coefficient: totals.total_coefficient,
        total_weighted_points: round2(totals.weighted_sum),
        weighted_average,
        average_cote: classify_cote(weighted_average),
        average_competency_label: overall.label(locale).to_string(),
        average_competency_code: overall.code,
        sections,
        printable: missing_identity.is_empty(),
        missing_identity,
        lines,
        issues,
    }
}

/// One term's raw inputs, as received from the editing form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TermInput {
    pub student: StudentInfo,
    pub entries: Vec<SubjectGradeEntry>,
    pub discipline: DisciplineRecord,
    pub track: Option<Track>,
    pub locale: Option<Locale>,
}

pub fn compute_trimester_bulletin(
    input: &TermInput,
    track: Track,
    locale: Locale,
    table: &CompetencyTable,
) -> TrimesterBulletin {
    build_term(
        &input.student,
        &input.entries,
        &input.discipline,
        track,
        locale,
        table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(subject: &str, raw: f64, final_mark: f64, coef: i64) -> SubjectGradeEntry {
        SubjectGradeEntry {
            subject_name: subject.to_string(),
            teacher_name: "M. Etoa".to_string(),
            coefficient: coef,
            raw_mark: raw,
            final_mark,
            ..Default::default()
        }
    }

    fn student() -> StudentInfo {
        StudentInfo {
            full_name: Some("Abena Mballa".to_string()),
            registration_number: Some("LBY-2024-118".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn track_selects_authoritative_mark() {
        let e = entry("Physique", 14.0, 0.0, 4);
        let fr = CompetencyTable::builtin(Locale::Fr);
        let general = assemble(&e, Track::General, Locale::Fr, &fr);
        let technical = assemble(&e, Track::Technical, Locale::Fr, &fr);
        assert_eq!(general.authoritative_mark, 14.0);
        assert_eq!(technical.authoritative_mark, 0.0);
        assert_eq!(general.weighted_contribution, 56.0);
        assert_eq!(technical.weighted_contribution, 0.0);
        assert_eq!(general.cote, Cote::B);
        assert_eq!(technical.cote, Cote::D);
    }

    #[test]
    fn switching_tracks_keeps_both_marks() {
        let e = entry("Dessin", 11.5, 15.25, 2);
        let before = e.clone();
        let table = CompetencyTable::builtin(Locale::En);
        let mut last = None;
        for track in [Track::General, Track::Technical, Track::General] {
            let line = assemble(&e, track, Locale::En, &table);
            assert_eq!(line.raw_mark, 11.5);
            assert_eq!(line.final_mark, 15.25);
            last = Some(line);
        }
        assert_eq!(e, before);
        assert_eq!(last.map(|l| l.authoritative_mark), Some(11.5));
    }

    #[test]
    fn line_derives_every_field() {
        let mut e = entry("Français", 16.0, 12.0, 3);
        e.competencies = vec![
            " Lire un texte ".to_string(),
            "".to_string(),
            "Rédiger".to_string(),
        ];
        e.comment_ids = vec!["3".to_string(), "Soigneux".to_string()];
        let line = assemble(&e, Track::General, Locale::Fr, &CompetencyTable::builtin(Locale::Fr));
        assert_eq!(line.percentage, 80.0);
        assert_eq!(line.competency_code, "CTBA");
        assert_eq!(line.competency_label, "Compétences très bien acquises");
        assert_eq!(line.evaluated_competencies, "Lire un texte; Rédiger");
        assert_eq!(line.comments, vec!["Bon travail", "Soigneux"]);
        assert!(line.issues.is_empty());
    }

    #[test]
    fn out_of_range_values_degrade_and_are_reported() {
        let e = entry("Chimie", 23.0, 5.0, -2);
        let line = assemble(&e, Track::General, Locale::Fr, &CompetencyTable::builtin(Locale::Fr));
        assert_eq!(line.raw_mark, 23.0);
        assert_eq!(line.authoritative_mark, 20.0);
        assert_eq!(line.coefficient, -2);
        assert_eq!(line.effective_coefficient, 0);
        assert_eq!(line.weighted_contribution, 0.0);
        let kinds: Vec<IssueKind> = line.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::MarkOutOfRange, IssueKind::NegativeCoefficient]
        );
    }

    #[test]
    fn term_average_matches_worked_example() {
        let entries = vec![
            entry("Maths", 15.0, 0.0, 6),
            entry("Anglais", 12.0, 0.0, 3),
            entry("SVT", 16.0, 0.0, 4),
        ];
        let term = build_term(
            &student(),
            &entries,
            &DisciplineRecord::default(),
            Track::General,
            Locale::Fr,
            &CompetencyTable::builtin(Locale::Fr),
        );
        assert_eq!(term.weighted_average, 14.62);
        assert_eq!(term.total_coefficient, 13);
        assert_eq!(term.total_weighted_points, 190.0);
        assert_eq!(term.average_cote, Cote::B);
        assert_eq!(term.average_competency_code, "CBA");
        let names: Vec<&str> = term.lines.iter().map(|l| l.subject_name.as_str()).collect();
        assert_eq!(names, vec!["Maths", "Anglais", "SVT"]);
        assert!(term.sections.is_empty());
        assert!(term.printable);
    }

    #[test]
    fn empty_term_is_zero_and_flags_identity() {
        let term = build_term(
            &StudentInfo::default(),
            &[],
            &DisciplineRecord::default(),
            Track::General,
            Locale::En,
            &CompetencyTable::builtin(Locale::En),
        );
        assert_eq!(term.weighted_average, 0.0);
        assert_eq!(term.average_cote, Cote::D);
        assert_eq!(term.missing_identity, vec!["fullName", "registrationNumber"]);
        assert!(!term.printable);
    }

    #[test]
    fn technical_term_groups_sections() {
        let mut a = entry("Électrotechnique", 0.0, 14.0, 5);
        a.section = BulletinSection::Technical;
        let mut b = entry("Maths", 0.0, 10.0, 4);
        b.section = BulletinSection::Scientific;
        let mut c = entry("Schémas", 0.0, 16.0, 3);
        c.section = BulletinSection::Technical;
        let term = build_term(
            &student(),
            &[a, b, c],
            &DisciplineRecord::default(),
            Track::Technical,
            Locale::Fr,
            &CompetencyTable::builtin(Locale::Fr),
        );
        assert_eq!(term.sections.len(), 2);
        assert_eq!(term.sections[0].section, BulletinSection::Technical);
        assert_eq!(term.sections[0].subject_count, 2);
        assert_eq!(term.sections[0].total_coefficient, 8);
        assert_eq!(term.sections[0].total_weighted_points, 118.0);
        assert_eq!(term.sections[0].average, 14.75);
        assert_eq!(term.sections[1].average, 10.0);
        assert_eq!(term.weighted_average, 13.17);
    }

    #[test]
    fn coefficient_overflow_is_reported_not_fatal() {
        let entries = vec![
            entry("Maths", 12.0, 0.0, i64::MAX),
            entry("SVT", 14.0, 0.0, 1),
        ];
        let term = build_term(
            &student(),
            &entries,
            &DisciplineRecord::default(),
            Track::General,
            Locale::Fr,
            &CompetencyTable::builtin(Locale::Fr),
        );
        assert_eq!(term.total_coefficient, i64::MAX);
        assert!(term.weighted_average.is_finite());
        assert_eq!(term.issues.len(), 1);
        assert_eq!(term.issues[0].kind, IssueKind::CoefficientOverflow);
        assert_eq!(term.issues[0].field, "totalCoefficient");
    }

    #[test]
    fn all_issues_qualifies_line_fields() {
        let entries = vec![
            entry("Histoire", 11.0, 0.0, 2),
            entry("Chimie", 25.0, 0.0, -3),
        ];
        let term = build_term(
            &student(),
            &entries,
            &DisciplineRecord::default(),
            Track::General,
            Locale::Fr,
            &CompetencyTable::builtin(Locale::Fr),
        );
        let fields: Vec<String> = term.all_issues().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["lines[1].rawMark", "lines[1].coefficient"]);
        assert!(term.issues.is_empty());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let entries = vec![entry("Histoire", 13.5, 9.0, 2), entry("EPS", 17.0, 8.0, 1)];
        let discipline = DisciplineRecord {
            justified_absence_hours: 3,
            unjustified_absence_hours: 2,
            ..Default::default()
        };
        let table = CompetencyTable::builtin(Locale::Fr);
        let a = build_term(&student(), &entries, &discipline, Track::General, Locale::Fr, &table);
        let b = build_term(&student(), &entries, &discipline, Track::General, Locale::Fr, &table);
        assert_eq!(a, b);
        assert_eq!(a.total_absence_hours, 5);
        assert_eq!(
            serde_json::to_string(&a).expect("serialize"),
            serde_json::to_string(&b).expect("serialize")
        );
    }
}
