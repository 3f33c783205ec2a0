use crate::model::Locale;
use serde::Serialize;

// id, French, English. Versioned with the engine; not fetched.
const MINISTRY_COMMENTS: [(&str, &str, &str); 15] = [
    ("1", "Excellent travail", "Excellent work"),
    ("2", "Très bon travail, continuez ainsi", "Very good work, keep it up"),
    ("3", "Bon travail", "Good work"),
    ("4", "Travail satisfaisant", "Satisfactory work"),
    ("5", "Peut mieux faire", "Can do better"),
    ("6", "Travail insuffisant", "Insufficient work"),
    ("7", "Doit fournir plus d'efforts", "Must make more effort"),
    ("8", "Manque de concentration en classe", "Lacks concentration in class"),
    ("9", "Participation active en classe", "Takes an active part in class"),
    ("10", "Résultats en progrès", "Results are improving"),
    ("11", "Résultats en baisse", "Results are declining"),
    ("12", "Bavardages excessifs en classe", "Talks too much in class"),
    ("13", "Travail irrégulier", "Irregular work"),
    ("14", "Doit revoir les notions de base", "Must revise the basic notions"),
    ("15", "Encouragements du conseil de classe", "Encouragement from the class council"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogComment {
    pub id: &'static str,
    pub text: &'static str,
}

pub fn catalog(locale: Locale) -> Vec<CatalogComment> {
    MINISTRY_COMMENTS
        .iter()
        .map(|&(id, fr, en)| CatalogComment {
            id,
            text: match locale {
                Locale::Fr => fr,
                Locale::En => en,
            },
        })
        .collect()
}

pub fn lookup(id: &str, locale: Locale) -> Option<&'static str> {
    let id = id.trim();
    MINISTRY_COMMENTS
        .iter()
        .find(|(cid, _, _)| *cid == id)
        .map(|(_, fr, en)| match locale {
            Locale::Fr => *fr,
            Locale::En => *en,
        })
}

/// Every id maps to its catalog text; unknown ids are kept as literal text.
pub fn resolve(ids: &[String], locale: Locale) -> Vec<String> {
    ids.iter()
        .map(|id| {
            lookup(id, locale)
                .map(str::to_string)
                .unwrap_or_else(|| id.clone())
        })
        .collect()
}
