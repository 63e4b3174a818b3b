//! Placeholder data for requests no portal could answer.
//!
//! Everything here is seeded from the request's cache key, so the same
//! request always synthesizes the same placeholder. Every record and
//! entry carries a `SYNTHETIC_FALLBACK` data source and every party name
//! carries [`SYNTHETIC_MARK`].

use std::hash::Hasher;

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::types::{
    CaseDetails, CaseQuery, CaseRecord, CauseListEntry, CauseListQuery, CourtType, DataSource,
};

/// Tag carried by every synthesized party name.
pub const SYNTHETIC_MARK: &str = "[SYNTHETIC]";

/// Size bounds of a synthesized cause list.
pub const MIN_SYNTHETIC_ENTRIES: usize = 20;
pub const MAX_SYNTHETIC_ENTRIES: usize = 35;

/// Case types heard at the High Court; everything else is a district matter.
const HIGH_COURT_TYPES: &[&str] = &[
    "WP", "WA", "W.P.(C)", "W.P.(CRL)", "CWP", "LPA", "RFA", "RSA", "FAO", "CRP", "CRL.A",
    "CRL.P", "CRL.REV.P", "CRL.M.C", "BAIL APPLN", "ARB.P", "CO.PET", "MAT.APP", "CS(OS)",
];

const KNOWN_COURTS: &[(&str, CourtType)] = &[
    ("High Court", CourtType::HighCourt),
    ("Delhi High Court", CourtType::HighCourt),
    ("District Court", CourtType::DistrictCourt),
    ("Sessions Court", CourtType::DistrictCourt),
    ("Family Court", CourtType::DistrictCourt),
];

const HIGH_COURT_LIST_TYPES: &[&str] = &["WP", "CRL.A", "LPA", "RFA", "FAO", "CRP"];
const DISTRICT_LIST_TYPES: &[&str] = &["OS", "CC", "SC", "MC", "RCS", "EP"];

const NAMES: &[&str] = &[
    "Asha Verma", "Rajesh Gupta", "Imran Sheikh", "Lakshmi Iyer", "Harpreet Kaur",
    "Suresh Patil", "Neha Joshi", "Anil Mehra", "Farida Khan", "Vikram Rao",
];

const INSTITUTIONS: &[&str] = &[
    "State", "Union of India", "Municipal Corporation", "State Bank", "Revenue Department",
];

const STATUSES: &[&str] = &["Pending", "Listed for hearing", "Awaiting service", "Reserved"];

const PURPOSES: &[&str] = &["Admission", "Arguments", "Evidence", "Orders", "Framing of charges"];

const HEARING_TIMES: &[&str] = &["10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM", "2:00 PM", "2:30 PM"];

fn rng_for(key: &str) -> StdRng {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key.as_bytes());
    StdRng::seed_from_u64(hasher.finish())
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// Which forum hears `case_type`.
pub fn forum_for(case_type: &str) -> CourtType {
    let normalized = case_type.trim().to_uppercase();
    if HIGH_COURT_TYPES.iter().any(|t| *t == normalized) {
        CourtType::HighCourt
    } else {
        CourtType::DistrictCourt
    }
}

fn forum_name(court_type: CourtType) -> &'static str {
    match court_type {
        CourtType::HighCourt => "High Court",
        CourtType::DistrictCourt => "District Court",
    }
}

fn marked_party(name: &str) -> String {
    format!("{name} {SYNTHETIC_MARK}")
}

/// A found-but-synthetic record for `query`.
pub fn synthesize_case(query: &CaseQuery, reason: &str, today: NaiveDate) -> CaseRecord {
    let mut rng = rng_for(&query.cache_key());
    let court_type = forum_for(&query.case_type);

    let filing_year = query.year.min(today.year());
    let filing_date = NaiveDate::from_yo_opt(filing_year, rng.gen_range(1..=365))
        .map(|d| d.min(today))
        .unwrap_or(today);
    let next_hearing_date = today + Duration::days(rng.gen_range(7..=60));

    let petitioner = pick(&mut rng, NAMES);
    let respondent = if rng.gen_bool(0.5) {
        pick(&mut rng, INSTITUTIONS)
    } else {
        pick(&mut rng, NAMES)
    };

    let details = CaseDetails {
        petitioner: Some(marked_party(petitioner)),
        respondent: Some(marked_party(respondent)),
        filing_date: Some(filing_date),
        next_hearing_date: Some(next_hearing_date),
        status: Some(pick(&mut rng, STATUSES).to_string()),
        court_name: Some(forum_name(court_type).to_string()),
        court_type,
        judge_name: Some(format!("Synthetic Bench {}", rng.gen_range(1..=12))),
        court_hall: Some(format!("Court {}", rng.gen_range(1..=40))),
        case_category: Some(match court_type {
            CourtType::HighCourt => "Writ / Appeal".to_string(),
            CourtType::DistrictCourt => "Civil / Criminal".to_string(),
        }),
        judgments: Vec::new(),
    };

    CaseRecord::synthetic(query.clone(), reason, details)
}

/// Courts a synthesized list may name, honoring the filter.
fn candidate_courts(filter: Option<&str>) -> Vec<(String, CourtType)> {
    let Some(filter) = filter else {
        return KNOWN_COURTS
            .iter()
            .map(|(n, t)| (n.to_string(), *t))
            .collect();
    };

    let needle = filter.to_lowercase();
    let known: Vec<_> = KNOWN_COURTS
        .iter()
        .filter(|(n, _)| n.to_lowercase().contains(&needle))
        .map(|(n, t)| (n.to_string(), *t))
        .collect();
    if !known.is_empty() {
        return known;
    }

    let court_type = if needle.contains("high") {
        CourtType::HighCourt
    } else {
        CourtType::DistrictCourt
    };
    vec![(filter.to_string(), court_type)]
}

/// A synthesized cause list of 20 to 35 entries for `query`.
pub fn synthesize_cause_list(query: &CauseListQuery, reason: &str) -> Vec<CauseListEntry> {
    let mut rng = rng_for(&query.cache_key());
    let courts = candidate_courts(query.court_name.as_deref());
    let count = rng.gen_range(MIN_SYNTHETIC_ENTRIES..=MAX_SYNTHETIC_ENTRIES);
    let date = query.hearing_date;

    (0..count)
        .map(|_| {
            let (court_name, court_type) = courts
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| ("District Court".to_string(), CourtType::DistrictCourt));
            let case_type = match court_type {
                CourtType::HighCourt => pick(&mut rng, HIGH_COURT_LIST_TYPES),
                CourtType::DistrictCourt => pick(&mut rng, DISTRICT_LIST_TYPES),
            };
            let year = rng.gen_range(date.year() - 5..=date.year());
            let number = rng.gen_range(1..=9999);
            let parties = format!(
                "{} vs {} {SYNTHETIC_MARK}",
                pick(&mut rng, NAMES),
                pick(&mut rng, INSTITUTIONS)
            );

            CauseListEntry {
                court_name,
                court_type,
                case_number: format!("{case_type} {number}/{year}"),
                case_type: case_type.to_string(),
                case_year: Some(year),
                parties,
                hearing_date: date,
                hearing_time: Some(pick(&mut rng, HEARING_TIMES).to_string()),
                court_hall: Some(format!("Court {}", rng.gen_range(1..=40))),
                judge_name: Some(format!("Synthetic Bench {}", rng.gen_range(1..=12))),
                hearing_purpose: Some(pick(&mut rng, PURPOSES).to_string()),
                data_source: DataSource::synthetic(reason),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_forum_mapping() {
        assert_eq!(forum_for("wp"), CourtType::HighCourt);
        assert_eq!(forum_for("CRL.A"), CourtType::HighCourt);
        assert_eq!(forum_for("OS"), CourtType::DistrictCourt);
        assert_eq!(forum_for("anything"), CourtType::DistrictCourt);
    }

    #[test]
    fn test_synthetic_case_is_labeled_and_deterministic() {
        let query = CaseQuery::new("WP", "123", 2024).unwrap();
        let a = synthesize_case(&query, "no portal returned data", today());
        let b = synthesize_case(&query, "no portal returned data", today());
        assert_eq!(a, b);

        assert!(a.found);
        assert!(a.data_source.is_synthetic());
        let details = a.details.unwrap();
        assert_eq!(details.court_type, CourtType::HighCourt);
        assert!(details.petitioner.unwrap().contains(SYNTHETIC_MARK));
        assert!(details.respondent.unwrap().contains(SYNTHETIC_MARK));
        assert!(details.filing_date.unwrap() <= today());
        assert!(details.next_hearing_date.unwrap() > today());
        assert!(details.judgments.is_empty());
    }

    #[test]
    fn test_future_year_filing_date_is_not_in_the_future() {
        let query = CaseQuery::new("OS", "1", 2030).unwrap();
        let record = synthesize_case(&query, "r", today());
        assert!(record.details.unwrap().filing_date.unwrap() <= today());
    }

    #[test]
    fn test_synthetic_list_size_and_labels() {
        let query = CauseListQuery::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), None);
        let entries = synthesize_cause_list(&query, "no portal returned entries");
        assert!((MIN_SYNTHETIC_ENTRIES..=MAX_SYNTHETIC_ENTRIES).contains(&entries.len()));
        for entry in &entries {
            assert_eq!(
                entry.data_source,
                DataSource::synthetic("no portal returned entries")
            );
            assert!(entry.parties.contains(SYNTHETIC_MARK));
            assert_eq!(entry.hearing_date, query.hearing_date);
            assert!(entry.case_number.ends_with(&format!("/{}", entry.case_year.unwrap())));
        }
        assert_eq!(entries, synthesize_cause_list(&query, "no portal returned entries"));
    }

    #[test]
    fn test_synthetic_list_honors_filter() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let known = CauseListQuery::new(date, Some("delhi"));
        assert!(synthesize_cause_list(&known, "r")
            .iter()
            .all(|e| known.admits(&e.court_name)));

        let unknown = CauseListQuery::new(date, Some("Tis Hazari"));
        let entries = synthesize_cause_list(&unknown, "r");
        assert!(entries.iter().all(|e| e.court_name == "Tis Hazari"));
    }
}
