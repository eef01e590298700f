use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight class carried by every assessment record. The tag doubles as the
/// multiplier: frequent checks weigh 1, mid-term exams 2, final exams 3.
pub const WEIGHT_FREQUENT: i64 = 1;
pub const WEIGHT_MIDTERM: i64 = 2;
pub const WEIGHT_FINAL: i64 = 3;

/// Decimal places used for a single-subject detail view.
pub const DETAIL_PLACES: i32 = 2;
/// Decimal places used when an average feeds a semester or statistics rollup.
pub const ROLLUP_PLACES: i32 = 1;

/// Round half away from zero to `places` decimals. Precision is always an
/// explicit call-site choice: detail views use 2 places, rollups 1. The two
/// precisions must not be unified; displayed values depend on both.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: String,
    pub enrollment_id: String,
    pub subject_id: String,
    pub semester_id: String,
    pub score: f64,
    pub weight: i64,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMeta {
    pub id: String,
    pub name: String,
    pub anchor: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterMeta {
    pub id: String,
    pub name: String,
    pub academic_year: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub anchor: bool,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    FairGood,
    Fair,
    Weak,
}

impl PerformanceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "excellent",
            PerformanceTier::Good => "good",
            PerformanceTier::FairGood => "fairGood",
            PerformanceTier::Fair => "fair",
            PerformanceTier::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub semester_id: String,
    pub total_average: f64,
    pub performance_tier: PerformanceTier,
    pub subject_averages: Vec<SubjectAverage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectYearAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub first_semester_average: f64,
    pub second_semester_average: f64,
    pub year_average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearSummary {
    pub academic_year: String,
    pub first_semester_average: f64,
    pub second_semester_average: f64,
    pub year_average: f64,
    pub subject_year_averages: Vec<SubjectYearAverage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBand {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub percent: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortDistribution {
    pub total_students: usize,
    pub scored_students: usize,
    pub bands: Vec<ScoreBand>,
}

/// Weighted average over every record in the set. The divisor is the sum of
/// weight values across all records, not the number of weight classes
/// present. An empty set averages to 0; callers that need to distinguish
/// "no data" from a genuine zero must check record presence themselves.
pub fn weighted_average(records: &[ScoreRecord], places: i32) -> f64 {
    let mut sum = 0.0_f64;
    let mut denom = 0.0_f64;
    for r in records {
        sum += r.score * (r.weight as f64);
        denom += r.weight as f64;
    }
    if denom > 0.0 {
        round_to(sum / denom, places)
    } else {
        0.0
    }
}

pub fn subject_average(
    subject: &SubjectMeta,
    records: &[ScoreRecord],
    places: i32,
) -> SubjectAverage {
    SubjectAverage {
        subject_id: subject.id.clone(),
        subject_name: subject.name.clone(),
        anchor: subject.anchor,
        average: weighted_average(records, places),
    }
}

/// Semester rollup: unweighted mean of one entry per subject defined for the
/// enrollment's grade. Subjects with no recorded assessments arrive here as
/// zero averages and still participate in the mean.
pub fn semester_summary(
    semester_id: &str,
    subject_averages: Vec<SubjectAverage>,
) -> SemesterSummary {
    let total_average = if subject_averages.is_empty() {
        0.0
    } else {
        let sum: f64 = subject_averages.iter().map(|s| s.average).sum();
        round_to(sum / (subject_averages.len() as f64), 1)
    };
    let performance_tier = classify(total_average, &subject_averages, TierMode::Cascade);
    SemesterSummary {
        semester_id: semester_id.to_string(),
        total_average,
        performance_tier,
        subject_averages,
    }
}

/// How a conjunction failure inside a tier's score range resolves.
/// `Cascade` reproduces the legacy rule chain: a student inside a tier's
/// range who fails that tier's subject floor or anchor condition drops
/// straight to Weak. `BestFit` takes the first tier, top down, whose floor
/// and anchor minimum hold with the total at or above the tier's lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMode {
    Cascade,
    BestFit,
}

struct TierRule {
    tier: PerformanceTier,
    total_min: f64,
    total_max: Option<f64>,
    subject_floor: f64,
    anchor_min: f64,
    anchor_max: Option<f64>,
}

const TIER_RULES: [TierRule; 4] = [
    TierRule {
        tier: PerformanceTier::Excellent,
        total_min: 8.0,
        total_max: None,
        subject_floor: 6.5,
        anchor_min: 8.0,
        anchor_max: None,
    },
    TierRule {
        tier: PerformanceTier::Good,
        total_min: 6.5,
        total_max: Some(8.0),
        subject_floor: 5.0,
        anchor_min: 6.5,
        anchor_max: Some(8.0),
    },
    TierRule {
        tier: PerformanceTier::FairGood,
        total_min: 5.0,
        total_max: Some(6.5),
        subject_floor: 3.5,
        anchor_min: 5.0,
        anchor_max: Some(6.5),
    },
    TierRule {
        tier: PerformanceTier::Fair,
        total_min: 3.5,
        total_max: Some(5.0),
        subject_floor: 2.0,
        anchor_min: 3.5,
        anchor_max: Some(5.0),
    },
];

impl TierRule {
    fn contains_total(&self, total: f64) -> bool {
        total >= self.total_min && self.total_max.map(|m| total < m).unwrap_or(true)
    }

    fn floor_holds(&self, subjects: &[SubjectAverage]) -> bool {
        subjects.iter().all(|s| s.average >= self.subject_floor)
    }

    fn anchor_holds(&self, subjects: &[SubjectAverage]) -> bool {
        subjects.iter().any(|s| {
            s.anchor
                && s.average >= self.anchor_min
                && self.anchor_max.map(|m| s.average < m).unwrap_or(true)
        })
    }
}

/// Map a semester total plus per-subject averages to a performance tier.
/// Anchor subjects are flagged on the subject row itself, never matched by
/// display name. Every condition of a tier must hold simultaneously.
pub fn classify(
    total_average: f64,
    subjects: &[SubjectAverage],
    mode: TierMode,
) -> PerformanceTier {
    match mode {
        TierMode::Cascade => {
            for rule in &TIER_RULES {
                if rule.contains_total(total_average) {
                    return if rule.floor_holds(subjects) && rule.anchor_holds(subjects) {
                        rule.tier
                    } else {
                        PerformanceTier::Weak
                    };
                }
            }
            PerformanceTier::Weak
        }
        TierMode::BestFit => {
            for rule in &TIER_RULES {
                if total_average >= rule.total_min
                    && rule.floor_holds(subjects)
                    && subjects
                        .iter()
                        .any(|s| s.anchor && s.average >= rule.anchor_min)
                {
                    return rule.tier;
                }
            }
            PerformanceTier::Weak
        }
    }
}

/// Second-half marks count double in the yearly blend.
pub fn year_blend(first: f64, second: f64) -> f64 {
    round_to((first + second * 2.0) / 3.0, 1)
}

/// An academic year must resolve to exactly its two chronological semesters.
/// Anything else is broken reference data and is surfaced to the caller,
/// never defaulted.
pub fn year_semester_pair(
    mut semesters: Vec<SemesterMeta>,
) -> Result<(SemesterMeta, SemesterMeta), CalcError> {
    let count = semesters.len();
    semesters.sort_by_key(|s| s.ordinal);
    let mut it = semesters.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(CalcError::new(
            "data_integrity",
            format!("academic year resolves to {} semesters, expected 2", count),
        )),
    }
}

/// Yearly rollup over two semester summaries built from the same grade
/// subject list. The year average is the mean of the per-subject blends,
/// not a blend of the two semester totals.
pub fn academic_year_summary(
    academic_year: &str,
    first: &SemesterSummary,
    second: &SemesterSummary,
) -> AcademicYearSummary {
    let second_by_subject: HashMap<&str, f64> = second
        .subject_averages
        .iter()
        .map(|s| (s.subject_id.as_str(), s.average))
        .collect();

    let mut subject_year_averages = Vec::with_capacity(first.subject_averages.len());
    for f in &first.subject_averages {
        let second_average = second_by_subject
            .get(f.subject_id.as_str())
            .copied()
            .unwrap_or(0.0);
        subject_year_averages.push(SubjectYearAverage {
            subject_id: f.subject_id.clone(),
            subject_name: f.subject_name.clone(),
            first_semester_average: f.average,
            second_semester_average: second_average,
            year_average: year_blend(f.average, second_average),
        });
    }

    let year_average = if subject_year_averages.is_empty() {
        0.0
    } else {
        let sum: f64 = subject_year_averages.iter().map(|s| s.year_average).sum();
        round_to(sum / (subject_year_averages.len() as f64), 1)
    };

    AcademicYearSummary {
        academic_year: academic_year.to_string(),
        first_semester_average: first.total_average,
        second_semester_average: second.total_average,
        year_average,
        subject_year_averages,
    }
}

/// Fixed score bands for cohort distributions, highest first. Lower bounds
/// are inclusive; a score lands in the first band whose threshold it
/// reaches, which keeps 10.0 inside the top band.
const SCORE_BANDS: [(&str, f64, f64); 5] = [
    ("excellent", 8.0, 10.0),
    ("good", 6.5, 8.0),
    ("average", 5.0, 6.5),
    ("weak", 3.5, 5.0),
    ("poor", 0.0, 3.5),
];

/// Percentage rendered for display: two decimals plus a trailing `%`.
/// Callers that need to compute further must re-parse.
pub fn format_percent(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (count as f64) * 100.0 / (total as f64))
}

/// Bucket final-exam scores for a cohort. The percentage denominator is the
/// cohort enrollment count, not the count of scored students: members with
/// no recorded final score are absent from every band but still divide the
/// percentages, so bands need not sum to 100%.
pub fn cohort_distribution(final_scores: &[f64], total_students: usize) -> CohortDistribution {
    let mut counts = [0usize; SCORE_BANDS.len()];
    for &score in final_scores {
        for (i, (_, min, _)) in SCORE_BANDS.iter().enumerate() {
            if score >= *min {
                counts[i] += 1;
                break;
            }
        }
    }

    let bands = SCORE_BANDS
        .iter()
        .zip(counts.iter())
        .map(|((label, min, max), count)| ScoreBand {
            label: (*label).to_string(),
            min: *min,
            max: *max,
            count: *count,
            percent: format_percent(*count, total_students),
        })
        .collect();

    CohortDistribution {
        total_students,
        scored_students: final_scores.len(),
        bands,
    }
}
