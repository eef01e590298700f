//! Report builders: fetch through the supplier, reduce through the calc
//! engine, and hand a display model back to the IPC layer. Rounding
//! precision is chosen here, per call site: subject detail views report 2
//! decimals, everything feeding a rollup reports 1.

use crate::calc::{self, CalcError};
use crate::supply;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverageReport {
    pub generated_at: String,
    pub enrollment: supply::EnrollmentContext,
    pub semester: calc::SemesterMeta,
    pub subject: calc::SubjectMeta,
    pub average: f64,
    pub record_count: usize,
    pub records: Vec<calc::ScoreRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummaryReport {
    pub generated_at: String,
    pub enrollment: supply::EnrollmentContext,
    pub semester: calc::SemesterMeta,
    pub summary: calc::SemesterSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummaryReport {
    pub generated_at: String,
    pub enrollment: supply::EnrollmentContext,
    pub first_semester: calc::SemesterMeta,
    pub second_semester: calc::SemesterMeta,
    pub summary: calc::AcademicYearSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionReport {
    pub generated_at: String,
    pub grade: i64,
    pub semester: calc::SemesterMeta,
    pub subject: calc::SubjectMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<supply::ClassRow>,
    pub distribution: calc::CohortDistribution,
}

fn generated_at() -> String {
    Utc::now().to_rfc3339()
}

pub fn subject_average_report(
    conn: &Connection,
    enrollment_id: &str,
    subject_id: &str,
    semester_id: &str,
) -> Result<SubjectAverageReport, CalcError> {
    let enrollment = supply::enrollment_context(conn, enrollment_id)?;
    let semester = supply::semester_meta(conn, semester_id)?;
    let subject = supply::subject_meta(conn, subject_id)?;
    let records = supply::scores_for(conn, enrollment_id, subject_id, semester_id)?;
    let average = calc::weighted_average(&records, calc::DETAIL_PLACES);

    Ok(SubjectAverageReport {
        generated_at: generated_at(),
        enrollment,
        semester,
        subject,
        average,
        record_count: records.len(),
        records,
    })
}

/// One semester summary for an enrollment: one subject average per subject
/// defined for the enrollment's grade, zero-filled where no records exist.
fn build_semester_summary(
    conn: &Connection,
    enrollment: &supply::EnrollmentContext,
    semester_id: &str,
) -> Result<calc::SemesterSummary, CalcError> {
    let subjects = supply::subjects_for_grade(conn, enrollment.grade)?;
    let mut by_subject = supply::scores_by_subject(conn, &enrollment.enrollment_id, semester_id)?;

    let averages = subjects
        .iter()
        .map(|subject| {
            let records = by_subject.remove(&subject.id).unwrap_or_default();
            calc::subject_average(subject, &records, calc::ROLLUP_PLACES)
        })
        .collect();

    Ok(calc::semester_summary(semester_id, averages))
}

pub fn semester_summary_report(
    conn: &Connection,
    enrollment_id: &str,
    semester_id: &str,
) -> Result<SemesterSummaryReport, CalcError> {
    let enrollment = supply::enrollment_context(conn, enrollment_id)?;
    let semester = supply::semester_meta(conn, semester_id)?;
    let summary = build_semester_summary(conn, &enrollment, semester_id)?;

    Ok(SemesterSummaryReport {
        generated_at: generated_at(),
        enrollment,
        semester,
        summary,
    })
}

pub fn year_summary_report(
    conn: &Connection,
    enrollment_id: &str,
    academic_year: &str,
) -> Result<YearSummaryReport, CalcError> {
    let enrollment = supply::enrollment_context(conn, enrollment_id)?;
    let semesters = supply::semesters_for_year(conn, academic_year)?;
    let (first, second) = calc::year_semester_pair(semesters)?;

    let first_summary = build_semester_summary(conn, &enrollment, &first.id)?;
    let second_summary = build_semester_summary(conn, &enrollment, &second.id)?;
    let summary = calc::academic_year_summary(academic_year, &first_summary, &second_summary);

    Ok(YearSummaryReport {
        generated_at: generated_at(),
        enrollment,
        first_semester: first,
        second_semester: second,
        summary,
    })
}

pub fn distribution_report(
    conn: &Connection,
    grade: i64,
    semester_id: &str,
    subject_id: &str,
    class_id: Option<&str>,
) -> Result<DistributionReport, CalcError> {
    let semester = supply::semester_meta(conn, semester_id)?;
    let subject = supply::subject_meta(conn, subject_id)?;

    let class = match class_id {
        Some(id) => {
            let row = supply::class_row(conn, id)?;
            if row.grade != grade {
                return Err(CalcError::new(
                    "bad_params",
                    "class does not belong to the requested grade",
                ));
            }
            Some(row)
        }
        None => None,
    };

    let total_students = supply::cohort_enrollment_count(conn, grade, class_id)?;
    let final_scores = supply::cohort_final_scores(conn, grade, semester_id, subject_id, class_id)?;
    let distribution = calc::cohort_distribution(&final_scores, total_students);

    Ok(DistributionReport {
        generated_at: generated_at(),
        grade,
        semester,
        subject,
        class,
        distribution,
    })
}
