//! Score record supplier: materializes assessment records and the cohort,
//! subject, and semester metadata the calc engine consumes. Every function
//! here reads a point-in-time snapshot from the workspace database; nothing
//! in this module computes averages.

use crate::calc::{CalcError, ScoreRecord, SemesterMeta, SubjectMeta, WEIGHT_FINAL};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

fn db_err(e: rusqlite::Error) -> CalcError {
    CalcError::new("db_query_failed", e.to_string())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentContext {
    pub enrollment_id: String,
    pub student_id: String,
    pub display_name: String,
    pub class_id: String,
    pub class_name: String,
    pub grade: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    pub id: String,
    pub name: String,
    pub grade: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRow {
    pub id: String,
    pub student_id: String,
    pub display_name: String,
    pub active: bool,
}

pub fn enrollment_context(
    conn: &Connection,
    enrollment_id: &str,
) -> Result<EnrollmentContext, CalcError> {
    conn.query_row(
        "SELECT e.id, s.id, s.last_name, s.first_name, c.id, c.name, c.grade
         FROM enrollments e
         JOIN students s ON s.id = e.student_id
         JOIN classes c ON c.id = e.class_id
         WHERE e.id = ?",
        [enrollment_id],
        |r| {
            let last: String = r.get(2)?;
            let first: String = r.get(3)?;
            Ok(EnrollmentContext {
                enrollment_id: r.get(0)?,
                student_id: r.get(1)?,
                display_name: format!("{}, {}", last, first),
                class_id: r.get(4)?,
                class_name: r.get(5)?,
                grade: r.get(6)?,
            })
        },
    )
    .optional()
    .map_err(db_err)?
    .ok_or_else(|| CalcError::new("not_found", "enrollment not found"))
}

pub fn class_row(conn: &Connection, class_id: &str) -> Result<ClassRow, CalcError> {
    conn.query_row(
        "SELECT id, name, grade FROM classes WHERE id = ?",
        [class_id],
        |r| {
            Ok(ClassRow {
                id: r.get(0)?,
                name: r.get(1)?,
                grade: r.get(2)?,
            })
        },
    )
    .optional()
    .map_err(db_err)?
    .ok_or_else(|| CalcError::new("not_found", "class not found"))
}

pub fn subject_meta(conn: &Connection, subject_id: &str) -> Result<SubjectMeta, CalcError> {
    conn.query_row(
        "SELECT id, name, anchor, sort_order FROM subjects WHERE id = ?",
        [subject_id],
        |r| {
            Ok(SubjectMeta {
                id: r.get(0)?,
                name: r.get(1)?,
                anchor: r.get::<_, i64>(2)? != 0,
                sort_order: r.get(3)?,
            })
        },
    )
    .optional()
    .map_err(db_err)?
    .ok_or_else(|| CalcError::new("not_found", "subject not found"))
}

/// The subject list that defines a grade's semester rollup. Order is the
/// display order; a summary emits one entry per row here even when no
/// scores exist.
pub fn subjects_for_grade(conn: &Connection, grade: i64) -> Result<Vec<SubjectMeta>, CalcError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, anchor, sort_order
             FROM subjects
             WHERE grade = ?
             ORDER BY sort_order, name",
        )
        .map_err(db_err)?;
    stmt.query_map([grade], |r| {
        Ok(SubjectMeta {
            id: r.get(0)?,
            name: r.get(1)?,
            anchor: r.get::<_, i64>(2)? != 0,
            sort_order: r.get(3)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

pub fn semester_meta(conn: &Connection, semester_id: &str) -> Result<SemesterMeta, CalcError> {
    conn.query_row(
        "SELECT id, name, academic_year, ordinal FROM semesters WHERE id = ?",
        [semester_id],
        |r| {
            Ok(SemesterMeta {
                id: r.get(0)?,
                name: r.get(1)?,
                academic_year: r.get(2)?,
                ordinal: r.get(3)?,
            })
        },
    )
    .optional()
    .map_err(db_err)?
    .ok_or_else(|| CalcError::new("not_found", "semester not found"))
}

pub fn semesters_for_year(
    conn: &Connection,
    academic_year: &str,
) -> Result<Vec<SemesterMeta>, CalcError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, academic_year, ordinal
             FROM semesters
             WHERE academic_year = ?
             ORDER BY ordinal",
        )
        .map_err(db_err)?;
    stmt.query_map([academic_year], |r| {
        Ok(SemesterMeta {
            id: r.get(0)?,
            name: r.get(1)?,
            academic_year: r.get(2)?,
            ordinal: r.get(3)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

fn score_record_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ScoreRecord> {
    Ok(ScoreRecord {
        id: r.get(0)?,
        enrollment_id: r.get(1)?,
        subject_id: r.get(2)?,
        semester_id: r.get(3)?,
        score: r.get(4)?,
        weight: r.get(5)?,
        feedback: r.get(6)?,
    })
}

/// All records for one (enrollment, subject, semester) selector, the unit
/// the weighted aggregator reduces.
pub fn scores_for(
    conn: &Connection,
    enrollment_id: &str,
    subject_id: &str,
    semester_id: &str,
) -> Result<Vec<ScoreRecord>, CalcError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, enrollment_id, subject_id, semester_id, score, weight, feedback
             FROM scores
             WHERE enrollment_id = ? AND subject_id = ? AND semester_id = ?
             ORDER BY weight, id",
        )
        .map_err(db_err)?;
    stmt.query_map([enrollment_id, subject_id, semester_id], |r| {
        score_record_from_row(r)
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

/// One semester's records for an enrollment, grouped by subject. Subjects
/// with no records simply have no entry; the summarizer zero-fills them.
pub fn scores_by_subject(
    conn: &Connection,
    enrollment_id: &str,
    semester_id: &str,
) -> Result<HashMap<String, Vec<ScoreRecord>>, CalcError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, enrollment_id, subject_id, semester_id, score, weight, feedback
             FROM scores
             WHERE enrollment_id = ? AND semester_id = ?
             ORDER BY weight, id",
        )
        .map_err(db_err)?;
    let records = stmt
        .query_map([enrollment_id, semester_id], |r| score_record_from_row(r))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)?;

    let mut by_subject: HashMap<String, Vec<ScoreRecord>> = HashMap::new();
    for record in records {
        by_subject
            .entry(record.subject_id.clone())
            .or_default()
            .push(record);
    }
    Ok(by_subject)
}

/// Enrollment count for a statistics cohort: one class, or every class of
/// the grade. This is the percentage denominator, independent of how many
/// of those students have a recorded final score.
pub fn cohort_enrollment_count(
    conn: &Connection,
    grade: i64,
    class_id: Option<&str>,
) -> Result<usize, CalcError> {
    let count: i64 = if let Some(class_id) = class_id {
        conn.query_row(
            "SELECT COUNT(*)
             FROM enrollments e
             JOIN classes c ON c.id = e.class_id
             WHERE c.grade = ? AND c.id = ?",
            (grade, class_id),
            |r| r.get(0),
        )
        .map_err(db_err)?
    } else {
        conn.query_row(
            "SELECT COUNT(*)
             FROM enrollments e
             JOIN classes c ON c.id = e.class_id
             WHERE c.grade = ?",
            [grade],
            |r| r.get(0),
        )
        .map_err(db_err)?
    };
    Ok(count.max(0) as usize)
}

/// Final-exam scores for a (grade, semester, subject) cohort, optionally
/// restricted to one class. Frequent and mid-term records never enter the
/// distribution.
pub fn cohort_final_scores(
    conn: &Connection,
    grade: i64,
    semester_id: &str,
    subject_id: &str,
    class_id: Option<&str>,
) -> Result<Vec<f64>, CalcError> {
    if let Some(class_id) = class_id {
        let mut stmt = conn
            .prepare(
                "SELECT sc.score
                 FROM scores sc
                 JOIN enrollments e ON e.id = sc.enrollment_id
                 JOIN classes c ON c.id = e.class_id
                 WHERE c.grade = ? AND c.id = ?
                   AND sc.semester_id = ? AND sc.subject_id = ? AND sc.weight = ?",
            )
            .map_err(db_err)?;
        stmt.query_map(
            (grade, class_id, semester_id, subject_id, WEIGHT_FINAL),
            |r| r.get(0),
        )
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)
    } else {
        let mut stmt = conn
            .prepare(
                "SELECT sc.score
                 FROM scores sc
                 JOIN enrollments e ON e.id = sc.enrollment_id
                 JOIN classes c ON c.id = e.class_id
                 WHERE c.grade = ?
                   AND sc.semester_id = ? AND sc.subject_id = ? AND sc.weight = ?",
            )
            .map_err(db_err)?;
        stmt.query_map((grade, semester_id, subject_id, WEIGHT_FINAL), |r| {
            r.get(0)
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)
    }
}

pub fn list_classes(conn: &Connection) -> Result<Vec<ClassRow>, CalcError> {
    let mut stmt = conn
        .prepare("SELECT id, name, grade FROM classes ORDER BY grade, name")
        .map_err(db_err)?;
    stmt.query_map([], |r| {
        Ok(ClassRow {
            id: r.get(0)?,
            name: r.get(1)?,
            grade: r.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

pub fn list_semesters(
    conn: &Connection,
    academic_year: Option<&str>,
) -> Result<Vec<SemesterMeta>, CalcError> {
    if let Some(year) = academic_year {
        return semesters_for_year(conn, year);
    }
    let mut stmt = conn
        .prepare(
            "SELECT id, name, academic_year, ordinal
             FROM semesters
             ORDER BY academic_year, ordinal",
        )
        .map_err(db_err)?;
    stmt.query_map([], |r| {
        Ok(SemesterMeta {
            id: r.get(0)?,
            name: r.get(1)?,
            academic_year: r.get(2)?,
            ordinal: r.get(3)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

pub fn list_enrollments(
    conn: &Connection,
    class_id: &str,
) -> Result<Vec<EnrollmentRow>, CalcError> {
    let mut stmt = conn
        .prepare(
            "SELECT e.id, s.id, s.last_name, s.first_name, s.active
             FROM enrollments e
             JOIN students s ON s.id = e.student_id
             WHERE e.class_id = ?
             ORDER BY s.last_name, s.first_name",
        )
        .map_err(db_err)?;
    stmt.query_map([class_id], |r| {
        let last: String = r.get(2)?;
        let first: String = r.get(3)?;
        Ok(EnrollmentRow {
            id: r.get(0)?,
            student_id: r.get(1)?,
            display_name: format!("{}, {}", last, first),
            active: r.get::<_, i64>(4)? != 0,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        db::create_schema(&conn).expect("schema");

        conn.execute(
            "INSERT INTO subjects(id, name, grade, anchor, sort_order)
             VALUES ('mat', 'Mathematics', 7, 1, 1), ('phy', 'Physics', 7, 0, 2)",
            [],
        )
        .expect("subjects");
        conn.execute(
            "INSERT INTO semesters(id, name, academic_year, ordinal)
             VALUES ('s1', 'Semester 1', '2024-2025', 1)",
            [],
        )
        .expect("semesters");
        conn.execute(
            "INSERT INTO classes(id, name, grade) VALUES ('c1', '7A', 7)",
            [],
        )
        .expect("classes");
        conn.execute(
            "INSERT INTO students(id, last_name, first_name, active)
             VALUES ('st1', 'Doe', 'Alex', 1)",
            [],
        )
        .expect("students");
        conn.execute(
            "INSERT INTO enrollments(id, student_id, class_id) VALUES ('e1', 'st1', 'c1')",
            [],
        )
        .expect("enrollments");
        conn.execute(
            "INSERT INTO scores(id, enrollment_id, subject_id, semester_id, score, weight, feedback)
             VALUES ('r1', 'e1', 'mat', 's1', 8.0, 1, NULL),
                    ('r2', 'e1', 'mat', 's1', 6.0, 2, 'keep at it'),
                    ('r3', 'e1', 'mat', 's1', 7.0, 3, NULL)",
            [],
        )
        .expect("scores");
        conn
    }

    #[test]
    fn scores_for_returns_the_selector_records() {
        let conn = seeded_conn();
        let records = scores_for(&conn, "e1", "mat", "s1").expect("scores");
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].feedback.as_deref(), Some("keep at it"));
    }

    #[test]
    fn missing_enrollment_is_not_found() {
        let conn = seeded_conn();
        let err = enrollment_context(&conn, "missing").expect_err("missing enrollment");
        assert_eq!(err.code, "not_found");
    }

    #[test]
    fn cohort_queries_restrict_to_final_weight() {
        let conn = seeded_conn();
        let scores = cohort_final_scores(&conn, 7, "s1", "mat", None).expect("cohort scores");
        assert_eq!(scores, vec![7.0]);
        assert_eq!(
            cohort_enrollment_count(&conn, 7, None).expect("count"),
            1
        );
        assert_eq!(
            cohort_enrollment_count(&conn, 7, Some("c1")).expect("count"),
            1
        );
    }
}
