use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the workspace database. The entity tables are written by
/// the surrounding administration platform; this daemon only reads them, so
/// the schema here exists to make a fresh workspace open cleanly and to give
/// tests a canonical layout to seed.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("scorebook.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    create_schema(&conn)?;
    Ok(conn)
}

pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            grade INTEGER NOT NULL,
            anchor INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_grade ON subjects(grade, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS semesters(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            ordinal INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_semesters_year ON semesters(academic_year, ordinal)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            grade INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_grade ON classes(grade)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(student_id, class_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_class ON enrollments(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            id TEXT PRIMARY KEY,
            enrollment_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            semester_id TEXT NOT NULL,
            score REAL NOT NULL,
            weight INTEGER NOT NULL,
            feedback TEXT,
            updated_at TEXT,
            FOREIGN KEY(enrollment_id) REFERENCES enrollments(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(semester_id) REFERENCES semesters(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_enrollment
         ON scores(enrollment_id, semester_id, subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_selector
         ON scores(semester_id, subject_id, weight)",
        [],
    )?;

    Ok(())
}
