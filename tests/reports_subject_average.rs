use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_scorebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn scorebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    value["error"]["code"].as_str().unwrap_or("").to_string()
}

fn seed(workspace: &Path) {
    let conn = scorebookd::db::open_db(workspace).expect("open workspace db");
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
        "INSERT INTO classes(id, name, grade) VALUES ('c-7a', '7A', 7)",
        [],
    )
    .expect("classes");
    conn.execute(
        "INSERT INTO students(id, last_name, first_name, active)
         VALUES ('st-1', 'Nguyen', 'An', 1)",
        [],
    )
    .expect("students");
    conn.execute(
        "INSERT INTO enrollments(id, student_id, class_id) VALUES ('e-1', 'st-1', 'c-7a')",
        [],
    )
    .expect("enrollments");

    let frequent_id = uuid::Uuid::new_v4().to_string();
    let midterm_id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO scores(id, enrollment_id, subject_id, semester_id, score, weight, feedback)
         VALUES (?1, 'e-1', 'mat', 's1', 8.0, 1, 'solid work'),
                (?2, 'e-1', 'mat', 's1', 6.0, 2, NULL)",
        (&frequent_id, &midterm_id),
    )
    .expect("scores");
}

#[test]
fn subject_detail_uses_weight_sum_and_two_decimals() {
    let workspace = temp_dir("scorebook-subject-average");
    seed(&workspace);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.subjectAverage",
        json!({ "enrollmentId": "e-1", "subjectId": "mat", "semesterId": "s1" }),
    );
    // (8*1 + 6*2) / (1 + 2), divisor is the weight sum, detail precision.
    assert_eq!(detail["average"].as_f64(), Some(6.67));
    assert_eq!(detail["recordCount"].as_u64(), Some(2));
    assert_eq!(detail["subject"]["anchor"].as_bool(), Some(true));
    assert_eq!(detail["semester"]["academicYear"].as_str(), Some("2024-2025"));
    let records = detail["records"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["feedback"].as_str(), Some("solid work"));
    assert_eq!(records[1]["feedback"], serde_json::Value::Null);

    // No records at all: a zero average, never an error.
    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.subjectAverage",
        json!({ "enrollmentId": "e-1", "subjectId": "phy", "semesterId": "s1" }),
    );
    assert_eq!(empty["average"].as_f64(), Some(0.0));
    assert_eq!(empty["recordCount"].as_u64(), Some(0));

    // Same immutable input, same output.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "reports.subjectAverage",
        json!({ "enrollmentId": "e-1", "subjectId": "mat", "semesterId": "s1" }),
    );
    assert_eq!(again["average"], detail["average"]);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "reports.subjectAverage",
        json!({ "enrollmentId": "nobody", "subjectId": "mat", "semesterId": "s1" }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
