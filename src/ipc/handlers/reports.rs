use crate::ipc::error::ok;
use crate::ipc::helpers::{calc_err, db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;

fn handle_subject_average(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let enrollment_id = match required_str(req, "enrollmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match report::subject_average_report(conn, &enrollment_id, &subject_id, &semester_id) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(req, e),
    }
}

fn handle_semester_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let enrollment_id = match required_str(req, "enrollmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match report::semester_summary_report(conn, &enrollment_id, &semester_id) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(req, e),
    }
}

fn handle_year_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let enrollment_id = match required_str(req, "enrollmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year = match required_str(req, "academicYear") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match report::year_summary_report(conn, &enrollment_id, &academic_year) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.subjectAverage" => Some(handle_subject_average(state, req)),
        "reports.semesterSummary" => Some(handle_semester_summary(state, req)),
        "reports.yearSummary" => Some(handle_year_summary(state, req)),
        _ => None,
    }
}
