use crate::ipc::error::ok;
use crate::ipc::helpers::{calc_err, db_conn, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;

fn handle_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match required_i64(req, "grade") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match report::distribution_report(
        conn,
        grade,
        &semester_id,
        &subject_id,
        class_id.as_deref(),
    ) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.distribution" => Some(handle_distribution(state, req)),
        _ => None,
    }
}
