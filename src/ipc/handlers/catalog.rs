use crate::ipc::error::ok;
use crate::ipc::helpers::{calc_err, db_conn, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::supply;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match supply::list_classes(conn) {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => calc_err(req, e),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade = match required_i64(req, "grade") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match supply::subjects_for_grade(conn, grade) {
        Ok(subjects) => ok(&req.id, json!({ "grade": grade, "subjects": subjects })),
        Err(e) => calc_err(req, e),
    }
}

fn handle_semesters_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year = match optional_str(req, "academicYear") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match supply::list_semesters(conn, academic_year.as_deref()) {
        Ok(semesters) => ok(&req.id, json!({ "semesters": semesters })),
        Err(e) => calc_err(req, e),
    }
}

fn handle_enrollments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class = match supply::class_row(conn, &class_id) {
        Ok(v) => v,
        Err(e) => return calc_err(req, e),
    };
    match supply::list_enrollments(conn, &class_id) {
        Ok(enrollments) => ok(&req.id, json!({ "class": class, "enrollments": enrollments })),
        Err(e) => calc_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "semesters.list" => Some(handle_semesters_list(state, req)),
        "enrollments.list" => Some(handle_enrollments_list(state, req)),
        _ => None,
    }
}
