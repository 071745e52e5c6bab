#![allow(dead_code)]

use chrono::NaiveDate;
use ga4_report::{
    PropertyDirectory, ReportBackend, ReportError, ReportParams, ReportRequest, ReportResult,
    ResponseRow, RunOptions,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub enum Scripted {
    Rows(Vec<ResponseRow>),
    Fail(String),
}

/// Backend answering from a (property id, regex) script, recording every call.
#[derive(Debug, Default)]
pub struct FakeBackend {
    script: HashMap<(String, String), Scripted>,
    delays: HashMap<(String, String), Duration>,
    calls: Mutex<Vec<ReportRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, property_id: &str, regex: &str, rows: Vec<ResponseRow>) -> Self {
        self.script
            .insert(key(property_id, regex), Scripted::Rows(rows));
        self
    }

    pub fn fail(mut self, property_id: &str, regex: &str, message: &str) -> Self {
        self.script
            .insert(key(property_id, regex), Scripted::Fail(message.to_string()));
        self
    }

    pub fn delay(mut self, property_id: &str, regex: &str, delay: Duration) -> Self {
        self.delays.insert(key(property_id, regex), delay);
        self
    }

    pub fn calls(&self) -> Vec<ReportRequest> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(property_id: &str, regex: &str) -> (String, String) {
    (property_id.to_string(), regex.to_string())
}

impl ReportBackend for FakeBackend {
    fn run_report(&self, request: &ReportRequest) -> ReportResult<Vec<ResponseRow>> {
        self.calls.lock().unwrap().push(request.clone());

        let key = key(&request.property_id, &request.page_path_regex);
        if let Some(delay) = self.delays.get(&key) {
            std::thread::sleep(*delay);
        }

        match self.script.get(&key) {
            Some(Scripted::Rows(rows)) => Ok(rows.clone()),
            Some(Scripted::Fail(message)) => {
                Err(ReportError::service_call(&request.property_id, message.clone()))
            }
            None => Ok(Vec::new()),
        }
    }
}

pub fn row(year: &str, month: &str, users: &str, views: &str) -> ResponseRow {
    ResponseRow::new([year, month], [users, views])
}

pub fn directory() -> PropertyDirectory {
    PropertyDirectory::embedded().unwrap()
}

pub fn params(sites: &[&str], regexes: &[&str]) -> ReportParams {
    ReportParams {
        credentials: Some(br#"{"type":"service_account"}"#.to_vec()),
        start_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
        property_ids: sites.iter().map(|s| s.to_string()).collect(),
        regexes: regexes.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn options(workers: usize) -> RunOptions {
    RunOptions {
        workers,
        check_regex: false,
        api_base: Url::parse("http://127.0.0.1:9/").unwrap(),
    }
}

pub fn checked_options(workers: usize) -> RunOptions {
    RunOptions {
        check_regex: true,
        ..options(workers)
    }
}
