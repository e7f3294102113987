use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;
use log::info;
use serde::Serialize;

use crate::models::{RunOutcome, TripleStatus};

const COLUMNS: [&str; 13] = [
    "run_id",
    "source",
    "keyword",
    "city",
    "pages_fetched",
    "pages_failed",
    "jobs_found",
    "new",
    "duplicate",
    "failed",
    "status",
    "error",
    "timestamp",
];

#[derive(Serialize)]
struct ReportRow<'a> {
    run_id: String,
    source: &'a str,
    keyword: &'a str,
    city: &'a str,
    pages_fetched: u32,
    pages_failed: u32,
    jobs_found: u64,
    new: u32,
    duplicate: u32,
    failed: u32,
    status: &'a str,
    error: &'a str,
    timestamp: &'a str,
}

/// Appends one row per triple of `outcome` to the CSV at `path`. The header
/// is written whenever the file is missing or empty.
pub fn append_report<P: AsRef<Path>>(path: P, outcome: &RunOutcome) -> Result<(), csv::Error> {
    let path = path.as_ref();
    let needs_header = fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    write_rows(file, outcome, needs_header)?;
    info!("Wrote {} report rows to {:?}", outcome.triples.len(), path);
    Ok(())
}

/// Writes the rows of `outcome`, preceded by the column names when
/// `headers` is set, even if the run had no triples.
pub fn write_rows<W: Write>(writer: W, outcome: &RunOutcome, headers: bool) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    if headers {
        csv_writer.write_record(COLUMNS)?;
    }

    let run_id = outcome.run_id.to_string();
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    for triple in &outcome.triples {
        let (status, error) = match &triple.status {
            TripleStatus::Completed => ("completed", ""),
            TripleStatus::Failed(reason) => ("failed", reason.as_str()),
        };
        csv_writer.serialize(ReportRow {
            run_id: run_id.clone(),
            source: &triple.source,
            keyword: &triple.keyword,
            city: &triple.city,
            pages_fetched: triple.pages_fetched,
            pages_failed: triple.pages_failed,
            jobs_found: triple.jobs_found,
            new: triple.created,
            duplicate: triple.duplicate,
            failed: triple.failed,
            status,
            error,
            timestamp: &timestamp,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmitOutcome, TripleReport};
    use uuid::Uuid;

    fn outcome() -> RunOutcome {
        let mut outcome = RunOutcome::new(Uuid::nil());
        let mut ok = TripleReport::new("zhipin", "Python", "北京");
        ok.pages_fetched = 3;
        ok.jobs_found = 2;
        ok.record(SubmitOutcome::Created);
        ok.record(SubmitOutcome::Duplicate);
        outcome.absorb(ok);
        outcome.absorb(TripleReport::failed(
            "zhipin",
            "Python",
            "上海",
            "failed to launch browser: chrome not found".into(),
        ));
        outcome
    }

    #[test]
    fn test_one_row_per_triple_with_header() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &outcome(), true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(
            "run_id,source,keyword,city,pages_fetched,pages_failed,jobs_found,new,duplicate,failed,status,error,timestamp"
        ));
        assert!(lines[1].starts_with(
            "00000000-0000-0000-0000-000000000000,zhipin,Python,北京,3,0,2,1,1,0,completed,,"
        ));
        assert!(lines[2].contains(",failed,failed to launch browser: chrome not found,"));
    }

    #[test]
    fn test_append_without_header() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &outcome(), false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("run_id"));
    }

    #[test]
    fn test_empty_run_still_writes_header() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &RunOutcome::new(Uuid::nil()), true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![COLUMNS.join(",")]);
    }

    #[test]
    fn test_header_survives_an_empty_first_run() {
        let path = std::env::temp_dir().join(format!("jobs-report-{}.csv", Uuid::new_v4()));

        append_report(&path, &RunOutcome::new(Uuid::nil())).unwrap();
        append_report(&path, &outcome()).unwrap();
        append_report(&path, &outcome()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(text.starts_with("run_id,source,keyword,city"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|line| line.starts_with("run_id")).count(), 1);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let path = std::env::temp_dir().join(format!("jobs-report-{}.csv", Uuid::new_v4()));
        std::fs::File::create(&path).unwrap();

        append_report(&path, &outcome()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(text.starts_with("run_id,"));
        assert_eq!(text.lines().count(), 3);
    }
}
