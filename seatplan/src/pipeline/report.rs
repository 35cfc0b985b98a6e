//! Plain-text result report of a completed run.
//!
//! ```text
//! ====================[ Stage results ]====================
//! session_id: ...
//! scenario: ...
//!
//! ====================[ analyze_input ]====================
//! { ... }
//!
//! ====================[ Run time ]====================
//! analyze_input_run_time: 1.234s
//! total_run_time: 4.321s
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::info;

use super::runner::PipelineRun;

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "====================[ {title} ]====================");
}

/// Render the report text.
pub fn render_report(run: &PipelineRun) -> String {
    let mut out = String::new();

    section(&mut out, "Stage results");
    let _ = writeln!(out, "session_id: {}", run.session_id);
    let _ = writeln!(out, "scenario: {}", run.input.scenario);
    let _ = writeln!(out, "people_count: {}", run.input.people_count);
    let _ = writeln!(
        out,
        "completed_at: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    out.push('\n');

    for record in &run.stages {
        section(&mut out, &record.name);
        out.push_str(record.output.render().trim_end());
        out.push_str("\n\n");
    }

    section(&mut out, "Run time");
    for record in &run.stages {
        let _ = writeln!(
            out,
            "{}_run_time: {:.3}s",
            record.name,
            record.duration.as_secs_f64()
        );
    }
    let _ = writeln!(out, "total_run_time: {:.3}s", run.total_elapsed.as_secs_f64());
    out
}

/// `<output_dir>/log_data/<scenario>.txt`, with the scenario made file-safe.
pub fn report_path(output_dir: &Path, scenario: &str) -> PathBuf {
    let mut stem: String = scenario
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        stem.push_str("scenario");
    }
    output_dir.join("log_data").join(format!("{stem}.txt"))
}

/// Write the report, creating `log_data/` if needed. Overwrites any
/// earlier report for the same scenario.
pub fn write_report(output_dir: &Path, run: &PipelineRun) -> io::Result<PathBuf> {
    let path = report_path(output_dir, &run.input.scenario);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, render_report(run))?;
    info!(path = %path.display(), "Result report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunInput, StageOutput, StageRecord};
    use crate::session::SessionId;
    use serde_json::json;
    use std::time::Duration;

    fn sample_run() -> PipelineRun {
        let record = |name: &str, millis: u64, output: StageOutput| StageRecord {
            name: name.to_string(),
            label: name.to_string(),
            started_at: Utc::now(),
            duration: Duration::from_millis(millis),
            output,
        };
        PipelineRun {
            session_id: SessionId::from("abc"),
            run_id: "run-1".to_string(),
            input: RunInput::new("lunch rush", 6, "img.png"),
            stages: vec![
                record("analyze_input", 1234, StageOutput::Analysis(json!({"people": 6}))),
                record("plan_actions", 500, StageOutput::ActionPlan("plan text\n".into())),
            ],
            total_elapsed: Duration::from_millis(1800),
            report_path: None,
        }
    }

    #[test]
    fn test_render_sections_and_timing() {
        let text = render_report(&sample_run());

        assert!(text.starts_with("====================[ Stage results ]===================="));
        assert!(text.contains("scenario: lunch rush\n"));
        assert!(text.contains("====================[ analyze_input ]====================\n{\n  \"people\": 6\n}\n"));
        assert!(text.contains("====================[ plan_actions ]====================\nplan text\n\n"));
        assert!(text.contains("analyze_input_run_time: 1.234s\n"));
        assert!(text.contains("plan_actions_run_time: 0.500s\n"));
        assert!(text.ends_with("total_run_time: 1.800s\n"));
    }

    #[test]
    fn test_report_path_is_file_safe() {
        let root = Path::new("/out");
        assert_eq!(
            report_path(root, "lunch rush/2"),
            PathBuf::from("/out/log_data/lunch_rush_2.txt")
        );
        assert_eq!(report_path(root, "  "), PathBuf::from("/out/log_data/scenario.txt"));
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_report(dir.path(), &sample_run()).unwrap();
        assert!(path.ends_with("log_data/lunch_rush.txt"));
        assert!(fs::read_to_string(path).unwrap().contains("total_run_time"));
    }
}
