//! Run-trace persistence: one JSON record per run, written to a trace
//! directory, plus a zip bundle helper for sharing a directory of traces.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;

use crate::state::TraceEntry;

pub const RUN_TRACE_SCHEMA_VERSION: &str = "run_trace_v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTraceRecord {
    pub schema_version: String,
    pub scenario: String,
    pub server: String,
    pub level: String,
    pub model: String,
    pub provider: String,
    pub prompt: String,
    pub success: bool,
    pub hit_error: bool,
    pub switched_service: bool,
    pub failure_reason: Option<String>,
    pub recorded_at: String,
    pub conversation: Vec<Value>,
    pub trace: Vec<TraceEntry>,
}

pub trait TraceSink {
    fn write_run(&mut self, record: &RunTraceRecord) -> Result<PathBuf>;
}

pub struct JsonTraceSink {
    dir: PathBuf,
}

impl JsonTraceSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }
}

impl TraceSink for JsonTraceSink {
    fn write_run(&mut self, record: &RunTraceRecord) -> Result<PathBuf> {
        let path = self
            .dir
            .join(format!("{}_{}.json", record.scenario, record.level));
        fs::write(&path, serde_json::to_vec_pretty(record)?)?;
        Ok(path)
    }
}

/// Zip every trace file under `trace_dir` into `out_path`.
pub fn bundle_traces(trace_dir: &Path, out_path: &Path) -> Result<()> {
    let file = File::create(out_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let opts = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in walkdir::WalkDir::new(trace_dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            let path = entry.path();
            let name = path
                .strip_prefix(trace_dir)
                .unwrap_or(path)
                .to_string_lossy();
            zip.start_file(name, opts)?;
            let data = fs::read(path)?;
            zip.write_all(&data)?;
        }
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_root(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("bench_runner_sink_{}_{}", label, nanos))
    }

    fn sample_record() -> RunTraceRecord {
        RunTraceRecord {
            schema_version: RUN_TRACE_SCHEMA_VERSION.to_string(),
            scenario: "maps_geocode".to_string(),
            server: "maps".to_string(),
            level: "easy".to_string(),
            model: "gpt-5.2".to_string(),
            provider: "openai".to_string(),
            prompt: "Geocode the address.".to_string(),
            success: true,
            hit_error: true,
            switched_service: true,
            failure_reason: None,
            recorded_at: "2026-08-07T00:00:00Z".to_string(),
            conversation: vec![json!({"turn": 0, "role": "user", "content": "Geocode"})],
            trace: vec![TraceEntry {
                tool: "location_resolve".to_string(),
                resolved_tool: "mbx_location_encode".to_string(),
                args: Default::default(),
                result: json!({"features": [{"place_name": "x"}]}),
            }],
        }
    }

    #[test]
    fn trace_files_land_under_scenario_level_names() {
        let dir = temp_root("write");
        let mut sink = JsonTraceSink::new(&dir).expect("sink");
        let path = sink.write_run(&sample_record()).expect("write");
        assert!(path.ends_with("maps_geocode_easy.json"));
        let data: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
        assert_eq!(data["schema_version"], RUN_TRACE_SCHEMA_VERSION);
        assert_eq!(data["trace"][0]["resolved_tool"], "mbx_location_encode");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn records_validate_against_embedded_schema() {
        let schema = bench_schemas::compile_schema("run_trace.schema.json").expect("schema");
        let record = serde_json::to_value(sample_record()).expect("to value");
        assert!(schema.validate(&record).is_ok(), "record should validate");
    }

    #[test]
    fn bundles_include_every_trace_file() {
        let root = temp_root("bundle");
        let dir = root.join("traces");
        let mut sink = JsonTraceSink::new(&dir).expect("sink");
        sink.write_run(&sample_record()).expect("write");
        let out = root.join("bundle.zip");
        bundle_traces(&dir, &out).expect("bundle");
        let file = File::open(&out).expect("open zip");
        let archive = zip::ZipArchive::new(file).expect("read zip");
        assert_eq!(archive.len(), 1);
        let _ = fs::remove_dir_all(root);
    }
}
