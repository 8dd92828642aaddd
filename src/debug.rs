use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines trace of layout decisions, one file per logger.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_prune(&self, table_id: u32, requested: usize, removed: usize, remaining: usize) {
        let json = format!(
            "{{\"type\":\"table.prune\",\"table_id\":{},\"requested\":{},\"removed\":{},\"remaining\":{}}}",
            table_id, requested, removed, remaining
        );
        self.log_json(&json);
        self.increment("table.prune", 1);
        self.increment("table.prune.rows", removed as u64);
    }

    pub fn log_validate(&self, table_id: u32, pass: &str, rows: usize, skipped: bool) {
        let json = format!(
            "{{\"type\":\"table.validate\",\"table_id\":{},\"pass\":\"{}\",\"rows\":{},\"skipped\":{}}}",
            table_id,
            json_escape(pass),
            rows,
            if skipped { "true" } else { "false" }
        );
        self.log_json(&json);
        let key = if skipped {
            format!("table.validate.{pass}.skipped")
        } else {
            format!("table.validate.{pass}")
        };
        self.increment(&key, 1);
    }

    pub fn log_validate_actual(
        &self,
        table_id: u32,
        start: usize,
        settled: usize,
        rows: usize,
    ) {
        let json = format!(
            "{{\"type\":\"table.validate_actual\",\"table_id\":{},\"start\":{},\"settled\":{},\"rows\":{},\"rescanned\":{}}}",
            table_id,
            start,
            settled,
            rows,
            rows.saturating_sub(start)
        );
        self.log_json(&json);
        self.increment("table.validate.actual", 1);
        self.increment(
            "table.validate.actual.rescanned",
            rows.saturating_sub(start) as u64,
        );
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Writes the accumulated counters as one summary line and resets them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
