//! Host effect sink
//!
//! The minimal external world: a `log` handler with transactional
//! buffering and a `load` handler over a module environment.
//!
//! Log requests look like `log:(lv:warn, text:"...", val:<v>)`; they buffer
//! inside open transaction frames, so a message emitted inside a rolled-back
//! `cond` try never reaches the world. Messages surviving to depth zero are
//! kept (observable through `committed`) and emitted through `tracing` at
//! the requested level.
//!
//! Load requests are `load:global:"name"`, `load:local:"name"`,
//! `load:dict`, or `load:dict:"name"`, resolved against maps and a
//! dictionary record supplied by the embedder. Loads are read-only and need
//! no buffering. Unknown names and unknown request shapes deny the effect.

use crate::effects::{EffectSink, TxnBuffer};
use glas_core::{Value, record};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn of_symbol(name: &str) -> Option<LogLevel> {
        match name {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub text: String,
    pub value: Option<Value>,
}

#[derive(Debug, Default)]
pub struct HostSink {
    globals: HashMap<String, Value>,
    locals: HashMap<String, Value>,
    dict: Value,
    buffer: TxnBuffer<LogMessage>,
    committed: Vec<LogMessage>,
}

impl HostSink {
    pub fn new() -> HostSink {
        HostSink::default()
    }

    pub fn define_global(&mut self, name: impl Into<String>, v: Value) {
        self.globals.insert(name.into(), v);
    }

    pub fn define_local(&mut self, name: impl Into<String>, v: Value) {
        self.locals.insert(name.into(), v);
    }

    /// Install the dictionary record served by `load:dict`.
    pub fn set_dict(&mut self, dict: Value) {
        self.dict = dict;
    }

    /// Log messages that reached the world, in order.
    pub fn committed(&self) -> &[LogMessage] {
        &self.committed
    }

    fn log(&mut self, payload: &Value) -> Option<Value> {
        let level = record::get("lv", payload)
            .and_then(|lv| lv.as_symbol())
            .and_then(|name| LogLevel::of_symbol(&name))
            .unwrap_or(LogLevel::Info);
        let text = record::get("text", payload)
            .and_then(|t| t.to_str())
            .unwrap_or_default();
        let value = record::get("val", payload);
        self.buffer.record(LogMessage { level, text, value });
        self.flush_delivered();
        Some(Value::unit())
    }

    fn resolve(&self, reference: &Value) -> Option<Value> {
        let (tag, payload) = record::as_variant(reference)?;
        match tag.as_str() {
            "global" => self.globals.get(&payload.to_str()?).cloned(),
            "local" => self.locals.get(&payload.to_str()?).cloned(),
            "dict" => {
                if payload.is_unit() {
                    Some(self.dict.clone())
                } else {
                    record::get(&payload.to_str()?, &self.dict)
                }
            }
            _ => None,
        }
    }

    fn flush_delivered(&mut self) {
        for msg in self.buffer.drain_delivered() {
            emit(&msg);
            self.committed.push(msg);
        }
    }
}

fn emit(msg: &LogMessage) {
    match msg.level {
        LogLevel::Debug => tracing::debug!(target: "glas", value = ?msg.value, "{}", msg.text),
        LogLevel::Info => tracing::info!(target: "glas", value = ?msg.value, "{}", msg.text),
        LogLevel::Warn => tracing::warn!(target: "glas", value = ?msg.value, "{}", msg.text),
        LogLevel::Error => tracing::error!(target: "glas", value = ?msg.value, "{}", msg.text),
    }
}

impl EffectSink for HostSink {
    fn handle(&mut self, request: &Value) -> Option<Value> {
        let (tag, payload) = record::as_variant(request)?;
        match tag.as_str() {
            "log" => self.log(&payload),
            "load" => self.resolve(&payload),
            _ => None,
        }
    }

    fn begin(&mut self) {
        self.buffer.begin();
    }

    fn commit(&mut self) {
        self.buffer.commit();
        self.flush_delivered();
    }

    fn abort(&mut self) {
        self.buffer.abort();
    }
}

/// Build a `log:(lv:…, text:…)` request value.
pub fn log_request(level: LogLevel, text: &str) -> Value {
    let mut r = Value::unit();
    r = record::put("lv", Value::symbol(level.name()), &r);
    r = record::put("text", Value::of_str(text), &r);
    Value::variant("log", r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sink: &HostSink) -> Vec<&str> {
        sink.committed().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_log_at_depth_zero_commits_immediately() {
        let mut sink = HostSink::new();
        let resp = sink.handle(&log_request(LogLevel::Info, "hello"));
        assert_eq!(resp, Some(Value::unit()));
        assert_eq!(texts(&sink), vec!["hello"]);
        assert_eq!(sink.committed()[0].level, LogLevel::Info);
    }

    #[test]
    fn test_aborted_frame_drops_messages() {
        let mut sink = HostSink::new();
        sink.begin();
        assert!(sink.handle(&log_request(LogLevel::Warn, "speculative")).is_some());
        sink.abort();
        assert!(sink.committed().is_empty());

        sink.begin();
        assert!(sink.handle(&log_request(LogLevel::Warn, "kept")).is_some());
        sink.commit();
        assert_eq!(texts(&sink), vec!["kept"]);
    }

    #[test]
    fn test_nested_commit_still_revertible() {
        let mut sink = HostSink::new();
        sink.begin();
        sink.begin();
        assert!(sink.handle(&log_request(LogLevel::Info, "inner")).is_some());
        sink.commit();
        sink.abort();
        assert!(sink.committed().is_empty());
    }

    #[test]
    fn test_log_with_value_and_default_level() {
        let mut sink = HostSink::new();
        let mut payload = Value::unit();
        payload = record::put("text", Value::of_str("v"), &payload);
        payload = record::put("val", Value::of_nat(7), &payload);
        assert!(sink.handle(&Value::variant("log", payload)).is_some());
        let msg = &sink.committed()[0];
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.value, Some(Value::of_nat(7)));
    }

    #[test]
    fn test_load_global_and_local() {
        let mut sink = HostSink::new();
        sink.define_global("mod", Value::of_nat(1));
        sink.define_local("here", Value::of_nat(2));
        let req = Value::variant("load", Value::variant("global", Value::of_str("mod")));
        assert_eq!(sink.handle(&req), Some(Value::of_nat(1)));
        let req = Value::variant("load", Value::variant("local", Value::of_str("here")));
        assert_eq!(sink.handle(&req), Some(Value::of_nat(2)));
        let req = Value::variant("load", Value::variant("global", Value::of_str("nope")));
        assert_eq!(sink.handle(&req), None);
    }

    #[test]
    fn test_load_dict() {
        let mut sink = HostSink::new();
        let dict = record::put("word", Value::of_nat(9), &Value::unit());
        sink.set_dict(dict.clone());
        let req = Value::variant("load", Value::symbol("dict"));
        assert_eq!(sink.handle(&req), Some(dict));
        let req = Value::variant("load", Value::variant("dict", Value::of_str("word")));
        assert_eq!(sink.handle(&req), Some(Value::of_nat(9)));
        let req = Value::variant("load", Value::variant("dict", Value::of_str("missing")));
        assert_eq!(sink.handle(&req), None);
    }

    #[test]
    fn test_unknown_requests_denied() {
        let mut sink = HostSink::new();
        assert_eq!(sink.handle(&Value::symbol("quit")), None);
        assert_eq!(sink.handle(&Value::of_nat(3)), None);
    }
}
