//! Configuration: `OTTER_*` environment variables read
//! once at `tool_setup`, mirroring the `getenv` calls in `otter.c`'s
//! `tool_setup`.

use crate::domain::OtterError;

#[derive(Debug, Clone)]
pub struct Config {
    pub trace_output_path: String,
    pub trace_output_name: String,
    pub task_graph_output: Option<String>,
    pub task_graph_format: TaskGraphFormat,
    pub task_graph_nodeattr: Option<String>,
    pub append_hostname: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskGraphFormat {
    Dot,
}

impl TaskGraphFormat {
    fn parse(value: &str) -> Result<Self, OtterError> {
        match value.to_ascii_lowercase().as_str() {
            "dot" => Ok(TaskGraphFormat::Dot),
            other => Err(OtterError::InvalidConfig {
                key: "OTTER_TASK_GRAPH_FORMAT",
                reason: format!("unsupported format {other:?}, expected \"dot\""),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, OtterError> {
        Self::from_getter(|key| std::env::var(key).ok())
    }

    /// Testable without touching real process environment.
    fn from_getter(get: impl Fn(&str) -> Option<String>) -> Result<Self, OtterError> {
        let task_graph_format = match get("OTTER_TASK_GRAPH_FORMAT") {
            Some(v) => TaskGraphFormat::parse(&v)?,
            None => TaskGraphFormat::Dot,
        };

        Ok(Self {
            trace_output_path: get("OTTER_TRACE_OUTPUT_PATH").unwrap_or_else(|| ".".to_string()),
            trace_output_name: get("OTTER_TRACE_OUTPUT_NAME").unwrap_or_else(|| "otter".to_string()),
            task_graph_output: get("OTTER_TASK_GRAPH_OUTPUT"),
            task_graph_format,
            task_graph_nodeattr: get("OTTER_TASK_GRAPH_NODEATTR"),
            append_hostname: get("OTTER_APPEND_HOSTNAME").is_some(),
        })
    }

    /// Builds `<base>[.<hostname>].<pid>`.
    pub fn archive_name(&self, pid: u32) -> String {
        let hostname = if self.append_hostname {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .map(|h| format!(".{h}"))
                .unwrap_or_default()
        } else {
            String::new()
        };
        format!("{}{hostname}.{pid}", self.trace_output_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn getter(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply_when_env_is_absent() {
        let cfg = Config::from_getter(getter(HashMap::new())).unwrap();
        assert_eq!(cfg.trace_output_path, ".");
        assert_eq!(cfg.trace_output_name, "otter");
        assert_eq!(cfg.task_graph_format, TaskGraphFormat::Dot);
        assert!(cfg.task_graph_output.is_none());
        assert!(!cfg.append_hostname);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut map = HashMap::new();
        map.insert("OTTER_TRACE_OUTPUT_PATH", "/tmp/traces");
        map.insert("OTTER_TRACE_OUTPUT_NAME", "myrun");
        map.insert("OTTER_APPEND_HOSTNAME", "1");
        let cfg = Config::from_getter(getter(map)).unwrap();
        assert_eq!(cfg.trace_output_path, "/tmp/traces");
        assert_eq!(cfg.trace_output_name, "myrun");
        assert!(cfg.append_hostname);
    }

    #[test]
    fn unsupported_format_is_an_error() {
        let mut map = HashMap::new();
        map.insert("OTTER_TASK_GRAPH_FORMAT", "graphml");
        let err = Config::from_getter(getter(map)).unwrap_err();
        assert!(err.to_string().contains("OTTER_TASK_GRAPH_FORMAT"));
    }

    #[test]
    fn archive_name_without_hostname_is_base_dot_pid() {
        let cfg = Config::from_getter(getter(HashMap::new())).unwrap();
        assert_eq!(cfg.archive_name(4242), "otter.4242");
    }
}
