//! Registry trace events.
//!
//! Every allocation, creation, fetch, and release of a reference is reported
//! as a [`TraceEvent`]. Its `Display` form is a single line:
//!
//! ```text
//! ALLOC <type>
//! CREAT <type> <key> IN <backend>
//! FETCH <type> <key> FROM <backend>
//! CLEAR <type> <key>
//! ```
//!
//! Events go to `tracing` (target `stow::trace`, level `DEBUG`) and to an
//! optional [`TraceSink`]. Emission is on by default in debug builds only.

use std::fmt;
use std::sync::Arc;

/// A single registry or reference lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// A per-type table was allocated.
    Alloc { type_name: String },
    /// A new reference was constructed and read through.
    Create {
        type_name: String,
        key: String,
        backend: String,
    },
    /// A live reference was returned from the registry.
    Fetch {
        type_name: String,
        key: String,
        backend: String,
    },
    /// The last strong handle to a reference was dropped.
    Clear { type_name: String, key: String },
    /// A cleanup sweep started over `tables` per-type tables.
    CleanStart { tables: usize },
    /// A cleanup sweep finished with `tables` remaining.
    CleanAfter { tables: usize },
    /// A conversion, decode, or storage failure.
    Failure {
        type_name: String,
        key: String,
        reason: String,
    },
}

impl TraceEvent {
    /// The leading tag of the rendered line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Alloc { .. } => "ALLOC",
            Self::Create { .. } => "CREAT",
            Self::Fetch { .. } => "FETCH",
            Self::Clear { .. } => "CLEAR",
            Self::CleanStart { .. } => "CLEAN START",
            Self::CleanAfter { .. } => "CLEAN AFTER",
            Self::Failure { .. } => "FAIL",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        match self {
            Self::Alloc { type_name } => write!(f, "{tag} {type_name}"),
            Self::Create {
                type_name,
                key,
                backend,
            } => write!(f, "{tag} {type_name} {key} IN {backend}"),
            Self::Fetch {
                type_name,
                key,
                backend,
            } => write!(f, "{tag} {type_name} {key} FROM {backend}"),
            Self::Clear { type_name, key } => write!(f, "{tag} {type_name} {key}"),
            Self::CleanStart { tables } | Self::CleanAfter { tables } => {
                write!(f, "{tag} {tables}")
            }
            Self::Failure {
                type_name,
                key,
                reason,
            } => write!(f, "{tag} {type_name} {key} {reason}"),
        }
    }
}

/// Receiver for trace events, in addition to `tracing`.
pub type TraceSink = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

/// Emits trace events when enabled. Cheap to clone.
#[derive(Clone, Default)]
pub struct Tracer {
    enabled: bool,
    sink: Option<TraceSink>,
}

impl Tracer {
    /// Create a tracer. A disabled tracer drops every event.
    pub fn new(enabled: bool, sink: Option<TraceSink>) -> Self {
        Self { enabled, sink }
    }

    /// A tracer that never emits.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether events are emitted at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event. The event is only built when tracing is enabled.
    pub fn emit(&self, event: impl FnOnce() -> TraceEvent) {
        if !self.enabled {
            return;
        }
        let event = event();
        tracing::debug!(target: "stow::trace", tag = event.tag(), "{event}");
        if let Some(sink) = &self.sink {
            sink(&event);
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.enabled)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Strip module paths from a `std::any::type_name` string.
///
/// `stow_core::reference::StorageRef<stow_defaults::Preferences, alloc::string::String>`
/// becomes `StorageRef<Preferences, String>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
            continue;
        }
        push_last_segment(&mut out, &segment);
        segment.clear();
        out.push(ch);
    }
    push_last_segment(&mut out, &segment);
    out
}

fn push_last_segment(out: &mut String, segment: &str) {
    if let Some(last) = segment.rsplit("::").next() {
        out.push_str(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn display_matches_line_format() {
        let create = TraceEvent::Create {
            type_name: "StorageRef<Preferences, String>".into(),
            key: "catSound".into(),
            backend: "Preferences(standard)".into(),
        };
        assert_eq!(
            create.to_string(),
            "CREAT StorageRef<Preferences, String> catSound IN Preferences(standard)"
        );

        let fetch = TraceEvent::Fetch {
            type_name: "T".into(),
            key: "k".into(),
            backend: "B".into(),
        };
        assert_eq!(fetch.to_string(), "FETCH T k FROM B");

        let alloc = TraceEvent::Alloc {
            type_name: "T".into(),
        };
        assert_eq!(alloc.to_string(), "ALLOC T");

        let clear = TraceEvent::Clear {
            type_name: "T".into(),
            key: "k".into(),
        };
        assert_eq!(clear.to_string(), "CLEAR T k");

        assert_eq!(TraceEvent::CleanStart { tables: 10 }.to_string(), "CLEAN START 10");
    }

    #[test]
    fn short_type_name_strips_paths() {
        let full = "stow_core::reference::StorageRef<stow_defaults::Preferences, alloc::string::String>";
        assert_eq!(short_type_name(full), "StorageRef<Preferences, String>");
        assert_eq!(short_type_name("u32"), "u32");
        assert_eq!(
            short_type_name("alloc::vec::Vec<(i32, &str)>"),
            "Vec<(i32, &str)>"
        );
    }

    #[test]
    fn disabled_tracer_never_builds_events() {
        let tracer = Tracer::disabled();
        tracer.emit(|| panic!("event must not be built"));
    }

    #[test]
    fn enabled_tracer_forwards_to_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let tracer = Tracer::new(
            true,
            Some(Arc::new(move |e: &TraceEvent| {
                captured.lock().unwrap().push(e.to_string())
            })),
        );
        tracer.emit(|| TraceEvent::Alloc {
            type_name: "X".into(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["ALLOC X".to_string()]);
    }
}
