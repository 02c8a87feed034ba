use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Frame-level event kinds written to the JSON-lines log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEvent {
    Received,
    Malformed,
    Truncated,
    Abandoned,
    Reply,
}

#[derive(Serialize)]
struct FrameEntry<'a> {
    ts_ms: u64,
    event: FrameEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

/// One JSON object per line for every frame event. A sink of `None` makes
/// every call a no-op.
pub struct FrameTelemetry<W: Write = File> {
    sink: Option<W>,
}

impl FrameTelemetry<File> {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { sink: Some(file) })
    }
}

impl<W: Write> FrameTelemetry<W> {
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn to_writer(writer: W) -> Self {
        Self { sink: Some(writer) }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn record(
        &mut self,
        ts_ms: u64,
        event: FrameEvent,
        code: Option<i32>,
        detail: Option<&str>,
    ) -> io::Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let entry = FrameEntry {
            ts_ms,
            event,
            code,
            detail,
        };
        let line = serde_json::to_string(&entry).map_err(io::Error::other)?;
        writeln!(sink, "{line}")?;
        sink.flush()
    }

    pub fn into_inner(self) -> Option<W> {
        self.sink
    }

    /// Erase the writer type so any sink fits one controller field.
    pub fn boxed(self) -> FrameTelemetry<Box<dyn Write>>
    where
        W: 'static,
    {
        FrameTelemetry {
            sink: self.sink.map(|w| Box::new(w) as Box<dyn Write>),
        }
    }
}
