use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::event_detector::events::EventRecord;

/// 已确认事件的落地方式
pub trait EventSink {
    fn record(&mut self, event: &EventRecord) -> std::io::Result<()>;

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// `id;title;timestamp_ms;duration` 每行一条
pub struct TextEventSink<W: Write> {
    writer: W,
}

impl<W: Write> TextEventSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl TextEventSink<BufWriter<File>> {
    pub const FILE_NAME: &'static str = "events.txt";

    pub fn create_in(dir: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(dir.join(Self::FILE_NAME))?)))
    }
}

impl<W: Write> EventSink for TextEventSink<W> {
    fn record(&mut self, event: &EventRecord) -> std::io::Result<()> {
        writeln!(self.writer, "{}", event.to_line())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// JSON Lines
pub struct JsonEventSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonEventSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonEventSink<BufWriter<File>> {
    pub const FILE_NAME: &'static str = "events.jsonl";

    pub fn create_in(dir: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(dir.join(Self::FILE_NAME))?)))
    }
}

impl<W: Write> EventSink for JsonEventSink<W> {
    fn record(&mut self, event: &EventRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// 收集到内存，测试和库调用方使用
impl EventSink for Vec<EventRecord> {
    fn record(&mut self, event: &EventRecord) -> std::io::Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detector::events::EventKind;

    fn sample() -> Vec<EventRecord> {
        vec![
            EventRecord {
                event_id: 1,
                kind: EventKind::VideoStartInitializing,
                timestamp_ms: 0,
                value: None,
            },
            EventRecord {
                event_id: 2,
                kind: EventKind::FullScreenToggled,
                timestamp_ms: 61_500,
                value: Some(true),
            },
        ]
    }

    #[test]
    fn test_text_sink_lines() {
        let mut sink = TextEventSink::new(Vec::new());
        for event in sample() {
            sink.record(&event).unwrap();
        }
        let text = String::from_utf8(sink.into_inner()).unwrap();

        assert_eq!(
            text,
            "1;Video started to initialize;0;0.0s\n2;Full screen toggled to True;61500;1min 1.5s\n"
        );
    }

    #[test]
    fn test_json_sink_lines() {
        let mut sink = JsonEventSink::new(Vec::new());
        for event in sample() {
            sink.record(&event).unwrap();
        }
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["kind"], "FULL_SCREEN_TOGGLED");
        assert_eq!(lines[1]["value"], true);
        assert!(lines[0].get("value").is_none());
    }

    #[test]
    fn test_file_sink_created_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = TextEventSink::create_in(dir.path()).unwrap();
        sink.record(&sample()[0]).unwrap();
        sink.flush().unwrap();

        let text = std::fs::read_to_string(dir.path().join("events.txt")).unwrap();
        assert!(text.starts_with("1;"));
    }
}
