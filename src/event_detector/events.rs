//! 事件记录与文本格式

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    VideoStartInitializing,
    VideoEndInitializing,
    StartPlaying,
    ConnectionInterruption,
    VideoResumed,
    FullScreenToggled,
    UrlChanged,
    VideoLost,
    VideoCameBack,
}

impl EventKind {
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::VideoStartInitializing => "Video started to initialize",
            EventKind::VideoEndInitializing => "Video ended initializing",
            EventKind::StartPlaying => "Video started playing",
            EventKind::ConnectionInterruption => "Video connection interruption",
            EventKind::VideoResumed => "Video resumed",
            EventKind::FullScreenToggled => "Full screen toggled",
            EventKind::UrlChanged => "URL changed",
            EventKind::VideoLost => "Scroll bar changed",
            EventKind::VideoCameBack => "Video came back to place",
        }
    }
}

/// 已确认事件，每次确认只产生一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub event_id: u64,
    pub kind: EventKind,
    pub timestamp_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

impl EventRecord {
    pub fn title(&self) -> String {
        match self.value {
            Some(true) => format!("{} to True", self.kind.title()),
            Some(false) => format!("{} to False", self.kind.title()),
            None => self.kind.title().to_string(),
        }
    }

    /// `event_id;event_title;timestamp_ms;formatted_duration`
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{}",
            self.event_id,
            self.title(),
            self.timestamp_ms,
            format_duration(self.timestamp_ms)
        )
    }
}

/// `<H>h <M>min <S>s`，为零的时、分省略，秒保留两位小数
pub fn format_duration(timestamp_ms: u64) -> String {
    let hours = timestamp_ms / 3_600_000;
    let minutes = (timestamp_ms % 3_600_000) / 60_000;
    let seconds = (timestamp_ms % 60_000) as f64 / 1000.0;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h ", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}min ", minutes));
    }
    out.push_str(&format_seconds(seconds));
    out.push('s');
    out
}

/// 两位小数，去掉多余的尾随零但至少保留一位
fn format_seconds(seconds: f64) -> String {
    let mut s = format!("{:.2}", seconds);
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0.0s");
        assert_eq!(format_duration(1_500), "1.5s");
        assert_eq!(format_duration(12_346), "12.35s");
        assert_eq!(format_duration(61_000), "1min 1.0s");
        assert_eq!(format_duration(3_600_000), "1h 0min 0.0s");
        assert_eq!(format_duration(3_723_040), "1h 2min 3.04s");
    }

    #[test]
    fn test_event_line() {
        let event = EventRecord {
            event_id: 3,
            kind: EventKind::ConnectionInterruption,
            timestamp_ms: 65_250,
            value: None,
        };
        assert_eq!(
            event.to_line(),
            "3;Video connection interruption;65250;1min 5.25s"
        );
    }

    #[test]
    fn test_fullscreen_title_carries_value() {
        let event = EventRecord {
            event_id: 7,
            kind: EventKind::FullScreenToggled,
            timestamp_ms: 100,
            value: Some(true),
        };
        assert_eq!(event.title(), "Full screen toggled to True");

        let back = EventRecord {
            value: Some(false),
            ..event
        };
        assert_eq!(back.to_line(), "7;Full screen toggled to False;100;0.1s");
    }

    #[test]
    fn test_json_shape() {
        let event = EventRecord {
            event_id: 1,
            kind: EventKind::VideoStartInitializing,
            timestamp_ms: 33,
            value: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event_id":1,"kind":"VIDEO_START_INITIALIZING","timestamp_ms":33}"#
        );
    }
}
