//! Host notification sink.
//! The coordinator never notifies anyone itself; callers pass finished outcomes here.

use crate::coordinator::OperationOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Info,
    Warning,
    Error,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Level and message for a finished operation.
pub fn describe(action: &str, outcome: &OperationOutcome) -> (NotifyLevel, String) {
    if outcome.success {
        let level = if outcome.has_partial_items() {
            NotifyLevel::Warning
        } else {
            NotifyLevel::Success
        };
        let detail = outcome
            .message
            .clone()
            .or_else(|| outcome.target.as_ref().map(|t| format!("-> {t}")))
            .unwrap_or_else(|| "done".into());
        return (level, format!("{action}: {detail}"));
    }

    let reason = outcome.error.as_deref().unwrap_or("failed");
    if outcome.is_user_directed() {
        (NotifyLevel::Info, reason.to_string())
    } else {
        (NotifyLevel::Error, format!("{action}: {reason}"))
    }
}

pub fn report(sink: &dyn NotificationSink, action: &str, outcome: &OperationOutcome) {
    let (level, message) = describe(action, outcome);
    sink.notify(level, &message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CourierError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(NotifyLevel, String)>>);

    impl NotificationSink for Recorder {
        fn notify(&self, level: NotifyLevel, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn levels_follow_outcome() {
        let sink = Recorder::default();
        report(&sink, "copy", &OperationOutcome::completed(None, Some("/w/b.json".into())));
        report(
            &sink,
            "copy",
            &OperationOutcome::from_error(&CourierError::UserCancelled {
                operation: "copy_file".into(),
            }),
        );
        report(
            &sink,
            "copy",
            &OperationOutcome::from_error(&CourierError::PathStale {
                path: "/w/a.json".into(),
            }),
        );
        let seen = sink.0.lock().unwrap();
        assert_eq!(seen[0], (NotifyLevel::Success, "copy: -> /w/b.json".to_string()));
        assert_eq!(seen[1], (NotifyLevel::Info, "copy_file cancelled by user".to_string()));
        assert_eq!(seen[2].0, NotifyLevel::Error);
    }
}
