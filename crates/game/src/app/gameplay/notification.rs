use sage_engine::{Countdown, Frame};

pub(crate) const NOTIFICATION_PANEL: &str = "notifications";
pub(crate) const TOAST_SECONDS: f32 = 2.0;

#[derive(Debug)]
struct Toast {
    text: String,
    ttl: Countdown,
}

/// Short-lived messages stacked in the corner. They never take the modal gate.
#[derive(Debug, Default)]
pub(crate) struct NotificationQueue {
    toasts: Vec<Toast>,
}

impl NotificationQueue {
    pub(crate) fn push(&mut self, text: impl Into<String>, seconds: f32) {
        self.toasts.push(Toast {
            text: text.into(),
            ttl: Countdown::new(seconds),
        });
    }

    pub(crate) fn tick(&mut self, dt_seconds: f32) {
        for toast in &mut self.toasts {
            toast.ttl.tick(dt_seconds);
        }
        self.toasts.retain(|toast| !toast.ttl.is_done());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.toasts.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub(crate) fn texts(&self) -> impl Iterator<Item = &str> {
        self.toasts.iter().map(|toast| toast.text.as_str())
    }

    pub(crate) fn render(&self, frame: &mut Frame) {
        if self.toasts.is_empty() {
            return;
        }
        frame.panel(
            NOTIFICATION_PANEL,
            self.texts().map(str::to_string).collect(),
        );
    }
}
