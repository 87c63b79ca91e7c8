//! The posture warning surface.
//!
//! At most one alert is visible at a time. A new alert while one is showing
//! is suppressed. An unattended alert closes itself after the auto-dismiss
//! delay.

use super::observer::AlertEvent;
use crate::core::classifier::PostureIssue;
use crate::core::clock::span_ms;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct AlertSurface {
    auto_dismiss: Duration,
    visible: Option<AlertEvent>,
    next_id: u64,
}

impl AlertSurface {
    pub fn new(auto_dismiss: std::time::Duration) -> Self {
        Self {
            auto_dismiss: span_ms(u64::try_from(auto_dismiss.as_millis()).unwrap_or(u64::MAX)),
            visible: None,
            next_id: 1,
        }
    }

    /// Open an alert unless one is already visible.
    pub fn show(&mut self, issues: &[PostureIssue], now: DateTime<Utc>) -> Option<AlertEvent> {
        if self.visible.is_some() {
            return None;
        }
        let alert = AlertEvent {
            id: self.next_id,
            shown_at: now,
            expires_at: now + self.auto_dismiss,
            issues: issues.to_vec(),
        };
        self.next_id += 1;
        self.visible = Some(alert.clone());
        Some(alert)
    }

    /// Close the visible alert if its time is up.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Option<AlertEvent> {
        match &self.visible {
            Some(alert) if now >= alert.expires_at => self.visible.take(),
            _ => None,
        }
    }

    /// Close the visible alert.
    pub fn dismiss(&mut self) -> Option<AlertEvent> {
        self.visible.take()
    }

    pub fn current(&self) -> Option<&AlertEvent> {
        self.visible.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.is_some()
    }
}
