//! Posture classification from frame metrics.
//!
//! Rules are evaluated in a fixed order and issues are reported in that
//! order. A minor shoulder tilt on its own is tolerated; it is only reported
//! when the head or shoulders show another problem in the same frame.

use crate::config::Thresholds;
use crate::core::metrics::PostureMetrics;
use serde::{Deserialize, Serialize};

/// A specific posture problem found in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureIssue {
    SevereUnevenShoulders,
    MinorUnevenShoulders,
    ForwardHead,
    SlouchedShoulders,
    HeadPositionOffset,
}

impl PostureIssue {
    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            PostureIssue::SevereUnevenShoulders => "severely uneven shoulders",
            PostureIssue::MinorUnevenShoulders => "slightly uneven shoulders",
            PostureIssue::ForwardHead => "forward head posture",
            PostureIssue::SlouchedShoulders => "slouched shoulders",
            PostureIssue::HeadPositionOffset => "head position",
        }
    }

    /// What the user should do about it.
    pub fn remedy(self) -> Remedy {
        match self {
            PostureIssue::ForwardHead | PostureIssue::HeadPositionOffset => Remedy::AlignHead,
            PostureIssue::SlouchedShoulders => Remedy::SitUp,
            PostureIssue::SevereUnevenShoulders | PostureIssue::MinorUnevenShoulders => {
                Remedy::LevelShoulders
            }
        }
    }
}

impl std::fmt::Display for PostureIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Remediation advice, one per family of issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    AlignHead,
    SitUp,
    LevelShoulders,
}

impl Remedy {
    pub fn phrase(self) -> &'static str {
        match self {
            Remedy::AlignHead => "Pull your head back and align ears over shoulders.",
            Remedy::SitUp => "Sit up straight and pull shoulders back.",
            Remedy::LevelShoulders => "Level your shoulders.",
        }
    }
}

/// Message shown when no issues are present.
pub const GOOD_POSTURE_MESSAGE: &str = "Excellent! Your posture looks great.";

/// Result of classifying one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureClassification {
    pub is_good: bool,
    /// Issues in detection order, without duplicates
    pub issues: Vec<PostureIssue>,
}

impl PostureClassification {
    fn push(&mut self, issue: PostureIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    pub fn has(&self, issue: PostureIssue) -> bool {
        self.issues.contains(&issue)
    }

    /// Short status line.
    pub fn status_text(&self) -> &'static str {
        if self.is_good {
            "Good posture"
        } else {
            "Poor posture"
        }
    }

    /// Issue list followed by the remediation phrases that apply.
    pub fn summary(&self) -> String {
        if self.is_good {
            return GOOD_POSTURE_MESSAGE.to_string();
        }

        let labels: Vec<&str> = self.issues.iter().map(|i| i.label()).collect();
        let mut summary = format!("Posture issues detected: {}", labels.join(", "));

        let mut remedies: Vec<Remedy> = Vec::new();
        for remedy in self.issues.iter().map(|i| i.remedy()) {
            if !remedies.contains(&remedy) {
                remedies.push(remedy);
            }
        }
        // Head advice first, then slouch, then shoulder level.
        remedies.sort_by_key(|r| match r {
            Remedy::AlignHead => 0,
            Remedy::SitUp => 1,
            Remedy::LevelShoulders => 2,
        });
        summary.push('.');
        for remedy in remedies {
            summary.push(' ');
            summary.push_str(remedy.phrase());
        }
        summary
    }
}

/// Classify a frame's metrics against the thresholds.
pub fn classify(metrics: &PostureMetrics, thresholds: &Thresholds) -> PostureClassification {
    let mut result = PostureClassification::default();

    let head_forward = metrics.forward_head_ratio > thresholds.forward_head_ratio;
    let slouched = metrics.shoulder_slouch_ratio > thresholds.shoulder_slouch_ratio;

    if metrics.shoulder_angle_deg > thresholds.severe_shoulder_tilt_deg {
        result.push(PostureIssue::SevereUnevenShoulders);
    } else if metrics.shoulder_angle_deg > thresholds.good_shoulder_angle_deg
        && (head_forward || slouched)
    {
        result.push(PostureIssue::MinorUnevenShoulders);
    }

    if head_forward {
        result.push(PostureIssue::ForwardHead);
    }

    if slouched {
        result.push(PostureIssue::SlouchedShoulders);
    }

    // A large horizontal offset is the same problem as a forward head.
    if metrics.head_forward_distance.abs() > thresholds.head_forward_abs_distance
        && !result.has(PostureIssue::ForwardHead)
    {
        result.push(PostureIssue::HeadPositionOffset);
    }

    result.is_good = result.issues.is_empty();
    result
}
