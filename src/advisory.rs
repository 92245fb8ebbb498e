//! # Advisory rules
//! Decision table mapping `(tier, raw scores)` to a UI status and recommendation text.
//!
//! Each tier has a base message plus an ordered list of branches; the first branch
//! whose guard holds contributes its message, and the last branch of every tier is
//! unconditional, so evaluation is total. Thresholds are compile-time constants.

use serde::{Deserialize, Serialize};

use crate::scores::RawScores;
use crate::tier::TierLabel;

pub const HIGH_TASK_MIN: f64 = 80.0;
pub const MODERATE_TASK_MIN: f64 = 70.0;
pub const MODERATE_EXAM_MIN: f64 = 70.0;
pub const LOW_TASK_WEAK: f64 = 60.0;
pub const LOW_EXAM_APTITUDE: f64 = 60.0;
pub const LOW_EXAM_STRUGGLE: f64 = 55.0;
pub const LOW_TASK_DILIGENT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusUi {
    Safe,
    Monitor,
    Guidance,
}

/// Identifies which branch of the table fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    HighTaskDiscipline,
    HighEnrichment,
    ModerateTaskDiligence,
    ModerateExamComprehension,
    ModerateIncreaseFocus,
    LowCapableUndisciplined,
    LowExamStruggle,
    LowRemedial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub status_ui: StatusUi,
    pub rule: RuleId,
    pub recommendations: Vec<String>,
    /// Recommendations joined with single spaces.
    pub text: String,
}

struct Branch {
    rule: RuleId,
    when: fn(&RawScores) -> bool,
    message: &'static str,
}

struct TierRules {
    status: StatusUi,
    base: &'static str,
    branches: &'static [Branch],
}

fn always(_: &RawScores) -> bool {
    true
}

const HIGH: TierRules = TierRules {
    status: StatusUi::Safe,
    base: "Excellent performance: results are strong across assignments and exams.",
    branches: &[
        Branch {
            rule: RuleId::HighTaskDiscipline,
            when: |s| s.task_average < HIGH_TASK_MIN,
            message: "The one gap is assignment discipline; keep task submissions complete and on time.",
        },
        Branch {
            rule: RuleId::HighEnrichment,
            when: always,
            message: "Consider enrichment programs or academic competitions to keep growing.",
        },
    ],
};

const MODERATE: TierRules = TierRules {
    status: StatusUi::Monitor,
    base: "Performance is adequate but not yet consistent.",
    branches: &[
        Branch {
            rule: RuleId::ModerateTaskDiligence,
            when: |s| s.task_average < MODERATE_TASK_MIN,
            message: "Task diligence is low; submitting assignments regularly will lift the overall result.",
        },
        Branch {
            rule: RuleId::ModerateExamComprehension,
            when: |s| s.midterm < MODERATE_EXAM_MIN || s.final_exam < MODERATE_EXAM_MIN,
            message: "Exam comprehension is weak; join a study group and review the material before exams.",
        },
        Branch {
            rule: RuleId::ModerateIncreaseFocus,
            when: always,
            message: "Increase focus during class to move up to the high tier.",
        },
    ],
};

const LOW: TierRules = TierRules {
    status: StatusUi::Guidance,
    base: "Immediate intervention is needed.",
    branches: &[
        Branch {
            rule: RuleId::LowCapableUndisciplined,
            when: |s| {
                s.task_average < LOW_TASK_WEAK
                    && (s.midterm > LOW_EXAM_APTITUDE || s.final_exam > LOW_EXAM_APTITUDE)
            },
            message: "Capable but undisciplined: exam results show good aptitude, but poor task completion is holding results back.",
        },
        Branch {
            rule: RuleId::LowExamStruggle,
            when: |s| {
                (s.midterm < LOW_EXAM_STRUGGLE || s.final_exam < LOW_EXAM_STRUGGLE)
                    && s.task_average > LOW_TASK_DILIGENT
            },
            message: "Diligent but struggles under exam conditions; intensive tutoring is recommended.",
        },
        Branch {
            rule: RuleId::LowRemedial,
            when: always,
            message: "Mandatory counseling and comprehensive remedial sessions are recommended.",
        },
    ],
};

fn rules_for(tier: TierLabel) -> &'static TierRules {
    match tier {
        TierLabel::High => &HIGH,
        TierLabel::Moderate => &MODERATE,
        TierLabel::Low => &LOW,
    }
}

/// Pure function of `(tier, scores)`.
pub fn evaluate(tier: TierLabel, scores: &RawScores) -> Advisory {
    let table = rules_for(tier);
    // every table ends with an unconditional branch
    let branch = table
        .branches
        .iter()
        .find(|b| (b.when)(scores))
        .unwrap_or(&table.branches[table.branches.len() - 1]);

    let recommendations = vec![table.base.to_string(), branch.message.to_string()];
    let text = recommendations.join(" ");
    Advisory {
        status_ui: table.status,
        rule: branch.rule,
        recommendations,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(tier: TierLabel, t: f64, m: f64, f: f64) -> Advisory {
        evaluate(tier, &RawScores::new(t, m, f))
    }

    #[test]
    fn high_with_strong_tasks_suggests_enrichment() {
        let a = eval(TierLabel::High, 85.0, 90.0, 88.0);
        assert_eq!(a.status_ui, StatusUi::Safe);
        assert_eq!(a.rule, RuleId::HighEnrichment);
        assert!(a.text.contains("enrichment"));
        assert!(!a.text.contains("discipline"));
    }

    #[test]
    fn high_with_weak_tasks_flags_discipline() {
        let a = eval(TierLabel::High, 79.9, 95.0, 95.0);
        assert_eq!(a.rule, RuleId::HighTaskDiscipline);
        assert!(a.text.contains("discipline"));
    }

    #[test]
    fn moderate_branches() {
        assert_eq!(
            eval(TierLabel::Moderate, 75.0, 72.0, 74.0).rule,
            RuleId::ModerateIncreaseFocus
        );
        assert_eq!(
            eval(TierLabel::Moderate, 65.0, 50.0, 50.0).rule,
            RuleId::ModerateTaskDiligence
        );
        assert_eq!(
            eval(TierLabel::Moderate, 75.0, 72.0, 69.0).rule,
            RuleId::ModerateExamComprehension
        );
        // thresholds are strict: exactly 70 is not "below"
        assert_eq!(
            eval(TierLabel::Moderate, 70.0, 70.0, 70.0).rule,
            RuleId::ModerateIncreaseFocus
        );
        assert_eq!(
            eval(TierLabel::Moderate, 75.0, 72.0, 74.0).status_ui,
            StatusUi::Monitor
        );
    }

    #[test]
    fn low_branches() {
        let a = eval(TierLabel::Low, 55.0, 65.0, 68.0);
        assert_eq!(a.status_ui, StatusUi::Guidance);
        assert_eq!(a.rule, RuleId::LowCapableUndisciplined);
        assert!(a.text.contains("Capable but undisciplined"));

        let b = eval(TierLabel::Low, 75.0, 50.0, 53.0);
        assert_eq!(b.rule, RuleId::LowExamStruggle);
        assert!(b.text.contains("struggles under exam conditions"));

        let c = eval(TierLabel::Low, 50.0, 50.0, 50.0);
        assert_eq!(c.rule, RuleId::LowRemedial);

        // 60 is not "above 60"
        assert_eq!(
            eval(TierLabel::Low, 55.0, 60.0, 60.0).rule,
            RuleId::LowRemedial
        );
    }

    #[test]
    fn text_is_space_joined_recommendations() {
        let a = eval(TierLabel::Low, 75.0, 50.0, 53.0);
        assert_eq!(a.recommendations.len(), 2);
        assert_eq!(a.text, a.recommendations.join(" "));
        assert!(a.text.starts_with("Immediate intervention"));
    }

    #[test]
    fn evaluation_is_deterministic_and_total() {
        for tier in TierLabel::ALL {
            for t in [0.0, 54.9, 60.0, 70.0, 80.0, 100.0] {
                for e in [0.0, 54.0, 61.0, 70.0, 100.0] {
                    let a = eval(tier, t, e, 100.0 - e);
                    let b = eval(tier, t, e, 100.0 - e);
                    assert_eq!(a, b);
                    assert!(!a.text.is_empty());
                }
            }
        }
    }
}
