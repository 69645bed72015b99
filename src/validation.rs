use std::collections::HashSet;

use serde::Serialize;

use crate::plan::{PLAN_VERSION, StagePlan};

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

pub fn validate_plan(plan: &StagePlan) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.version != PLAN_VERSION {
        report
            .errors
            .push(format!("Unsupported stage plan version: {}", plan.version));
    }

    if plan.library.trim().is_empty() {
        report.errors.push("Library name cannot be empty".into());
    } else if plan.library.contains('/') || plan.library.contains('\\') {
        report.errors.push(format!(
            "Library name '{}' must not contain path separators",
            plan.library
        ));
    }

    if plan.toolchain.trim().is_empty() {
        report.errors.push("Toolchain command cannot be empty".into());
    }

    if plan.destination.trim().is_empty() {
        report
            .errors
            .push("Destination directory cannot be empty".into());
    }

    if plan.targets.is_empty() {
        report.errors.push("At least one target is required".into());
    }

    report.merge(validate_targets(plan));
    report
}

fn validate_targets(plan: &StagePlan) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();

    for (idx, target) in plan.targets.iter().enumerate() {
        let name = target.as_str();
        if name.trim().is_empty() {
            report
                .errors
                .push(format!("Target {} is empty", idx + 1));
            continue;
        }
        if name.chars().any(char::is_whitespace) || name.contains('/') || name.contains('\\') {
            report.errors.push(format!(
                "Target {} ('{}') must not contain whitespace or path separators",
                idx + 1,
                name
            ));
            continue;
        }
        if name.split('-').count() < 3 {
            report.warnings.push(format!(
                "Target {} ('{}') does not look like an arch-vendor-os triple",
                idx + 1,
                name
            ));
        }
        if !seen.insert(name) {
            report.warnings.push(format!(
                "Target '{}' is listed more than once and will be staged repeatedly",
                name
            ));
        }
    }

    report
}
