//! The rule catalog itself: category/severity taxonomy, the `Finding`
//! product type, and the `Rule` shape every policy/security check is
//! expressed as (§3 Data Model "Finding", §4.2 Rule set).

use crate::gateway::parser::Resource;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Policy,
    Security,
    Compliance,
    Impact,
}

/// Ordered critical→info so `Severity` sorts ascending in severity rank,
/// matching the display ordering in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// One instance of a rule firing on a resource (§GLOSSARY "Finding").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub resource_type: String,
    pub resource_name: String,
    pub line: usize,
    pub message: String,
    pub remediation: Option<&'static str>,
}

impl Finding {
    /// Total ordering for display: category, then severity (critical→info),
    /// then resource type, then rule id (§3 "Ordering").
    fn sort_key(&self) -> (Category, Severity, &str, &str) {
        (self.category, self.severity, self.resource_type.as_str(), self.rule_id)
    }
}

impl PartialEq for Finding {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for Finding {}
impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Finding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A declarative check. `eval` is a plain function pointer, not a trait
/// object or closure — the catalog is data, and evaluation is a fold over
/// it (§4.2 "every rule is declarative data").
///
/// Property rules return at most one message; pattern rules (scanning
/// `raw_block`) may return many.
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub applies_to: &'static [&'static str],
    pub remediation: &'static str,
    pub eval: fn(&Resource) -> Vec<String>,
}

impl Rule {
    fn applies(&self, resource: &Resource) -> bool {
        self.applies_to.contains(&"*")
            || self.applies_to.iter().any(|t| *t == resource.resource_type)
    }

    fn evaluate(&self, resource: &Resource) -> Vec<Finding> {
        if !self.applies(resource) {
            return Vec::new();
        }
        (self.eval)(resource)
            .into_iter()
            .map(|message| Finding {
                rule_id: self.id,
                category: self.category,
                severity: self.severity,
                resource_type: resource.resource_type.clone(),
                resource_name: resource.name.clone(),
                line: resource.line,
                message,
                remediation: Some(self.remediation),
            })
            .collect()
    }
}

/// A compliance control is a projection over findings already produced by
/// the policy/security rules it references, not an independent scan
/// (§4.2 "compliance reporting is a projection over the existing finding
/// set").
pub struct ComplianceControl {
    pub id: &'static str,
    pub title: &'static str,
    pub references: &'static [&'static str],
}

/// The immutable catalog: policy + security rules, plus compliance
/// controls projected over their output. Built once via [`RuleCatalog::standard`]
/// and never mutated afterward.
pub struct RuleCatalog {
    pub rules: Vec<Rule>,
    pub controls: Vec<ComplianceControl>,
}

impl RuleCatalog {
    pub fn standard() -> Self {
        let mut rules = Vec::new();
        rules.extend(super::policy::rules());
        rules.extend(super::security::rules());
        Self {
            rules,
            controls: super::compliance::controls(),
        }
    }

    /// Evaluate every policy/security rule against every resource, in
    /// deterministic order: by category, then by rule id within category
    /// (§4.2 "Rules are evaluated in deterministic order").
    pub fn evaluate(&self, resources: &[Resource]) -> Vec<Finding> {
        let mut ordered: Vec<&Rule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| (r.category, r.id));

        let mut findings = Vec::new();
        for rule in ordered {
            for resource in resources {
                findings.extend(rule.evaluate(resource));
            }
        }
        findings
    }

    /// Project compliance findings from an already-computed finding set.
    pub fn evaluate_compliance(&self, findings: &[Finding]) -> Vec<Finding> {
        let mut out = Vec::new();
        for control in &self.controls {
            let violations: Vec<&Finding> = findings
                .iter()
                .filter(|f| control.references.contains(&f.rule_id))
                .collect();
            if violations.is_empty() {
                continue;
            }
            for v in violations {
                out.push(Finding {
                    rule_id: control.id,
                    category: Category::Compliance,
                    severity: v.severity,
                    resource_type: v.resource_type.clone(),
                    resource_name: v.resource_name.clone(),
                    line: v.line,
                    message: format!("{} ({})", control.title, v.message),
                    remediation: v.remediation,
                });
            }
        }
        out
    }

    /// Evaluate policy, security, and compliance for a resource set and
    /// return them in the display ordering (§3 "Ordering").
    pub fn evaluate_all(&self, resources: &[Resource]) -> Vec<Finding> {
        let base = self.evaluate(resources);
        let compliance = self.evaluate_compliance(&base);
        let mut all = base;
        all.extend(compliance);
        all.sort();
        all
    }
}
