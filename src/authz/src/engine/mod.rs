//! Embedded evaluation engine
//!
//! Answers authorization requests against the installed [`PolicyIr`] with a
//! fixed pipeline:
//!
//! ```text
//! input → tenant assert → cache lookup → deny phase → allow phase → decision
//!                              ↓                                       ↓
//!                          [Cache] ←───────────────────────────────────┘
//!                              ↓                                       ↓
//!                          [Metrics]                               [Trace]
//! ```
//!
//! Deny rules are evaluated first and only come from the document itself.
//! Allow rules merge document rules with permissions of the principal's
//! effective roles; the first allow rule (by priority, then id) whose
//! condition holds decides. No match denies by default.

pub mod cache;
pub mod index;
pub mod metrics;
pub mod trace;

pub use cache::{CacheConfig, CacheStats, CachedDecision, DecisionCache};
pub use index::{RuleIndex, ALL_SCOPES};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use trace::TraceCollector;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, trace as trace_log};

use acx_core::{
    assert_tenant, create_trace_id, normalize_fields, AcxError, AuthorizationEngine,
    AuthorizationInput, AuthorizationOptions, Capability, CapabilitySet, Clock, Decision,
    DecisionMeta, DecisionTrace, ExplainResult, Obligation, Reason, Result, SystemClock,
    TenancyMode, TraceEventType,
};

use crate::compiler::{CompiledRule, ConditionInput, PolicyIr};
use crate::policy::Effect;
use crate::roles::{build_role_rule_indexes, RoleGraph, RoleIndexes};
use trace::record;

pub const DEFAULT_ENGINE_NAME: &str = "acx-embedded";

pub const RULE_DENY: &str = "RULE_DENY";
pub const RULE_ALLOW: &str = "RULE_ALLOW";
pub const DEFAULT_DENY: &str = "DEFAULT_DENY";
pub const FIELD_VIOLATION: &str = "FIELD_VIOLATION";
pub const FIELD_OMIT: &str = "FIELD_OMIT";
pub const TRACE: &str = "TRACE";

/// Obligation type carrying the fields the caller must drop
pub const OMIT_FIELDS: &str = "omitFields";

/// What to do when requested fields are excluded by policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldViolation {
    /// Deny the whole request
    Deny,
    /// Allow and attach an `omitFields` obligation
    #[default]
    Omit,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: TenancyMode,
    pub field_violation: FieldViolation,
    pub cache: CacheConfig,
    pub engine_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: TenancyMode::SingleTenant,
            field_violation: FieldViolation::Omit,
            cache: CacheConfig::default(),
            engine_name: DEFAULT_ENGINE_NAME.to_string(),
        }
    }
}

/// One installed policy with every index built from it
struct PolicyGeneration {
    number: u64,
    ir: PolicyIr,
    allow: RuleIndex,
    deny: RuleIndex,
    role_graph: RoleGraph,
    role_indexes: RoleIndexes,
}

impl PolicyGeneration {
    fn build(number: u64, ir: PolicyIr) -> Self {
        let rules = ir.compiled_rules.clone();
        let allow = RuleIndex::build_filtered(rules.clone(), |r| r.effect == Effect::Allow);
        let deny = RuleIndex::build_filtered(rules, |r| r.effect == Effect::Deny);
        let role_graph = RoleGraph::from_roles(&ir.roles);
        let role_indexes = build_role_rule_indexes(&ir.roles);

        Self {
            number,
            ir,
            allow,
            deny,
            role_graph,
            role_indexes,
        }
    }
}

/// Result of the deny phase
#[derive(Default)]
struct DenyOutcome {
    decision: Option<CachedDecision>,
    denied_fields: BTreeSet<String>,
    obligations: Vec<Obligation>,
}

/// Rule-based authorization engine
pub struct EmbeddedEngine {
    config: EngineConfig,
    generation: RwLock<Option<Arc<PolicyGeneration>>>,
    generation_counter: AtomicU64,
    cache: Option<DecisionCache>,
    metrics: MetricsCollector,
    clock: Arc<dyn Clock>,
}

impl EmbeddedEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Engine reading time from `clock` (cache expiry, timestamps)
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| DecisionCache::new(config.cache.clone(), clock.clone()));

        info!(
            engine = %config.engine_name,
            mode = ?config.mode,
            field_violation = ?config.field_violation,
            cache = config.cache.enabled,
            "EmbeddedEngine initialized"
        );

        Self {
            config,
            generation: RwLock::new(None),
            generation_counter: AtomicU64::new(0),
            cache,
            metrics: MetricsCollector::new(),
            clock,
        }
    }

    /// Engine with `ir` already installed
    pub fn with_policy(config: EngineConfig, ir: PolicyIr) -> Self {
        let engine = Self::new(config);
        engine.set_policy(ir);
        engine
    }

    /// Install a new policy
    ///
    /// Indexes are built before the swap, so concurrent requests see either
    /// the old generation or the new one in full. The cache is cleared and
    /// entries computed under the old generation are never served.
    pub fn set_policy(&self, ir: PolicyIr) {
        let number = self.generation_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::new(PolicyGeneration::build(number, ir));

        info!(
            policy_version = %generation.ir.policy_version,
            policy_hash = %generation.ir.policy_hash,
            allow_rules = generation.allow.len(),
            deny_rules = generation.deny.len(),
            roles = generation.role_indexes.len(),
            generation = number,
            "Installed policy"
        );

        *self.generation.write() = Some(generation);

        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Version and hash of the installed policy
    pub fn policy_info(&self) -> Option<(String, String)> {
        self.generation
            .read()
            .as_ref()
            .map(|g| (g.ir.policy_version.clone(), g.ir.policy_hash.clone()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot()
    }

    /// `None` when caching is disabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(DecisionCache::stats)
    }

    pub fn export_prometheus(&self) -> String {
        self.metrics.export_prometheus()
    }

    fn current_generation(&self) -> Result<Arc<PolicyGeneration>> {
        self.generation
            .read()
            .clone()
            .ok_or_else(|| AcxError::engine("Policy IR is not set."))
    }

    fn evaluate(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
        capture: bool,
    ) -> Result<(Decision, Option<DecisionTrace>)> {
        match self.evaluate_inner(input, options, capture) {
            Ok((decision, trace)) => {
                self.metrics.record_decision(decision.allow);
                Ok((decision, trace))
            }
            Err(err) => {
                self.metrics.record_error();
                debug!(error = %err, code = %err.code(), "Authorization failed");
                Err(err)
            }
        }
    }

    fn evaluate_inner(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
        capture: bool,
    ) -> Result<(Decision, Option<DecisionTrace>)> {
        let generation = self.current_generation()?;

        let trace_id = options.trace_id.clone().unwrap_or_else(create_trace_id);
        let mut collector =
            capture.then(|| TraceCollector::new(trace_id.clone(), self.clock.clone()));

        let tenant_id = assert_tenant(input, self.config.mode.into())?;
        let fields = normalize_fields(&input.action.fields);

        let cache_key = match (&self.cache, capture) {
            (Some(_), false) => Some(DecisionCache::compute_key(
                input,
                tenant_id.as_deref(),
                &fields,
            )),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(cached) = cache.get(key, generation.number) {
                self.metrics.record_cache_hit();
                debug!(
                    principal = %input.principal.id,
                    action = %input.action.name,
                    resource_type = %input.resource.resource_type,
                    "Decision cache hit"
                );
                let meta = self.build_meta(&generation.ir, trace_id, tenant_id, options);
                return Ok((into_decision(cached, meta), None));
            }
            self.metrics.record_cache_miss();
        }

        self.metrics.record_evaluation();

        let effective_roles = generation
            .role_graph
            .resolve_effective_roles(&input.principal.roles);
        let condition_input = ConditionInput::from_request(input, &effective_roles)?;

        record(
            &mut collector,
            TraceEventType::Input,
            || "Authorization request received.".to_string(),
            || {
                Some(json!({
                    "action": input.action.name,
                    "resourceType": input.resource.resource_type,
                    "tenantId": tenant_id,
                }))
            },
        );
        record(
            &mut collector,
            TraceEventType::Policy,
            || format!("Evaluating policy {}.", generation.ir.policy_version),
            || {
                Some(json!({
                    "policyVersion": generation.ir.policy_version,
                    "policyHash": generation.ir.policy_hash,
                    "effectiveRoles": effective_roles,
                }))
            },
        );

        let deny = self.evaluate_denies(
            &generation,
            input,
            &condition_input,
            &fields,
            &mut collector,
        );
        let outcome = match deny.decision {
            Some(decision) => decision,
            None => self.evaluate_allows(
                &generation,
                input,
                &condition_input,
                &fields,
                &effective_roles,
                deny.denied_fields,
                deny.obligations,
                &mut collector,
            ),
        };

        debug!(
            principal = %input.principal.id,
            action = %input.action.name,
            resource_type = %input.resource.resource_type,
            allow = outcome.allow,
            "Evaluated authorization request"
        );

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.put(key, generation.number, outcome.clone());
        }

        let meta = self.build_meta(&generation.ir, trace_id, tenant_id, options);
        let mut decision = into_decision(outcome, meta);

        let trace = collector.as_ref().map(TraceCollector::to_trace);
        if let Some(trace) = &trace {
            let details = serde_json::to_value(trace)
                .map_err(|e| AcxError::engine(format!("Failed to encode trace: {}", e)))?;
            decision
                .reasons
                .push(Reason::new(TRACE, "Trace captured.").with_details(details));
        }

        Ok((decision, trace))
    }

    fn evaluate_denies(
        &self,
        generation: &PolicyGeneration,
        input: &AuthorizationInput,
        condition_input: &ConditionInput,
        fields: &[String],
        collector: &mut Option<TraceCollector>,
    ) -> DenyOutcome {
        let mut outcome = DenyOutcome::default();
        let candidates = generation.deny.lookup(
            &input.action.name,
            &input.resource.resource_type,
            &ALL_SCOPES,
        );

        record(
            collector,
            TraceEventType::Info,
            || "Evaluating deny rules.".to_string(),
            || Some(json!({ "phase": "deny", "candidates": candidates.len() })),
        );

        for rule in candidates {
            trace_log!(rule_id = %rule.id, "Considering deny rule");
            let holds = rule.predicate.holds(condition_input);
            record_rule(collector, "Deny", rule, holds);
            if !holds {
                continue;
            }

            if !rule.has_field_selectors() {
                outcome.obligations.extend(rule.obligations.iter().cloned());
                outcome.decision = Some(CachedDecision {
                    allow: false,
                    reasons: vec![rule_reason(
                        RULE_DENY,
                        format!("Denied by rule {}.", rule.id),
                        rule,
                        None,
                    )],
                    obligations: outcome.obligations.clone(),
                });
                return outcome;
            }

            // Field rules do not apply to requests without fields
            if fields.is_empty() {
                continue;
            }

            let excluded = rule.field_selectors.excluded_fields(fields);
            if excluded.is_empty() {
                continue;
            }

            if self.config.field_violation == FieldViolation::Deny {
                outcome.decision = Some(CachedDecision {
                    allow: false,
                    reasons: vec![rule_reason(
                        FIELD_VIOLATION,
                        format!("Denied due to field restrictions in rule {}.", rule.id),
                        rule,
                        Some(excluded.as_slice()),
                    )],
                    obligations: rule.obligations.clone(),
                });
                return outcome;
            }

            outcome.denied_fields.extend(excluded);
            outcome.obligations.extend(rule.obligations.iter().cloned());
        }

        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_allows(
        &self,
        generation: &PolicyGeneration,
        input: &AuthorizationInput,
        condition_input: &ConditionInput,
        fields: &[String],
        effective_roles: &[String],
        mut denied_fields: BTreeSet<String>,
        mut obligations: Vec<Obligation>,
        collector: &mut Option<TraceCollector>,
    ) -> CachedDecision {
        let action = input.action.name.as_str();
        let resource_type = input.resource.resource_type.as_str();

        let mut candidates = generation.allow.lookup(action, resource_type, &ALL_SCOPES);
        let role_candidates = generation
            .role_indexes
            .lookup(effective_roles, action, resource_type);
        if !role_candidates.is_empty() {
            candidates.extend(role_candidates);
            index::sort_candidates(&mut candidates);
        }

        record(
            collector,
            TraceEventType::Info,
            || "Evaluating allow rules.".to_string(),
            || Some(json!({ "phase": "allow", "candidates": candidates.len() })),
        );

        let matched = candidates.into_iter().find(|rule| {
            trace_log!(rule_id = %rule.id, "Considering allow rule");
            let holds = rule.predicate.holds(condition_input);
            record_rule(collector, "Allow", rule, holds);
            holds
        });

        let Some(rule) = matched else {
            record(
                collector,
                TraceEventType::Info,
                || "No allow rule matched.".to_string(),
                || None,
            );
            return CachedDecision {
                allow: false,
                reasons: vec![Reason::new(DEFAULT_DENY, "No allow rule matched.")],
                obligations: Vec::new(),
            };
        };

        obligations.extend(rule.obligations.iter().cloned());

        if !fields.is_empty() {
            denied_fields.extend(rule.field_selectors.excluded_fields(fields));
        }

        if denied_fields.is_empty() {
            return CachedDecision {
                allow: true,
                reasons: vec![rule_reason(
                    RULE_ALLOW,
                    format!("Allowed by rule {}.", rule.id),
                    rule,
                    None,
                )],
                obligations,
            };
        }

        let denied: Vec<String> = denied_fields.into_iter().collect();

        if self.config.field_violation == FieldViolation::Deny {
            return CachedDecision {
                allow: false,
                reasons: vec![rule_reason(
                    FIELD_VIOLATION,
                    "Denied due to field restrictions.".to_string(),
                    rule,
                    Some(denied.as_slice()),
                )],
                obligations,
            };
        }

        record(
            collector,
            TraceEventType::Obligation,
            || "Fields omitted due to policy restrictions.".to_string(),
            || Some(json!({ "fields": denied })),
        );

        obligations.push(
            Obligation::new(OMIT_FIELDS).with_payload(json!({ "fields": denied })),
        );

        CachedDecision {
            allow: true,
            reasons: vec![
                rule_reason(RULE_ALLOW, format!("Allowed by rule {}.", rule.id), rule, None),
                Reason::new(FIELD_OMIT, "Fields omitted due to policy restrictions.")
                    .with_details(json!({ "fields": denied })),
            ],
            obligations,
        }
    }

    fn build_meta(
        &self,
        ir: &PolicyIr,
        trace_id: String,
        tenant_id: Option<String>,
        options: &AuthorizationOptions,
    ) -> DecisionMeta {
        DecisionMeta {
            trace_id,
            engine: self.config.engine_name.clone(),
            policy_version: Some(
                options
                    .policy_version
                    .clone()
                    .unwrap_or_else(|| ir.policy_version.clone()),
            ),
            policy_hash: Some(
                options
                    .policy_hash
                    .clone()
                    .unwrap_or_else(|| ir.policy_hash.clone()),
            ),
            evaluated_at: self.clock.now(),
            tenant_id: options.tenant_id.clone().or(tenant_id),
            engine_parts: Vec::new(),
        }
    }
}

fn into_decision(cached: CachedDecision, meta: DecisionMeta) -> Decision {
    Decision {
        allow: cached.allow,
        reasons: cached.reasons,
        obligations: cached.obligations,
        meta,
    }
}

/// One trace event per candidate rule, matched or not
fn record_rule(
    collector: &mut Option<TraceCollector>,
    phase: &str,
    rule: &CompiledRule,
    matched: bool,
) {
    record(
        collector,
        TraceEventType::Rule,
        || {
            let outcome = if matched { "matched" } else { "not matched" };
            format!("{} rule {}: {}.", phase, outcome, rule.id)
        },
        || {
            Some(json!({
                "ruleId": rule.id,
                "priority": rule.priority,
                "matched": matched,
            }))
        },
    );
}

/// Reason naming the decisive rule
fn rule_reason(
    code: &str,
    message: String,
    rule: &CompiledRule,
    fields: Option<&[String]>,
) -> Reason {
    let mut details = json!({
        "ruleId": rule.id,
        "effect": rule.effect,
        "priority": rule.priority,
    });
    if let (Some(fields), Value::Object(map)) = (fields, &mut details) {
        map.insert("fields".to_string(), json!(fields));
    }

    Reason::new(code, message).with_details(details)
}

#[async_trait]
impl AuthorizationEngine for EmbeddedEngine {
    fn engine(&self) -> &str {
        &self.config.engine_name
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Explain)
    }

    async fn authorize(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
    ) -> Result<Decision> {
        let (decision, _) = self.evaluate(input, options, options.trace)?;
        Ok(decision)
    }

    async fn batch_authorize(
        &self,
        inputs: &[AuthorizationInput],
        options: &AuthorizationOptions,
    ) -> Result<Vec<Decision>> {
        inputs
            .iter()
            .map(|input| {
                self.evaluate(input, options, options.trace)
                    .map(|(decision, _)| decision)
            })
            .collect()
    }

    async fn explain(
        &self,
        input: &AuthorizationInput,
        options: &AuthorizationOptions,
    ) -> Result<ExplainResult> {
        let (decision, trace) = self.evaluate(input, options, true)?;
        let trace = trace.ok_or_else(|| AcxError::engine("Trace capture failed."))?;
        Ok(ExplainResult { decision, trace })
    }
}
