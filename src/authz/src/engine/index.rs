//! Rule index for candidate lookup
//!
//! Rules are stored once in a shared arena; buckets hold arena positions.
//! Layout per tenant scope:
//!
//! ```text
//! scope -> resource type (exact | any) -> action (exact map | prefix list)
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::compiler::{ActionMatcher, CompiledRule, ResourceTypeMatcher};
use crate::policy::TenantScope;

/// Both scopes, tenant first
pub const ALL_SCOPES: [TenantScope; 2] = [TenantScope::Tenant, TenantScope::Global];

#[derive(Debug, Default, Clone)]
struct ActionIndex {
    exact: HashMap<String, Vec<usize>>,
    prefix: HashMap<String, Vec<usize>>,
}

impl ActionIndex {
    fn insert(&mut self, matcher: &ActionMatcher, position: usize) {
        let bucket = match matcher {
            ActionMatcher::Exact(action) => self.exact.entry(action.clone()).or_default(),
            ActionMatcher::Prefix(prefix) => self.prefix.entry(prefix.clone()).or_default(),
        };
        bucket.push(position);
    }

    fn collect(&self, action: &str, out: &mut BTreeSet<usize>) {
        if let Some(bucket) = self.exact.get(action) {
            out.extend(bucket);
        }

        for (prefix, bucket) in &self.prefix {
            if action.starts_with(prefix.as_str()) {
                out.extend(bucket);
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
struct ResourceIndex {
    exact: HashMap<String, ActionIndex>,
    any: ActionIndex,
}

impl ResourceIndex {
    fn insert(&mut self, rule: &CompiledRule, position: usize) {
        for resource_matcher in &rule.resource_type_matchers {
            let actions = match resource_matcher {
                ResourceTypeMatcher::Any => &mut self.any,
                ResourceTypeMatcher::Exact(resource_type) => {
                    self.exact.entry(resource_type.clone()).or_default()
                }
            };

            for action_matcher in &rule.action_matchers {
                actions.insert(action_matcher, position);
            }
        }
    }

    fn collect(&self, action: &str, resource_type: &str, out: &mut BTreeSet<usize>) {
        if let Some(actions) = self.exact.get(resource_type) {
            actions.collect(action, out);
        }
        self.any.collect(action, out);
    }
}

/// Index over a subset of an arena of compiled rules
#[derive(Debug, Clone)]
pub struct RuleIndex {
    rules: Arc<[CompiledRule]>,
    tenant: ResourceIndex,
    global: ResourceIndex,
    len: usize,
}

impl RuleIndex {
    /// Index every rule in `rules`
    pub fn build(rules: Arc<[CompiledRule]>) -> Self {
        Self::build_filtered(rules, |_| true)
    }

    /// Index the rules accepted by `include`, sharing the arena
    pub fn build_filtered(
        rules: Arc<[CompiledRule]>,
        include: impl Fn(&CompiledRule) -> bool,
    ) -> Self {
        let mut tenant = ResourceIndex::default();
        let mut global = ResourceIndex::default();
        let mut len = 0;

        for (position, rule) in rules.iter().enumerate() {
            if !include(rule) {
                continue;
            }

            match rule.tenant_scope {
                TenantScope::Tenant => tenant.insert(rule, position),
                TenantScope::Global => global.insert(rule, position),
            }
            len += 1;
        }

        Self {
            rules,
            tenant,
            global,
            len,
        }
    }

    pub fn empty() -> Self {
        Self::build(Arc::from(Vec::new()))
    }

    /// Candidates for (action, resource type) in the given scopes,
    /// deduplicated by id and ordered by descending priority then id
    pub fn lookup(
        &self,
        action: &str,
        resource_type: &str,
        scopes: &[TenantScope],
    ) -> Vec<&CompiledRule> {
        let mut positions = BTreeSet::new();

        for scope in scopes {
            let index = match scope {
                TenantScope::Tenant => &self.tenant,
                TenantScope::Global => &self.global,
            };
            index.collect(action, resource_type, &mut positions);
        }

        let mut candidates: Vec<&CompiledRule> =
            positions.into_iter().map(|p| &self.rules[p]).collect();
        sort_candidates(&mut candidates);
        candidates
    }

    /// Number of indexed rules
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Order by descending priority then ascending id, dropping repeated ids
pub fn sort_candidates(candidates: &mut Vec<&CompiledRule>) {
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    candidates.dedup_by(|a, b| a.id == b.id);
}
