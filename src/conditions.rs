use tracing::trace;

use crate::{
    config::{ConditionPriority, ConditionSet, DEFAULT_CONDITION},
    error::{Error, ErrorKind, fail},
    mapping::{ConditionMap, MappingTarget},
    validate::{ResolvedTarget, TargetRules, validate_target},
};

/// Reduces a mapping target to a single validated target for a given set
/// of active conditions.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator<'a> {
    pub conditions: &'a ConditionSet,
    pub priority: ConditionPriority,
    pub rules: TargetRules<'a>,
}

/// What a target reduces to before it's turned into a result. `false`
/// ends the search wherever it's reached.
enum Reduced {
    Resolved(ResolvedTarget),
    Excluded,
}

impl<'a> Evaluator<'a> {
    pub fn evaluate(&self, target: &MappingTarget, remainder: Option<&str>) -> Result<ResolvedTarget, Error> {
        match self.reduce(target, remainder)? {
            Reduced::Resolved(resolved) => Ok(resolved),
            Reduced::Excluded => Err(fail(ErrorKind::NoMapping, "Subpath is explicitly excluded from the package")),
        }
    }

    fn reduce(&self, target: &MappingTarget, remainder: Option<&str>) -> Result<Reduced, Error> {
        match target {
            MappingTarget::Path(path) => validate_target(path, remainder, self.rules).map(Reduced::Resolved),

            MappingTarget::Excluded => Ok(Reduced::Excluded),

            MappingTarget::Conditional(conditions) => self.reduce_conditional(conditions, remainder),

            MappingTarget::Fallback(items) => self.reduce_fallback(items, remainder),
        }
    }

    /// Branches are tried in priority order; a branch that fails doesn't
    /// stop the search, an excluded one does. `default` is always tried last.
    fn reduce_conditional(&self, conditions: &ConditionMap, remainder: Option<&str>) -> Result<Reduced, Error> {
        let mut last_err: Option<Error> = None;

        for (name, target) in self.candidates(conditions) {
            trace!(condition = name, "Trying conditional branch");

            match self.reduce(target, remainder) {
                Ok(reduced) => return Ok(reduced),
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            let names: Vec<&str> = conditions.keys().map(String::as_str).collect();

            fail(ErrorKind::NoConditionMatch, format!(
                "None of the conditions [{}] are active (active: [{}])",
                names.join(", "),
                self.conditions.iter().collect::<Vec<_>>().join(", "),
            ))
        }))
    }

    fn candidates<'m>(&self, conditions: &'m ConditionMap) -> Vec<(&'m str, &'m MappingTarget)> {
        let mut candidates: Vec<(&'m str, &'m MappingTarget)> = match self.priority {
            ConditionPriority::Declaration => conditions.iter()
                .filter(|(name, _)| name.as_str() != DEFAULT_CONDITION && self.conditions.contains(name))
                .map(|(name, target)| (name.as_str(), target))
                .collect(),

            ConditionPriority::Caller => self.conditions.iter()
                .filter(|name| *name != DEFAULT_CONDITION)
                .filter_map(|name| conditions.get_key_value(name))
                .map(|(name, target)| (name.as_str(), target))
                .collect(),
        };

        if let Some((name, target)) = conditions.get_key_value(DEFAULT_CONDITION) {
            candidates.push((name.as_str(), target));
        }

        candidates
    }

    /// The first element that resolves and validates wins, and an excluded
    /// element ends the array. When nothing resolves, the last element's
    /// failure is reported.
    fn reduce_fallback(&self, items: &[MappingTarget], remainder: Option<&str>) -> Result<Reduced, Error> {
        let mut last_err = fail(ErrorKind::NoMapping, "Fallback array has no entries");

        for (index, item) in items.iter().enumerate() {
            match self.reduce(item, remainder) {
                Ok(reduced) => return Ok(reduced),
                Err(err) => {
                    trace!(index, kind = %err.kind(), "Fallback entry rejected");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}
