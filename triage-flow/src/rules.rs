use std::sync::Arc;

/// Type alias for rule condition functions
pub type RuleCondition<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// A named predicate and the outcome it selects when it holds.
#[derive(Clone)]
pub struct Rule<I, O> {
    pub name: &'static str,
    pub condition: RuleCondition<I>,
    pub outcome: O,
}

impl<I, O> Rule<I, O> {
    pub fn matches(&self, input: &I) -> bool {
        (self.condition)(input)
    }
}

/// Ordered rules evaluated top to bottom; the first rule whose condition holds
/// decides the outcome, otherwise the fallback applies.
pub struct RuleSet<I, O> {
    pub name: &'static str,
    rules: Vec<Rule<I, O>>,
    fallback: O,
}

impl<I, O: Copy> RuleSet<I, O> {
    pub fn new(name: &'static str, fallback: O) -> Self {
        Self {
            name,
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule. Rules added earlier take priority.
    pub fn rule<F>(mut self, name: &'static str, condition: F, outcome: O) -> Self
    where
        F: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            name,
            condition: Arc::new(condition),
            outcome,
        });
        self
    }

    /// First matching rule, if any.
    pub fn first_match(&self, input: &I) -> Option<&Rule<I, O>> {
        self.rules.iter().find(|rule| rule.matches(input))
    }

    pub fn evaluate(&self, input: &I) -> O {
        self.evaluate_named(input).0
    }

    /// Outcome plus the name of the rule that produced it (`"fallback"` when none matched).
    pub fn evaluate_named(&self, input: &I) -> (O, &'static str) {
        match self.first_match(input) {
            Some(rule) => (rule.outcome, rule.name),
            None => (self.fallback, "fallback"),
        }
    }

    /// Look up a rule by name, so individual rules can be exercised in isolation.
    pub fn get(&self, name: &str) -> Option<&Rule<I, O>> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn fallback(&self) -> O {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
