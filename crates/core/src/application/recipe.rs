// Operation recipes - fixed, ordered lists of tool invocations
//
// Every step declares what happens when it fails: Continue runs the
// remaining steps anyway, Abort stops the recipe. A step fails when the
// tool cannot be launched, times out, or exits non-zero (unless its output
// carries a tolerated marker such as "No such file").

use crate::port::{CapturedOutput, Invocation, ProcessInvoker};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Continue,
    Abort,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub invocation: Invocation,
    pub on_failure: FailurePolicy,
    /// Output substrings that turn a non-zero exit into an acceptable outcome
    pub tolerated: Vec<&'static str>,
}

impl Step {
    pub fn new(label: impl Into<String>, invocation: Invocation, on_failure: FailurePolicy) -> Self {
        Self {
            label: label.into(),
            invocation,
            on_failure,
            tolerated: Vec::new(),
        }
    }

    pub fn tolerating(mut self, marker: &'static str) -> Self {
        self.tolerated.push(marker);
        self
    }

    fn is_tolerated(&self, output: &CapturedOutput) -> bool {
        self.tolerated
            .iter()
            .any(|m| output.stdout.contains(m) || output.stderr.contains(m))
    }
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub steps: Vec<Step>,
    /// Applied to every step that has no timeout of its own
    pub step_timeout: Duration,
}

impl Recipe {
    pub fn new(name: impl Into<String>, step_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            step_timeout,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded(CapturedOutput),
    /// Non-zero exit with a tolerated marker in the output
    Tolerated(CapturedOutput),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub label: String,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

/// What happened when a recipe ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRun {
    pub recipe: String,
    pub outcomes: Vec<StepOutcome>,
    /// Label of the Abort step that stopped the recipe
    pub aborted_at: Option<String>,
}

impl RecipeRun {
    /// True when every step was attempted
    pub fn completed(&self) -> bool {
        self.aborted_at.is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// "label: reason" for every failed step
    pub fn diagnostics(&self) -> Vec<String> {
        self.failures()
            .filter_map(|o| match &o.status {
                StepStatus::Failed(reason) => Some(format!("{}: {}", o.label, reason)),
                _ => None,
            })
            .collect()
    }

    /// Captured output of a step, if it ran to exit
    pub fn output_of(&self, label: &str) -> Option<&CapturedOutput> {
        self.outcomes
            .iter()
            .find(|o| o.label == label)
            .and_then(|o| match &o.status {
                StepStatus::Succeeded(out) | StepStatus::Tolerated(out) => Some(out),
                StepStatus::Failed(_) => None,
            })
    }
}

/// Run the steps in order, honoring each step's failure policy
pub async fn run_recipe(invoker: &dyn ProcessInvoker, recipe: &Recipe) -> RecipeRun {
    let mut outcomes = Vec::with_capacity(recipe.steps.len());
    let mut aborted_at = None;

    for step in &recipe.steps {
        let mut invocation = step.invocation.clone();
        if invocation.timeout.is_none() {
            invocation.timeout = Some(recipe.step_timeout);
        }

        debug!(recipe = %recipe.name, step = %step.label, command = %invocation.command_line(), "Running step");

        let status = match invoker.invoke(&invocation).await {
            Ok(out) if out.success() => StepStatus::Succeeded(out),
            Ok(out) if step.is_tolerated(&out) => StepStatus::Tolerated(out),
            Ok(out) => StepStatus::Failed(out.failure_summary()),
            Err(e) => StepStatus::Failed(e.to_string()),
        };

        let failed = matches!(status, StepStatus::Failed(_));
        if let StepStatus::Failed(reason) = &status {
            warn!(recipe = %recipe.name, step = %step.label, reason = %reason, policy = ?step.on_failure, "Step failed");
        }

        outcomes.push(StepOutcome {
            label: step.label.clone(),
            status,
        });

        if failed && step.on_failure == FailurePolicy::Abort {
            aborted_at = Some(step.label.clone());
            break;
        }
    }

    info!(
        recipe = %recipe.name,
        steps_run = outcomes.len(),
        steps_total = recipe.steps.len(),
        aborted = aborted_at.is_some(),
        "Recipe finished"
    );

    RecipeRun {
        recipe: recipe.name.clone(),
        outcomes,
        aborted_at,
    }
}
