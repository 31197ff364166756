//! RB-005: Execution target resolution.
//!
//! A statement-level override always wins; otherwise the statement runs
//! against the target inherited from its enclosing node.

use super::types::{ExecutionContext, ExecutionTarget, Step};

/// A document node that supplies the target its children inherit.
///
/// Statements hold no reference to their parent; the runner asks the
/// enclosing scope for its default target and places it in the
/// [`ExecutionContext`] as the ambient target.
pub trait DefaultTarget {
    fn default_target(&self) -> &ExecutionTarget;
}

/// A step together with the target it inherits from its section.
pub struct StepScope<'a> {
    pub step: &'a Step,
    pub inherited: &'a ExecutionTarget,
}

impl DefaultTarget for StepScope<'_> {
    fn default_target(&self) -> &ExecutionTarget {
        self.step.target.as_ref().unwrap_or(self.inherited)
    }
}

/// Pick the target for one executor call.
pub fn resolve<'a>(
    override_target: Option<&'a ExecutionTarget>,
    ctx: &ExecutionContext<'a>,
) -> &'a ExecutionTarget {
    override_target.unwrap_or(ctx.ambient_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Position;
    use crate::testing::RecordingToolbox;

    fn ctx<'a>(toolbox: &'a RecordingToolbox, ambient: &'a ExecutionTarget) -> ExecutionContext<'a> {
        ExecutionContext {
            dry_run: false,
            toolbox,
            ambient_target: ambient,
            position: Position::default(),
        }
    }

    #[test]
    fn test_rb005_override_wins() {
        let toolbox = RecordingToolbox::default();
        let ambient = ExecutionTarget::new(["web01", "web02"]);
        let canary = ExecutionTarget::new(["canary01"]);
        let c = ctx(&toolbox, &ambient);
        assert_eq!(resolve(Some(&canary), &c), &canary);
    }

    #[test]
    fn test_rb005_inherits_ambient() {
        let toolbox = RecordingToolbox::default();
        let ambient = ExecutionTarget::new(["web01"]);
        let c = ctx(&toolbox, &ambient);
        assert!(std::ptr::eq(resolve(None, &c), &ambient));
    }

    #[test]
    fn test_rb005_override_equal_to_ambient_still_used() {
        let toolbox = RecordingToolbox::default();
        let ambient = ExecutionTarget::new(["web01"]);
        let same = ambient.clone();
        let c = ctx(&toolbox, &ambient);
        assert!(std::ptr::eq(resolve(Some(&same), &c), &same));
    }

    #[test]
    fn test_rb005_step_scope_default_target() {
        let section_target = ExecutionTarget::new(["db01"]);
        let mut step = Step {
            title: "migrate".to_string(),
            target: None,
            statements: vec![],
        };
        let scope = StepScope {
            step: &step,
            inherited: &section_target,
        };
        assert_eq!(scope.default_target(), &section_target);

        step.target = Some(ExecutionTarget::new(["db02"]));
        let scope = StepScope {
            step: &step,
            inherited: &section_target,
        };
        assert_eq!(scope.default_target().hosts, vec!["db02"]);
    }
}
