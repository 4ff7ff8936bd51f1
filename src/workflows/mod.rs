// Workflow routing: states, transition table, action router

pub mod router;
pub mod states;
pub mod transitions;

pub use router::{TransitionPlan, WorkflowRouter};
pub use states::{Action, DocStatus, ParseLabelError, WorkflowState};
pub use transitions::{
    default_rules, AvailableAction, TableError, TransitionRule, TransitionTable,
    DEFAULT_WORKFLOW_NAME,
};
