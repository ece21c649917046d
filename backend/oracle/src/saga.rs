//! Multi-step workflows and what a completed step asks for next.

use crate::events::BackendEvent;
use crate::models::ActivityType;

/// Deploy, backers and project info must all land before the Backend hears
/// that the project is live.
pub const PROJECT_CREATION_STEPS: &[ActivityType] = &[
    ActivityType::ProjectDeploy,
    ActivityType::SetBackers,
    ActivityType::SetProjectInfo,
];

pub const END_OF_MODERATION_STEPS: &[ActivityType] =
    &[ActivityType::CommitFinalVotes, ActivityType::CancelProject];

/// True iff every required tag is in `completed`, regardless of order or
/// repetition.
pub fn is_complete(completed: &[ActivityType], required: &[ActivityType]) -> bool {
    required.iter().all(|tag| completed.contains(tag))
}

/// True only for the step that turns an incomplete saga into a complete one.
pub fn completes(
    before: &[ActivityType],
    after: &[ActivityType],
    required: &[ActivityType],
) -> bool {
    !is_complete(before, required) && is_complete(after, required)
}

/// A follow-up dispatch requested by a completion handler. Run after the
/// owner lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Push the stored backers and amounts on-chain.
    SetBackers { project_id: i64 },
    CommitModerationVotes { project_id: i64 },
    CancelProject { project_id: i64 },
    /// `WithdrawFunds` to the creator or `RequestRefund` to one backer.
    ReleaseFunds {
        project_id: i64,
        activity_type: ActivityType,
        user_id: i64,
    },
}

/// Everything a completion handler wants to happen once state is saved.
#[derive(Debug, Default)]
pub struct Outcome {
    pub events: Vec<BackendEvent>,
    pub continuations: Vec<Continuation>,
}

impl Outcome {
    pub fn event(mut self, event: BackendEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn then(mut self, continuation: Continuation) -> Self {
        self.continuations.push(continuation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivityType::*;

    #[test]
    fn subset_law() {
        assert!(is_complete(&[SetProjectInfo, ProjectDeploy, SetBackers], PROJECT_CREATION_STEPS));
        assert!(is_complete(
            &[SetBackers, SetBackers, SetProjectInfo, ProjectDeploy],
            PROJECT_CREATION_STEPS
        ));
        assert!(!is_complete(&[ProjectDeploy, SetProjectInfo], PROJECT_CREATION_STEPS));
        assert!(is_complete(&[], &[]));
        assert!(!is_complete(&[], END_OF_MODERATION_STEPS));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = [CommitFinalVotes, CancelProject];
        let b = [CancelProject, CommitFinalVotes];
        assert_eq!(
            is_complete(&a, END_OF_MODERATION_STEPS),
            is_complete(&b, END_OF_MODERATION_STEPS)
        );
    }

    #[test]
    fn extra_required_tag_breaks_completion() {
        let done = [ProjectDeploy, SetBackers, SetProjectInfo];
        let mut required = PROJECT_CREATION_STEPS.to_vec();
        required.push(CheckMilestone);
        assert!(!is_complete(&done, &required));
    }

    #[test]
    fn completes_fires_once() {
        let before = [ProjectDeploy, SetProjectInfo];
        let after = [ProjectDeploy, SetProjectInfo, SetBackers];
        assert!(completes(&before, &after, PROJECT_CREATION_STEPS));
        let again = [ProjectDeploy, SetProjectInfo, SetBackers, SetBackers];
        assert!(!completes(&after, &again, PROJECT_CREATION_STEPS));
    }
}
