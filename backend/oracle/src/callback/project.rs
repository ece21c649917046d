//! Completion handlers for project activities.

use serde_json::json;
use tracing::info;

use super::{EventPayload, RelayerCallback};
use crate::db::{activities, projects, votes};
use crate::errors::{OracleError, Result};
use crate::events::BackendEvent;
use crate::ledger;
use crate::models::{
    unix_now, Activity, ActivityStatus, ActivityType, EventType, OwnerKind, Project,
    ProjectStatus, Vote, VoteParameters, VoteType, CLEARED_ACTIVITY_DATE, MODERATION_QUORUM,
};
use crate::oracle::Oracle;
use crate::saga::{self, Continuation, Outcome, END_OF_MODERATION_STEPS, PROJECT_CREATION_STEPS};

fn project_event(
    project: &Project,
    event: EventType,
    status: bool,
    extra: serde_json::Value,
) -> BackendEvent {
    BackendEvent::project(event, project.id, &project.contract_address, status, extra)
}

impl Oracle {
    /// Apply a confirmed project step. Runs under the project lock; the
    /// activity is resolved only after the project row is saved.
    pub(super) async fn complete_project_step(
        &self,
        activity: &Activity,
        payload: EventPayload,
        cb: &RelayerCallback,
    ) -> Result<Outcome> {
        let mut project = projects::get_project(&self.pool, activity.owner_id).await?;
        let before = project.activities_completed.clone();
        let activity_type = activity.activity_type;
        let mut outcome = Outcome::default();

        match (activity_type, payload) {
            (ActivityType::ProjectDeploy, EventPayload::Deployed { contract_address }) => {
                info!(project_id = project.id, %contract_address, "Project contract deployed");
                project.contract_address = contract_address;
                if project.status == ProjectStatus::Inactive {
                    project.advance(ProjectStatus::Deployed);
                }
                project.mark_completed(activity_type);
                outcome = outcome.event(project_event(
                    &project,
                    EventType::ProjectCreate,
                    true,
                    json!({}),
                ));
            }
            (ActivityType::SetBackers, EventPayload::Empty) => {
                project.advance(ProjectStatus::MilestonePhase);
                project.mark_completed(activity_type);
            }
            (ActivityType::SetProjectInfo, EventPayload::Empty) => {
                project.mark_completed(activity_type);
                outcome = outcome.then(Continuation::SetBackers {
                    project_id: project.id,
                });
            }
            (ActivityType::SetModerators, EventPayload::Empty) => {
                project.advance(ProjectStatus::ModerationPhase);
                outcome = outcome.event(project_event(
                    &project,
                    EventType::StartModeration,
                    true,
                    json!({}),
                ));
            }
            (ActivityType::CommitFinalVotes, EventPayload::Empty) => {
                project.advance(ProjectStatus::ReadyToCancel);
                project.mark_completed(activity_type);
                outcome = outcome.then(Continuation::CancelProject {
                    project_id: project.id,
                });
            }
            (ActivityType::CancelProject, EventPayload::Cancelled { cancelled }) => {
                project.advance(if cancelled {
                    ProjectStatus::Cancelled
                } else {
                    ProjectStatus::MilestonePhase
                });
                project.mark_completed(activity_type);
                if saga::is_complete(&project.activities_completed, END_OF_MODERATION_STEPS) {
                    outcome = outcome.event(project_event(
                        &project,
                        EventType::EndModeration,
                        true,
                        json!({ "result": cancelled }),
                    ));
                }
            }
            (ActivityType::CheckMilestone, EventPayload::MilestoneChecked { outcomes }) => {
                let passed = outcomes.iter().all(|&ok| ok);
                outcome = milestone_checked(&mut project, passed, outcome);
            }
            (ActivityType::WithdrawFunds, EventPayload::Amount(amount)) => {
                if project.status == ProjectStatus::MilestoneSuccess {
                    project.advance(ProjectStatus::Ended);
                    outcome = outcome.event(project_event(
                        &project,
                        EventType::FundWithdrawal,
                        true,
                        json!({ "funds_released": amount }),
                    ));
                }
            }
            (ActivityType::RequestRefund, EventPayload::Amount(amount)) => {
                if project.status == ProjectStatus::MilestoneFailed {
                    project.advance(ProjectStatus::Failed);
                    outcome = outcome.event(project_event(
                        &project,
                        EventType::FundWithdrawal,
                        true,
                        json!({ "funds_released": amount }),
                    ));
                }
            }
            (ActivityType::FailedFundRecovery, EventPayload::Amount(amount)) => {
                project.next_activity_date = CLEARED_ACTIVITY_DATE;
                project.advance(ProjectStatus::FundsRecovered);
                outcome = outcome.event(project_event(
                    &project,
                    EventType::FailedFundRecovery,
                    true,
                    json!({ "funds_released": amount }),
                ));
            }
            (ActivityType::MilestoneVote, EventPayload::MilestoneVote { voter_id, vote }) => {
                let contract = cb.contract_address().unwrap_or(&project.contract_address);
                votes::insert_vote(
                    &self.pool,
                    &confirmed_vote(
                        &project,
                        contract,
                        voter_id,
                        VoteType::Milestone,
                        vote,
                        String::new(),
                    ),
                )
                .await?;
                outcome = outcome.event(project_event(
                    &project,
                    EventType::MilestoneVote,
                    true,
                    json!({ "user_id": voter_id, "vote": vote }),
                ));
            }
            (
                ActivityType::ModerationVote,
                EventPayload::ModerationVote {
                    voter_id,
                    commitment,
                },
            ) => {
                outcome = self
                    .moderation_vote_confirmed(&project, cb, voter_id, commitment, outcome)
                    .await?;
            }
            (_, EventPayload::Empty) => {
                outcome = outcome.event(BackendEvent::activity_outcome(
                    OwnerKind::Project,
                    project.id,
                    activity_type,
                    ActivityStatus::Success,
                    cb.hash(),
                ));
            }
            (t, other) => {
                return Err(OracleError::CallbackDecode(format!(
                    "{t} cannot complete with {other:?}"
                )))
            }
        }

        if saga::completes(&before, &project.activities_completed, PROJECT_CREATION_STEPS) {
            info!(project_id = project.id, "Project creation complete");
            outcome = outcome.event(project_event(
                &project,
                EventType::ProjectComplete,
                true,
                json!({}),
            ));
        }

        projects::update_project(&self.pool, &mut project).await?;
        ledger::resolve_activity(
            &self.pool,
            OwnerKind::Project,
            activity.id,
            cb.hash(),
            ActivityStatus::Success,
        )
        .await?;
        Ok(outcome)
    }

    /// Confirm the ballot stored at submit time. Any confirmation at or
    /// above the quorum starts the commit, unless one is in flight or has
    /// already succeeded.
    async fn moderation_vote_confirmed(
        &self,
        project: &Project,
        cb: &RelayerCallback,
        voter_id: i64,
        commitment: String,
        mut outcome: Outcome,
    ) -> Result<Outcome> {
        let contract = cb.contract_address().unwrap_or(&project.contract_address);
        let confirmed =
            votes::confirm_vote(&self.pool, project.id, voter_id, VoteType::Moderation, contract)
                .await?;
        if !confirmed {
            votes::insert_vote(
                &self.pool,
                &confirmed_vote(
                    project,
                    contract,
                    voter_id,
                    VoteType::Moderation,
                    false,
                    commitment.clone(),
                ),
            )
            .await?;
        }
        outcome = outcome.event(project_event(
            project,
            EventType::ModerationVote,
            true,
            json!({ "user_id": voter_id, "vote": commitment }),
        ));

        let count = votes::count_votes(&self.pool, project.id, VoteType::Moderation, true).await?;
        let already_committing = activities::has_live_activity(
            &self.pool,
            OwnerKind::Project,
            project.id,
            ActivityType::CommitFinalVotes,
        )
        .await?;
        if count >= MODERATION_QUORUM && !already_committing {
            info!(project_id = project.id, count, "Moderation quorum reached");
            outcome = outcome.then(Continuation::CommitModerationVotes {
                project_id: project.id,
            });
        }
        Ok(outcome)
    }
}

/// Schedule the next milestone or close out the campaign, and release
/// funds accordingly.
fn milestone_checked(project: &mut Project, passed: bool, mut outcome: Outcome) -> Outcome {
    let now = unix_now();
    if passed {
        match project.parameters.next_milestone_after(now) {
            Some(next) => project.next_activity_date = next,
            None => {
                project.advance(ProjectStatus::MilestoneSuccess);
                project.completed_at = now;
            }
        }
        outcome = outcome.then(Continuation::ReleaseFunds {
            project_id: project.id,
            activity_type: ActivityType::WithdrawFunds,
            user_id: project.parameters.creator,
        });
    } else {
        project.advance(ProjectStatus::MilestoneFailed);
        for &backer in &project.parameters.backers {
            outcome = outcome.then(Continuation::ReleaseFunds {
                project_id: project.id,
                activity_type: ActivityType::RequestRefund,
                user_id: backer,
            });
        }
    }
    info!(project_id = project.id, passed, status = ?project.status, "Milestone checked");
    outcome.event(project_event(
        project,
        EventType::MilestoneRelease,
        passed,
        json!({ "result": passed }),
    ))
}

fn confirmed_vote(
    project: &Project,
    contract: &str,
    user_id: i64,
    vote_type: VoteType,
    vote: bool,
    encrypted_vote: String,
) -> Vote {
    Vote {
        vote_id: 0,
        contract_address: contract.to_string(),
        vote_time: unix_now(),
        user_id,
        project_id: project.id,
        vote_type,
        confirmed: true,
        parameters: VoteParameters {
            vote,
            encrypted_vote,
            decryption_key: String::new(),
            vote_type: vote_type as i32,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CallbackReport, Disposition};
    use super::*;
    use crate::db::activities::activities_for_owner;
    use crate::dispatch::{CreateProjectRequest, SetProjectInfoRequest, VoteRequest};
    use crate::testutil::{
        callback, complete, force_status, harness, seed_project, Harness, FAR_MILESTONES_MS,
    };

    async fn project_callback(h: &Harness, id: i64, cb: RelayerCallback) -> Result<CallbackReport> {
        let activity_id = cb.transaction_parent_id;
        let activity = activities::find_activity(&h.oracle.pool, OwnerKind::Project, activity_id)
            .await
            .unwrap()
            .unwrap();
        h.oracle
            .handle_callback(OwnerKind::Project, id, activity.activity_type.as_str(), cb)
            .await
    }

    async fn project(h: &Harness, id: i64) -> Project {
        projects::get_project(&h.oracle.pool, id).await.unwrap()
    }

    #[tokio::test]
    async fn deploy_callback_sets_address_and_status() {
        let h = harness().await;
        let accepted = h
            .oracle
            .create_project(
                1,
                &CreateProjectRequest {
                    milestones: FAR_MILESTONES_MS.to_vec(),
                    release_percents: vec![50, 50],
                    creator: 7,
                },
            )
            .await
            .unwrap();

        let report = project_callback(&h, 1, complete(accepted.activity_id, json!(["0xABC"])))
            .await
            .unwrap();
        assert_eq!(report.disposition, Disposition::Completed);

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::Deployed);
        assert_eq!(p.contract_address, "0xABC");
        assert!(p.activities_completed.contains(&ActivityType::ProjectDeploy));
        assert_eq!(h.backend.event_types(), vec!["PROJECT_CREATE"]);

        let a = activities::find_activity(&h.oracle.pool, OwnerKind::Project, accepted.activity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.status, ActivityStatus::Success);
        assert_eq!(a.transaction_hash.as_deref(), Some(format!("0xhash{}", a.id).as_str()));
    }

    #[tokio::test]
    async fn project_info_chains_backers_without_completing() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h
            .oracle
            .set_project_info(
                1,
                &SetProjectInfoRequest {
                    beneficiaries: vec![101, 102, 103],
                    amounts: vec![10, 20, 30],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = project_callback(&h, 1, complete(accepted.activity_id, json!([])))
            .await
            .unwrap();
        assert_eq!(report.dispatched.len(), 1);

        let chained = h.relayer.of_type(ActivityType::SetBackers);
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].fields["beneficiaries"], json!([101, 102, 103]));
        assert!(!h.backend.event_types().contains(&"PROJECT_COMPLETE".to_string()));
        assert_eq!(project(&h, 1).await.activities_completed, vec![ActivityType::SetProjectInfo]);
    }

    #[tokio::test]
    async fn creation_saga_completes_once() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;

        let deploy = ledger::begin_activity(
            &h.oracle.pool,
            OwnerKind::Project,
            1,
            ActivityType::ProjectDeploy,
        )
        .await
        .unwrap();
        project_callback(&h, 1, complete(deploy.id, json!(["0xABC"]))).await.unwrap();

        let info = h
            .oracle
            .set_project_info(1, &SetProjectInfoRequest::default())
            .await
            .unwrap();
        project_callback(&h, 1, complete(info.activity_id, json!([]))).await.unwrap();

        let backers = h.relayer.of_type(ActivityType::SetBackers)[0].activity_id;
        project_callback(&h, 1, complete(backers, json!([]))).await.unwrap();
        // Redelivery of the same callback is a no-op.
        let dup = project_callback(&h, 1, complete(backers, json!([]))).await.unwrap();
        assert_eq!(dup.disposition, Disposition::Duplicate);

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::MilestonePhase);
        let completes = h
            .backend
            .event_types()
            .into_iter()
            .filter(|t| t == "PROJECT_COMPLETE")
            .count();
        assert_eq!(completes, 1);
    }

    #[tokio::test]
    async fn last_milestone_success_withdraws_to_creator() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let mut p = force_status(&h.oracle.pool, 1, ProjectStatus::MilestonePhase).await;
        // Every milestone already in the past.
        p.parameters.milestones = vec![1_000_000, 2_000_000];
        projects::update_project(&h.oracle.pool, &mut p).await.unwrap();

        let check = h.oracle.check_milestone(1).await.unwrap();
        project_callback(&h, 1, complete(check.activity_id, json!([[0, true], [1, true]])))
            .await
            .unwrap();

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::MilestoneSuccess);
        assert!(p.completed_at > 0);
        let withdraw = h.relayer.of_type(ActivityType::WithdrawFunds);
        assert_eq!(withdraw.len(), 1);
        assert_eq!(withdraw[0].fields["user_id"], 7);
        assert_eq!(h.backend.events()[0].body["status"], true);

        project_callback(&h, 1, complete(withdraw[0].activity_id, json!(["600"])))
            .await
            .unwrap();
        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::Ended);
        let last = h.backend.events().pop().unwrap();
        assert_eq!(last.event_type(), Some("PROJECT_FUND_WITHDRAWAL"));
        assert_eq!(last.body["funds_released"], 600);
    }

    #[tokio::test]
    async fn intermediate_milestone_moves_the_date() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let mut p = force_status(&h.oracle.pool, 1, ProjectStatus::MilestonePhase).await;
        p.parameters.milestones = vec![1_000_000, FAR_MILESTONES_MS[1]];
        projects::update_project(&h.oracle.pool, &mut p).await.unwrap();

        let check = h.oracle.check_milestone(1).await.unwrap();
        project_callback(&h, 1, complete(check.activity_id, json!([[0, true]])))
            .await
            .unwrap();

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::MilestonePhase);
        assert_eq!(p.next_activity_date, FAR_MILESTONES_MS[1] / 1000);
        assert_eq!(p.completed_at, 0);
        assert_eq!(h.relayer.of_type(ActivityType::WithdrawFunds).len(), 1);
    }

    #[tokio::test]
    async fn failed_milestone_refunds_every_backer() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        force_status(&h.oracle.pool, 1, ProjectStatus::MilestonePhase).await;

        let check = h.oracle.check_milestone(1).await.unwrap();
        let report = project_callback(&h, 1, complete(check.activity_id, json!([[0, false]])))
            .await
            .unwrap();
        assert_eq!(report.dispatched.len(), 3);

        assert_eq!(project(&h, 1).await.status, ProjectStatus::MilestoneFailed);
        let refunds = h.relayer.of_type(ActivityType::RequestRefund);
        let users: Vec<i64> = refunds
            .iter()
            .map(|r| r.fields["user_id"].as_i64().unwrap())
            .collect();
        assert_eq!(users, vec![101, 102, 103]);
        assert_eq!(h.backend.events()[0].body["status"], false);

        project_callback(&h, 1, complete(refunds[0].activity_id, json!([["10"]])))
            .await
            .unwrap();
        assert_eq!(project(&h, 1).await.status, ProjectStatus::Failed);
        project_callback(&h, 1, complete(refunds[1].activity_id, json!([["20"]])))
            .await
            .unwrap();
        let withdrawals = h
            .backend
            .event_types()
            .into_iter()
            .filter(|t| t == "PROJECT_FUND_WITHDRAWAL")
            .count();
        assert_eq!(withdrawals, 1);
    }

    #[tokio::test]
    async fn moderation_round_trip() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        force_status(&h.oracle.pool, 1, ProjectStatus::MilestonePhase).await;

        let start = ledger::begin_activity(
            &h.oracle.pool,
            OwnerKind::Project,
            1,
            ActivityType::SetModerators,
        )
        .await
        .unwrap();
        project_callback(&h, 1, complete(start.id, json!([]))).await.unwrap();
        assert_eq!(project(&h, 1).await.status, ProjectStatus::ModerationPhase);

        for user in 1..=7 {
            let accepted = h
                .oracle
                .submit_vote(
                    1,
                    VoteType::Moderation,
                    &VoteRequest {
                        user_id: user,
                        vote: true,
                        decryption_key: format!("k{user}"),
                    },
                )
                .await
                .unwrap();
            let events = json!([["0xvoter", user.to_string(), format!("0xc{user}")]]);
            project_callback(&h, 1, complete(accepted.activity_id, events))
                .await
                .unwrap();
        }
        assert_eq!(
            votes::count_votes(&h.oracle.pool, 1, VoteType::Moderation, true).await.unwrap(),
            7
        );
        assert_eq!(
            votes::count_votes(&h.oracle.pool, 1, VoteType::Moderation, false).await.unwrap(),
            7
        );
        let commits = h.relayer.of_type(ActivityType::CommitFinalVotes);
        assert_eq!(commits.len(), 1);

        project_callback(&h, 1, complete(commits[0].activity_id, json!([]))).await.unwrap();
        assert_eq!(project(&h, 1).await.status, ProjectStatus::ReadyToCancel);

        let cancel = h.relayer.of_type(ActivityType::CancelProject);
        assert_eq!(cancel.len(), 1);
        project_callback(&h, 1, complete(cancel[0].activity_id, json!(["0x1", true])))
            .await
            .unwrap();

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::Cancelled);
        let end = h.backend.events().pop().unwrap();
        assert_eq!(end.event_type(), Some("PROJECT_END_MODERATION"));
        assert_eq!(end.body["result"], true);
    }

    async fn confirmed_moderation_vote(h: &Harness, project_id: i64, user: i64) -> CallbackReport {
        let accepted = h
            .oracle
            .submit_vote(
                project_id,
                VoteType::Moderation,
                &VoteRequest {
                    user_id: user,
                    vote: true,
                    decryption_key: format!("k{user}"),
                },
            )
            .await
            .unwrap();
        let events = json!([["0xvoter", user.to_string(), format!("0xc{user}")]]);
        project_callback(h, project_id, complete(accepted.activity_id, events))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_commit_is_retried_by_the_next_vote() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        force_status(&h.oracle.pool, 1, ProjectStatus::ModerationPhase).await;

        for user in 1..=7 {
            confirmed_moderation_vote(&h, 1, user).await;
        }
        let commits = h.relayer.of_type(ActivityType::CommitFinalVotes);
        assert_eq!(commits.len(), 1);

        let report = project_callback(&h, 1, callback(commits[0].activity_id, 3, json!(null)))
            .await
            .unwrap();
        assert_eq!(report.disposition, Disposition::Failed);

        let report = confirmed_moderation_vote(&h, 1, 8).await;
        assert_eq!(report.dispatched.len(), 1);
        let commits = h.relayer.of_type(ActivityType::CommitFinalVotes);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].fields["user_ids"], json!([1, 2, 3, 4, 5, 6, 7, 8]));

        // The retry is still in flight.
        let report = confirmed_moderation_vote(&h, 1, 9).await;
        assert!(report.dispatched.is_empty());
        assert_eq!(h.relayer.of_type(ActivityType::CommitFinalVotes).len(), 2);
    }

    #[tokio::test]
    async fn moderation_without_cancel_returns_to_milestones() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        force_status(&h.oracle.pool, 1, ProjectStatus::ReadyToCancel).await;

        let cancel = h.oracle.cancel_project(1).await.unwrap();
        project_callback(&h, 1, complete(cancel.activity_id, json!(["0x1", false])))
            .await
            .unwrap();
        assert_eq!(project(&h, 1).await.status, ProjectStatus::MilestonePhase);
        // CommitFinalVotes never completed, so the moderation saga is not done.
        assert!(!h.backend.event_types().contains(&"PROJECT_END_MODERATION".to_string()));
    }

    #[tokio::test]
    async fn failure_code_is_forwarded_once() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h.oracle.check_milestone(1).await.unwrap();

        let report = project_callback(&h, 1, callback(accepted.activity_id, 4, json!(null)))
            .await
            .unwrap();
        assert_eq!(report.disposition, Disposition::Failed);
        let a = activities::find_activity(&h.oracle.pool, OwnerKind::Project, accepted.activity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.status, ActivityStatus::GasError);

        let events = h.backend.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, "/events/blockchain/projects/1/callback/CHECK_MILESTONE");
        assert_eq!(events[0].body["status"], false);

        let again = project_callback(&h, 1, callback(accepted.activity_id, 4, json!(null)))
            .await
            .unwrap();
        assert_eq!(again.disposition, Disposition::Duplicate);
        assert_eq!(h.backend.events().len(), 1);
    }

    #[tokio::test]
    async fn bad_payload_leaves_activity_pending() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h.oracle.check_milestone(1).await.unwrap();

        let err = project_callback(&h, 1, complete(accepted.activity_id, json!({"oops": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::CallbackDecode(_)));

        let a = activities::find_activity(&h.oracle.pool, OwnerKind::Project, accepted.activity_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a.status, ActivityStatus::Pending);
        assert!(a.transaction_hash.is_some());
    }

    #[tokio::test]
    async fn in_progress_changes_nothing() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h.oracle.check_milestone(1).await.unwrap();
        let report = project_callback(&h, 1, callback(accepted.activity_id, 1, json!(null)))
            .await
            .unwrap();
        assert_eq!(report.disposition, Disposition::InProgress);
        assert!(h.backend.events().is_empty());
    }

    #[tokio::test]
    async fn wrong_owner_or_type_is_rejected() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        seed_project(&h.oracle.pool, 2).await;
        let accepted = h.oracle.check_milestone(1).await.unwrap();

        let err = h
            .oracle
            .handle_callback(
                OwnerKind::Project,
                2,
                "CHECK_MILESTONE",
                complete(accepted.activity_id, json!([[0, true]])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFound(_)));

        let err = h
            .oracle
            .handle_callback(
                OwnerKind::Project,
                1,
                "SET_BACKERS",
                complete(accepted.activity_id, json!([])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::CallbackDecode(_)));

        let err = h
            .oracle
            .handle_callback(OwnerKind::Project, 1, "CHECK_MILESTONE", complete(999, json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_follow_up_is_reported_not_raised() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h
            .oracle
            .set_project_info(1, &SetProjectInfoRequest::default())
            .await
            .unwrap();

        h.relayer.set_failing(true);
        let report = project_callback(&h, 1, complete(accepted.activity_id, json!([])))
            .await
            .unwrap();
        assert_eq!(report.disposition, Disposition::Completed);
        assert_eq!(report.faults.len(), 1);
        assert!(report.dispatched.is_empty());

        let rows = activities_for_owner(&h.oracle.pool, OwnerKind::Project, 1).await.unwrap();
        let backers = rows
            .iter()
            .find(|a| a.activity_type == ActivityType::SetBackers)
            .unwrap();
        assert_eq!(backers.status, ActivityStatus::InitialError);
    }

    #[tokio::test]
    async fn recovery_clears_the_schedule() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        force_status(&h.oracle.pool, 1, ProjectStatus::Ended).await;

        let accepted = h.oracle.failed_fund_recovery(1).await.unwrap();
        project_callback(&h, 1, complete(accepted.activity_id, json!([["42"]])))
            .await
            .unwrap();

        let p = project(&h, 1).await;
        assert_eq!(p.status, ProjectStatus::FundsRecovered);
        assert_eq!(p.next_activity_date, CLEARED_ACTIVITY_DATE);
        assert_eq!(h.backend.events()[0].body["funds_released"], 42);
    }

    #[tokio::test]
    async fn milestone_vote_is_recorded_confirmed() {
        let h = harness().await;
        seed_project(&h.oracle.pool, 1).await;
        let accepted = h
            .oracle
            .submit_vote(
                1,
                VoteType::Milestone,
                &VoteRequest {
                    user_id: 9,
                    vote: true,
                    decryption_key: String::new(),
                },
            )
            .await
            .unwrap();
        project_callback(&h, 1, complete(accepted.activity_id, json!([["9", true]])))
            .await
            .unwrap();

        let stored = votes::votes_for_project(&h.oracle.pool, 1, VoteType::Milestone)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].confirmed && stored[0].parameters.vote);
        assert_eq!(h.backend.events()[0].body["vote"], true);
    }
}
