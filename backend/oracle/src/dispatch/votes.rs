//! Milestone and moderation ballots.

use std::collections::HashSet;

use serde_json::json;
use tracing::info;

use super::{fields, Accepted, Step, VoteRequest};
use crate::commitment::moderation_commitment;
use crate::db::{activities, projects, votes};
use crate::errors::{OracleError, Result};
use crate::models::{
    unix_now, ActivityType, OwnerKind, Vote, VoteParameters, VoteType, MODERATION_QUORUM,
};
use crate::oracle::Oracle;

impl Oracle {
    /// Forward a ballot. Moderation ballots are committed to a hash and
    /// stored right away; the callback later marks them confirmed.
    pub async fn submit_vote(
        &self,
        project_id: i64,
        vote_type: VoteType,
        req: &VoteRequest,
    ) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let activity_type = vote_type.activity_type();

        let mut body = fields([
            ("project_id", json!(project_id)),
            ("contract_address", json!(project.contract_address)),
            ("user_id", json!(req.user_id)),
        ]);

        match vote_type {
            VoteType::Milestone => {
                body.insert("vote".into(), json!(req.vote));
            }
            VoteType::Moderation => {
                let encrypted_vote =
                    moderation_commitment(project_id, req.user_id, &req.decryption_key, req.vote)?;
                let vote = Vote {
                    vote_id: 0,
                    contract_address: project.contract_address.clone(),
                    vote_time: unix_now(),
                    user_id: req.user_id,
                    project_id,
                    vote_type,
                    confirmed: false,
                    parameters: VoteParameters {
                        vote: req.vote,
                        encrypted_vote: encrypted_vote.clone(),
                        decryption_key: req.decryption_key.clone(),
                        vote_type: vote_type as i32,
                    },
                };
                let vote_id = votes::insert_vote(&self.pool, &vote).await?;
                info!(project_id, vote_id, user_id = req.user_id, "Moderation vote recorded");
                body.insert("encrypted_vote".into(), json!(encrypted_vote));
            }
        }

        self.dispatch_step(Step {
            kind: OwnerKind::Project,
            owner_id: project_id,
            callback_id: project_id,
            activity_type,
            path: format!("/manager/projects/{project_id}/{activity_type}/{}", req.user_id),
            fields: body,
        })
        .await
    }

    /// Reveal the confirmed moderation ballots on-chain, the newest one per
    /// voter. Refused, without opening an activity, until that many voters
    /// reach the quorum, and while another commit is in flight or done.
    pub async fn commit_moderation_votes(&self, project_id: i64) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let recorded =
            votes::count_votes(&self.pool, project_id, VoteType::Moderation, true).await?;
        if recorded < MODERATION_QUORUM {
            return Err(OracleError::InsufficientVotes {
                recorded,
                required: MODERATION_QUORUM,
            });
        }
        let activity_type = ActivityType::CommitFinalVotes;
        if activities::has_live_activity(&self.pool, OwnerKind::Project, project_id, activity_type)
            .await?
        {
            return Err(OracleError::AlreadyExists(format!(
                "moderation commit for project {project_id}"
            )));
        }

        let ballots = latest_confirmed(
            votes::votes_for_project(&self.pool, project_id, VoteType::Moderation).await?,
        );
        let plain: Vec<bool> = ballots.iter().map(|v| v.parameters.vote).collect();
        let keys: Vec<&str> = ballots
            .iter()
            .map(|v| v.parameters.decryption_key.as_str())
            .collect();
        let encrypted: Vec<&str> = ballots
            .iter()
            .map(|v| v.parameters.encrypted_vote.as_str())
            .collect();
        let users: Vec<i64> = ballots.iter().map(|v| v.user_id).collect();

        self.dispatch_step(Step {
            kind: OwnerKind::Project,
            owner_id: project_id,
            callback_id: project_id,
            activity_type,
            path: format!("/moderator/projects/{project_id}/{activity_type}"),
            fields: fields([
                ("project_id", json!(project_id)),
                ("contract_address", json!(project.contract_address)),
                ("votes", json!(plain)),
                ("decryption_keys", json!(keys)),
                ("encrypted_votes", json!(encrypted)),
                ("user_ids", json!(users)),
            ]),
        })
        .await
    }
}

/// Keep each voter's newest confirmed ballot, in vote order.
fn latest_confirmed(ballots: Vec<Vote>) -> Vec<Vote> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Vote> = ballots
        .into_iter()
        .rev()
        .filter(|v| v.confirmed && seen.insert(v.user_id))
        .collect();
    kept.reverse();
    kept
}
