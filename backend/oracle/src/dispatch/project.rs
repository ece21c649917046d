//! Project workflow steps.

use serde_json::json;
use tracing::info;

use super::{
    fields, Accepted, CreateProjectRequest, SetBackersRequest, SetModeratorsRequest,
    SetProjectInfoRequest, Step,
};
use crate::db::projects;
use crate::errors::{OracleError, Result};
use crate::models::{unix_now, ActivityType, OwnerKind, Project, ProjectParameters, ProjectStatus};
use crate::oracle::Oracle;

impl Oracle {
    fn project_step(
        &self,
        project: &Project,
        activity_type: ActivityType,
        path: String,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Step {
        Step {
            kind: OwnerKind::Project,
            owner_id: project.id,
            callback_id: project.id,
            activity_type,
            path,
            fields,
        }
    }

    /// Register a new campaign and ask the Relayer to deploy its contract.
    pub async fn create_project(
        &self,
        project_id: i64,
        req: &CreateProjectRequest,
    ) -> Result<Accepted> {
        if req.milestones.is_empty() {
            return Err(OracleError::InvalidRequest(
                "a project needs at least one milestone".to_string(),
            ));
        }
        let parameters = ProjectParameters {
            milestones: req.milestones.clone(),
            release_percents: req.release_percents.clone(),
            creator: req.creator,
            ..Default::default()
        };
        let project = Project::new(project_id, parameters, unix_now());
        projects::insert_project(&self.pool, &project).await?;
        info!(project_id, "Project created");

        let step = self.project_step(
            &project,
            ActivityType::ProjectDeploy,
            format!("/projects/{project_id}"),
            fields([
                ("project_id", json!(project_id)),
                ("milestone_times", json!(req.milestones)),
                ("release_percents", json!(req.release_percents)),
                ("creator", json!(req.creator)),
            ]),
        );
        self.dispatch_step(step).await
    }

    /// Store the funding results next to the milestones already on record
    /// and push them on-chain.
    pub async fn set_project_info(
        &self,
        project_id: i64,
        req: &SetProjectInfoRequest,
    ) -> Result<Accepted> {
        let project = {
            let _guard = self.locks.lock(OwnerKind::Project, project_id).await;
            let mut project = projects::get_project(&self.pool, project_id).await?;
            let stored = &project.parameters;
            project.parameters = ProjectParameters {
                milestones: stored.milestones.clone(),
                release_percents: stored.release_percents.clone(),
                creator: stored.creator,
                moderators: stored.moderators.clone(),
                backers: req.beneficiaries.clone(),
                amounts: req.amounts.clone(),
                funding_complete: req.funding_complete,
                listing_fee: req.listing_fee,
                total_raised: req.total_raised,
                total_amount: req.total_amount,
            };
            project.advance(ProjectStatus::Deployed);
            projects::update_project(&self.pool, &mut project).await?;
            project
        };

        let p = &project.parameters;
        let step = self.project_step(
            &project,
            ActivityType::SetProjectInfo,
            format!("/admin/projects/{project_id}/SET_PROJECT_INFO"),
            fields([
                ("project_id", json!(project_id)),
                ("contract_address", json!(project.contract_address)),
                ("listing_fee", json!(p.listing_fee)),
                ("total_raised", json!(p.total_raised)),
                ("beneficiaries", json!(p.backers)),
                ("amounts", json!(p.amounts)),
                ("funding_complete", json!(p.funding_complete)),
                ("total_amount", json!(p.total_amount)),
                ("milestones", json!(p.milestones)),
                ("release_percents", json!(p.release_percents)),
                ("creator", json!(p.creator)),
            ]),
        );
        self.dispatch_step(step).await
    }

    pub async fn set_backers(&self, project_id: i64, req: &SetBackersRequest) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        self.dispatch_set_backers(&project, req).await
    }

    /// `SetBackers` with the backers and amounts already stored on the project.
    pub(crate) async fn set_backers_from_stored(&self, project_id: i64) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let p = &project.parameters;
        let req = SetBackersRequest {
            beneficiaries: p.backers.clone(),
            amounts: p.amounts.clone(),
            funding_complete: p.funding_complete,
            total_amount: p.total_amount,
        };
        self.dispatch_set_backers(&project, &req).await
    }

    async fn dispatch_set_backers(
        &self,
        project: &Project,
        req: &SetBackersRequest,
    ) -> Result<Accepted> {
        let step = self.project_step(
            project,
            ActivityType::SetBackers,
            format!("/manager/projects/{}/SET_BACKERS", project.id),
            fields([
                ("project_id", json!(project.id)),
                ("contract_address", json!(project.contract_address)),
                ("beneficiaries", json!(req.beneficiaries)),
                ("amounts", json!(req.amounts)),
                ("funding_complete", json!(req.funding_complete)),
                ("total_amount", json!(req.total_amount)),
            ]),
        );
        self.dispatch_step(step).await
    }

    pub async fn set_moderators(
        &self,
        project_id: i64,
        req: &SetModeratorsRequest,
    ) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let step = self.project_step(
            &project,
            ActivityType::SetModerators,
            format!("/cs/projects/{project_id}/START_MODERATION"),
            fields([
                ("project_id", json!(project_id)),
                ("contract_address", json!(project.contract_address)),
                ("moderators", json!(req.moderators)),
                ("moderation_end_time", json!(req.moderation_end_time)),
            ]),
        );
        self.dispatch_step(step).await
    }

    pub async fn cancel_project(&self, project_id: i64) -> Result<Accepted> {
        self.simple_project_step(project_id, ActivityType::CancelProject, "/moderator/projects")
            .await
    }

    pub async fn check_milestone(&self, project_id: i64) -> Result<Accepted> {
        self.simple_project_step(project_id, ActivityType::CheckMilestone, "/projects")
            .await
    }

    pub async fn failed_fund_recovery(&self, project_id: i64) -> Result<Accepted> {
        self.simple_project_step(project_id, ActivityType::FailedFundRecovery, "/projects")
            .await
    }

    /// Withdraw released funds to the creator, or refund one backer.
    pub async fn release_funds(
        &self,
        project_id: i64,
        activity_type: ActivityType,
        user_id: i64,
    ) -> Result<Accepted> {
        if !matches!(activity_type, ActivityType::WithdrawFunds | ActivityType::RequestRefund) {
            return Err(OracleError::InvalidRequest(format!(
                "{activity_type} is not a fund release"
            )));
        }
        let project = projects::get_project(&self.pool, project_id).await?;
        let step = self.project_step(
            &project,
            activity_type,
            format!("/manager/projects/{project_id}/{activity_type}"),
            fields([
                ("project_id", json!(project_id)),
                ("contract_address", json!(project.contract_address)),
                ("user_id", json!(user_id)),
            ]),
        );
        self.dispatch_step(step).await
    }

    async fn simple_project_step(
        &self,
        project_id: i64,
        activity_type: ActivityType,
        prefix: &str,
    ) -> Result<Accepted> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let step = self.project_step(
            &project,
            activity_type,
            format!("{prefix}/{project_id}/{activity_type}"),
            fields([
                ("project_id", json!(project_id)),
                ("contract_address", json!(project.contract_address)),
            ]),
        );
        self.dispatch_step(step).await
    }
}
