//! Task posting and the submission review workflow.
//!
//! Every operation that moves coins or open units runs as one guarded
//! commit, so a task's reserved coins and its open quantity never drift
//! apart from the creator's balance.

use chrono::Utc;
use tracing::info;

use rabbit_firestore::{
    guarded_commit, notification_write, CoinLedger, FirestoreClient, LedgerError, LedgerPlan,
    LedgerReceipt, SubmissionRepository, TaskRepository, TaskTextUpdate,
};
use rabbit_models::{
    CoinContext, CoinOperationType, Notification, Submission, SubmissionStatus, Task, TaskId, User,
};

use crate::error::{ApiError, ApiResult};

/// Fields a creator supplies when posting a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_title: String,
    pub task_detail: String,
    pub task_quantity: u32,
    pub payable_amount: u32,
    pub completion_date: String,
    pub submission_info: String,
    pub task_image_url: Option<String>,
}

#[derive(Clone)]
pub struct TaskService {
    client: FirestoreClient,
    ledger: CoinLedger,
    tasks: TaskRepository,
    submissions: SubmissionRepository,
}

impl TaskService {
    pub fn new(client: FirestoreClient, ledger: CoinLedger) -> Self {
        Self {
            tasks: TaskRepository::new(client.clone()),
            submissions: SubmissionRepository::new(client.clone()),
            client,
            ledger,
        }
    }

    pub fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn submissions(&self) -> &SubmissionRepository {
        &self.submissions
    }

    pub async fn get(&self, id: &str) -> ApiResult<Task> {
        self.tasks
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    /// Post a task, debiting its full cost from the creator in the same commit.
    pub async fn create(&self, creator: &User, input: NewTask) -> ApiResult<(Task, LedgerReceipt)> {
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(),
            task_title: input.task_title,
            task_detail: input.task_detail,
            task_quantity: input.task_quantity,
            payable_amount: input.payable_amount,
            completion_date: input.completion_date,
            submission_info: input.submission_info,
            task_image_url: input.task_image_url,
            creator_email: creator.email.clone(),
            creator_name: creator.name.clone(),
            created_at: now,
            updated_at: now,
        };

        let cost = task.total_cost();
        let context = CoinContext::new(
            CoinOperationType::TaskCreated,
            format!("Posted task \"{}\"", task.task_title),
        )
        .with_reference(task.id.as_str());

        let receipt = self
            .ledger
            .apply(&creator.email, -cost, context, vec![self.tasks.create_write(&task)])
            .await?;

        info!(
            task_id = %task.id,
            creator = %creator.email,
            cost,
            balance = receipt.balance,
            "Task created"
        );
        Ok((task, receipt))
    }

    /// Edit a task's text. Only the creator may edit.
    pub async fn update_text(&self, actor: &User, id: &str, update: &TaskTextUpdate) -> ApiResult<Task> {
        let task = self.get(id).await?;
        if task.creator_email != actor.email {
            return Err(ApiError::forbidden("You can only edit your own tasks"));
        }
        if update.is_empty() {
            return Ok(task);
        }
        Ok(self.tasks.update_text(id, update).await?)
    }

    /// Delete a task and refund its unspent units to the creator.
    ///
    /// Creators may delete their own tasks; admins may delete any task.
    pub async fn delete(&self, actor: &User, id: &str) -> ApiResult<LedgerReceipt> {
        let task = self.get(id).await?;
        if task.creator_email != actor.email && !actor.is_admin() {
            return Err(ApiError::forbidden("You can only delete your own tasks"));
        }

        let tasks = &self.tasks;
        let receipt = self
            .ledger
            .transact(&task.creator_email, move |_| async move {
                let current = tasks
                    .get_versioned(id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound("Task not found".to_string()))?;
                let refund = current.value.total_cost();
                let context = CoinContext::new(
                    CoinOperationType::TaskRefund,
                    format!("Refund for deleted task \"{}\"", current.value.task_title),
                )
                .with_reference(id);

                Ok(LedgerPlan::new(refund, context)
                    .with_write(tasks.delete_write(id, current.update_time.as_deref())))
            })
            .await?;

        info!(
            task_id = %id,
            deleted_by = %actor.email,
            refund = receipt.transaction.delta,
            "Task deleted"
        );
        Ok(receipt)
    }

    /// Record a worker's submission and take one open unit off the task.
    pub async fn submit(&self, worker: &User, task_id: &str, details: &str) -> ApiResult<Submission> {
        let tasks = &self.tasks;
        let submissions = &self.submissions;
        let task_key = &TaskId::from(task_id);

        let submission = guarded_commit(&self.client, "submission_create", move || async move {
            let task = tasks
                .get_versioned(task_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Task not found".to_string()))?;

            if !task.value.has_open_units() {
                return Err(LedgerError::Rejected(
                    "This task has no open units left".to_string(),
                ));
            }
            if submissions.exists_for(&worker.email, task_key).await? {
                return Err(LedgerError::Rejected(
                    "You have already submitted this task".to_string(),
                ));
            }

            let submission = Submission::new(&task.value, &worker.email, &worker.name, details);
            let writes = vec![
                submissions.create_write(&submission),
                tasks.quantity_write(
                    task_id,
                    task.value.task_quantity - 1,
                    task.update_time.as_deref(),
                ),
            ];
            Ok((writes, submission))
        })
        .await?;

        info!(
            submission_id = %submission.id,
            task_id = %task_id,
            worker = %worker.email,
            "Submission created"
        );
        Ok(submission)
    }

    /// Approve a pending submission and pay the worker.
    pub async fn approve(&self, creator: &User, submission_id: &str) -> ApiResult<LedgerReceipt> {
        let submission = self.reviewable_submission(creator, submission_id).await?;

        let submissions = &self.submissions;
        let client = &self.client;
        let receipt = self
            .ledger
            .transact(&submission.worker_email, move |_| async move {
                let current = submissions
                    .get_versioned(submission_id)
                    .await?
                    .ok_or_else(|| LedgerError::NotFound("Submission not found".to_string()))?;
                if !current.value.status.is_reviewable() {
                    return Err(LedgerError::Rejected(
                        "Submission has already been reviewed".to_string(),
                    ));
                }

                let s = &current.value;
                let context = CoinContext::new(
                    CoinOperationType::SubmissionApproved,
                    format!("Approved submission for \"{}\"", s.task_title),
                )
                .with_reference(submission_id);
                let notification = Notification::new(
                    format!(
                        "You have earned {} coins from {} for completing {}",
                        s.payable_amount, s.creator_name, s.task_title
                    ),
                    "/dashboard/my-submissions",
                );

                Ok(LedgerPlan::new(i64::from(s.payable_amount), context)
                    .with_write(submissions.review_write(
                        submission_id,
                        SubmissionStatus::Approved,
                        current.update_time.as_deref(),
                    ))
                    .with_write(notification_write(client, &s.worker_email, &notification)))
            })
            .await?;

        info!(
            submission_id = %submission_id,
            worker = %submission.worker_email,
            coins = receipt.transaction.delta,
            "Submission approved"
        );
        Ok(receipt)
    }

    /// Reject a pending submission and re-open one unit on its task.
    pub async fn reject(&self, creator: &User, submission_id: &str) -> ApiResult<Submission> {
        self.reviewable_submission(creator, submission_id).await?;

        let tasks = &self.tasks;
        let submissions = &self.submissions;
        let client = &self.client;
        let rejected = guarded_commit(client, "submission_reject", move || async move {
            let current = submissions
                .get_versioned(submission_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Submission not found".to_string()))?;
            if !current.value.status.is_reviewable() {
                return Err(LedgerError::Rejected(
                    "Submission has already been reviewed".to_string(),
                ));
            }

            let s = current.value;
            let mut writes = vec![submissions.review_write(
                submission_id,
                SubmissionStatus::Rejected,
                current.update_time.as_deref(),
            )];
            // A deleted task has already refunded its open units.
            if let Some(task) = tasks.get_versioned(s.task_id.as_str()).await? {
                writes.push(tasks.quantity_write(
                    s.task_id.as_str(),
                    task.value.task_quantity + 1,
                    task.update_time.as_deref(),
                ));
            }
            let notification = Notification::new(
                format!("{} rejected your submission for {}", s.creator_name, s.task_title),
                "/dashboard/my-submissions",
            );
            writes.push(notification_write(client, &s.worker_email, &notification));

            let rejected = Submission {
                status: SubmissionStatus::Rejected,
                reviewed_at: Some(Utc::now()),
                ..s
            };
            Ok((writes, rejected))
        })
        .await?;

        info!(submission_id = %submission_id, worker = %rejected.worker_email, "Submission rejected");
        Ok(rejected)
    }

    /// Load a submission the caller may review.
    async fn reviewable_submission(&self, creator: &User, id: &str) -> ApiResult<Submission> {
        let submission = self
            .submissions
            .get_versioned(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Submission not found"))?
            .value;

        if submission.creator_email != creator.email {
            return Err(ApiError::forbidden("You can only review submissions on your own tasks"));
        }
        if !submission.status.is_reviewable() {
            return Err(ApiError::bad_request("Submission has already been reviewed"));
        }
        Ok(submission)
    }
}
