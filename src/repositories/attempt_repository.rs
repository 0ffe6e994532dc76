use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{Attempt, ScoreBreakdown},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Fails with `AlreadyExists` if an attempt for the same
    /// (student_id, exam_id) is already stored.
    async fn create(&self, attempt: Attempt) -> AppResult<Attempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>>;
    async fn find_by_student_and_exam(
        &self,
        student_id: &str,
        exam_id: &str,
    ) -> AppResult<Option<Attempt>>;
    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Attempt>>;
    /// Flips `is_completed` to true only if it is still false. Returns
    /// whether this call performed the flip.
    async fn complete(
        &self,
        id: &str,
        result: &ScoreBreakdown,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<bool>;
    async fn delete(&self, id: &str) -> AppResult<()>;
    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoAttemptRepository {
    collection: Collection<Attempt>,
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("attempts");
        Self { collection }
    }
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn create(&self, attempt: Attempt) -> AppResult<Attempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Attempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_by_student_and_exam(
        &self,
        student_id: &str,
        exam_id: &str,
    ) -> AppResult<Option<Attempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "student_id": student_id,
                "exam_id": exam_id
            })
            .await?;
        Ok(attempt)
    }

    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Attempt>> {
        let mut attempts: Vec<Attempt> = self
            .collection
            .find(doc! { "exam_id": exam_id })
            .await?
            .try_collect()
            .await?;
        sort_by_started_at(&mut attempts);
        Ok(attempts)
    }

    async fn complete(
        &self,
        id: &str,
        result: &ScoreBreakdown,
        submitted_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let update = doc! {
            "$set": {
                "is_completed": true,
                "score": result.score,
                "submitted_at": to_bson(&submitted_at)?,
                "result": to_bson(result)?,
            }
        };

        let outcome = self
            .collection
            .update_one(doc! { "id": id, "is_completed": false }, update)
            .await?;

        Ok(outcome.modified_count == 1)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!(
                "Attempt with id '{}' not found",
                id
            )));
        }

        Ok(())
    }

    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "exam_id": exam_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let student_exam_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "exam_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("student_exam_unique".to_string())
                    .build(),
            )
            .build();

        let exam_id_index = IndexModel::builder()
            .keys(doc! { "exam_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("exam_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(student_exam_index).await?;
        self.collection.create_index(exam_id_index).await?;

        log::info!("Successfully created indexes for attempts collection");
        Ok(())
    }
}

pub(crate) fn sort_by_started_at(attempts: &mut [Attempt]) {
    attempts.sort_by(|a, b| a.started_at.cmp(&b.started_at));
}
