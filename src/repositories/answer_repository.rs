use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::Answer,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Insert or overwrite the answer keyed by (attempt_id, question_id).
    /// An overwrite keeps the stored id.
    async fn upsert(&self, answer: Answer) -> AppResult<Answer>;
    async fn find_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<Answer>>;
    async fn delete_by_attempt(&self, attempt_id: &str) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoAnswerRepository {
    collection: Collection<Answer>,
}

impl MongoAnswerRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("answers");
        Self { collection }
    }
}

#[async_trait]
impl AnswerRepository for MongoAnswerRepository {
    async fn upsert(&self, answer: Answer) -> AppResult<Answer> {
        let filter = doc! {
            "attempt_id": &answer.attempt_id,
            "question_id": &answer.question_id,
        };
        let update = doc! {
            "$set": {
                "selected_answer": to_bson(&answer.selected_answer)?,
                "is_correct": answer.is_correct,
                "answered_at": to_bson(&answer.answered_at)?,
            },
            "$setOnInsert": { "id": &answer.id },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?
            .ok_or_else(|| {
                AppError::StorageError(format!(
                    "Upsert of answer for question '{}' returned no document",
                    answer.question_id
                ))
            })
    }

    async fn find_by_attempt(&self, attempt_id: &str) -> AppResult<Vec<Answer>> {
        let answers = self
            .collection
            .find(doc! { "attempt_id": attempt_id })
            .await?
            .try_collect()
            .await?;
        Ok(answers)
    }

    async fn delete_by_attempt(&self, attempt_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "attempt_id": attempt_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for answers collection");

        let key_index = IndexModel::builder()
            .keys(doc! { "attempt_id": 1, "question_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("attempt_question_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(key_index).await?;

        log::info!("Successfully created indexes for answers collection");
        Ok(())
    }
}
