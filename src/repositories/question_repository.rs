use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::Question};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn create(&self, question: Question) -> AppResult<Question>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>>;
    /// All questions of an exam, ascending by `question_order`.
    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Question>>;
    async fn count_by_exam(&self, exam_id: &str) -> AppResult<u64>;
    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questions");
        Self { collection }
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn create(&self, question: Question) -> AppResult<Question> {
        self.collection.insert_one(&question).await?;
        Ok(question)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Question>> {
        let question = self.collection.find_one(doc! { "id": id }).await?;
        Ok(question)
    }

    async fn find_by_exam(&self, exam_id: &str) -> AppResult<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .collection
            .find(doc! { "exam_id": exam_id })
            .await?
            .try_collect()
            .await?;
        sort_by_order(&mut questions);
        Ok(questions)
    }

    async fn count_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "exam_id": exam_id })
            .await?;
        Ok(count)
    }

    async fn delete_by_exam(&self, exam_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "exam_id": exam_id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let exam_order_index = IndexModel::builder()
            .keys(doc! { "exam_id": 1, "question_order": 1 })
            .options(
                IndexOptions::builder()
                    .name("exam_order".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(exam_order_index).await?;

        log::info!("Successfully created indexes for questions collection");
        Ok(())
    }
}

/// By `question_order`, ties broken by creation time.
pub(crate) fn sort_by_order(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        a.question_order
            .cmp(&b.question_order)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
