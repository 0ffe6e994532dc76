use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReplaceOptions},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::Exam,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn create(&self, exam: Exam) -> AppResult<Exam>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Exam>>;
    async fn list(&self) -> AppResult<Vec<Exam>>;
    async fn update(&self, exam: Exam) -> AppResult<Exam>;
    async fn delete(&self, id: &str) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoExamRepository {
    collection: Collection<Exam>,
}

impl MongoExamRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("exams");
        Self { collection }
    }
}

#[async_trait]
impl ExamRepository for MongoExamRepository {
    async fn create(&self, exam: Exam) -> AppResult<Exam> {
        self.collection.insert_one(&exam).await?;
        Ok(exam)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Exam>> {
        let exam = self.collection.find_one(doc! { "id": id }).await?;
        Ok(exam)
    }

    async fn list(&self) -> AppResult<Vec<Exam>> {
        let cursor = self.collection.find(doc! {}).await?;
        let mut exams: Vec<Exam> = cursor.try_collect().await?;
        sort_by_start_time(&mut exams);
        Ok(exams)
    }

    async fn update(&self, exam: Exam) -> AppResult<Exam> {
        let options = ReplaceOptions::builder().upsert(false).build();

        let result = self
            .collection
            .replace_one(doc! { "id": &exam.id }, &exam)
            .with_options(options)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Exam with id '{}' not found",
                exam.id
            )));
        }

        Ok(exam)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;

        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Exam with id '{}' not found", id)));
        }

        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for exams collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;

        log::info!("Successfully created indexes for exams collection");
        Ok(())
    }
}

/// Dates are stored as RFC 3339 strings whose fractional part varies in
/// width, so ordering is done on the decoded values.
pub(crate) fn sort_by_start_time(exams: &mut [Exam]) {
    exams.sort_by(|a, b| a.start_time.cmp(&b.start_time));
}
