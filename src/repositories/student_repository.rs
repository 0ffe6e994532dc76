use async_trait::async_trait;
use log::info;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::Student};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the email or enrollment number is taken.
    async fn create(&self, student: Student) -> AppResult<Student>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Student>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoStudentRepository {
    collection: Collection<Student>,
}

impl MongoStudentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("students");
        Self { collection }
    }
}

#[async_trait]
impl StudentRepository for MongoStudentRepository {
    async fn create(&self, student: Student) -> AppResult<Student> {
        self.collection.insert_one(&student).await?;
        Ok(student)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Student>> {
        let student = self.collection.find_one(doc! { "id": id }).await?;
        Ok(student)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Student>> {
        let student = self
            .collection
            .find_one(doc! { "email": email.trim().to_ascii_lowercase() })
            .await?;
        Ok(student)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        for (field, name) in [
            ("id", "id_unique"),
            ("email", "email_unique"),
            ("enrollment_number", "enrollment_number_unique"),
        ] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(name.to_string())
                        .build(),
                )
                .build();
            self.collection.create_index(model).await?;
        }

        info!("Created unique indexes on students.id, email, enrollment_number");
        Ok(())
    }
}
