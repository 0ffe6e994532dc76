use chrono::{Duration, Utc};

use exam_server::{
    errors::AppError,
    models::domain::{
        Answer, AnswerChoice, Attempt, Exam, Question, QuestionOptions, ScoreBreakdown, Student,
    },
    repositories::{
        AnswerRepository, AttemptRepository, ExamRepository, InMemoryAnswerRepository,
        InMemoryAttemptRepository, InMemoryExamRepository, InMemoryQuestionRepository,
        InMemoryStudentRepository, QuestionRepository, StudentRepository,
    },
};

fn make_exam(title: &str, offset_hours: i64) -> Exam {
    let start = Utc::now() + Duration::hours(offset_hours);
    Exam::new(title, start, start + Duration::hours(2), 60, 10)
}

fn make_question(exam_id: &str, order: i32, correct: AnswerChoice) -> Question {
    Question::new(
        exam_id,
        &format!("Question {}", order),
        QuestionOptions {
            a: "1".to_string(),
            b: "2".to_string(),
            c: "3".to_string(),
            d: "4".to_string(),
        },
        correct,
        order,
    )
}

fn make_student(email: &str, enrollment: &str) -> Student {
    Student::new("Test Student", email, enrollment, "hash")
}

fn breakdown(score: f64) -> ScoreBreakdown {
    ScoreBreakdown {
        score,
        attempted: 2,
        correct: 2,
        incorrect: 0,
        unattempted: 0,
    }
}

#[tokio::test]
async fn student_repository_uniqueness_and_lookup() {
    let repo = InMemoryStudentRepository::new();

    let asha = repo
        .create(make_student("Asha@Example.com", "EN-1"))
        .await
        .expect("create asha");
    repo.create(make_student("ravi@example.com", "EN-2"))
        .await
        .expect("create ravi");

    let same_email = repo.create(make_student("asha@example.com", "EN-3")).await;
    assert!(matches!(same_email, Err(AppError::AlreadyExists(_))));

    let same_enrollment = repo.create(make_student("new@example.com", "EN-1")).await;
    assert!(matches!(same_enrollment, Err(AppError::AlreadyExists(_))));

    let by_email = repo
        .find_by_email(" ASHA@example.com ")
        .await
        .expect("find by email should work");
    assert_eq!(by_email.map(|s| s.id), Some(asha.id.clone()));

    let by_id = repo.find_by_id(&asha.id).await.expect("find by id should work");
    assert!(by_id.is_some());

    let missing = repo.find_by_id("missing").await.expect("find should work");
    assert!(missing.is_none());
}

#[tokio::test]
async fn exam_repository_crud_and_error_paths() {
    let repo = InMemoryExamRepository::new();

    let later = repo.create(make_exam("Later", 48)).await.expect("create later");
    let sooner = repo.create(make_exam("Sooner", 1)).await.expect("create sooner");

    let duplicate = repo.create(later.clone()).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let listed = repo.list().await.expect("list should work");
    assert_eq!(
        listed.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
        vec!["Sooner", "Later"]
    );

    let mut updated = sooner.clone();
    updated.is_active = false;
    let updated = repo.update(updated).await.expect("update should work");
    assert!(!updated.is_active);

    let missing_update = repo.update(make_exam("Missing", 0)).await;
    assert!(matches!(missing_update, Err(AppError::NotFound(_))));

    repo.delete(&later.id).await.expect("delete should work");
    assert!(repo.find_by_id(&later.id).await.expect("find").is_none());

    let missing_delete = repo.delete(&later.id).await;
    assert!(matches!(missing_delete, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn question_repository_orders_counts_and_deletes_by_exam() {
    let repo = InMemoryQuestionRepository::new();

    repo.create(make_question("exam-1", 2, AnswerChoice::C))
        .await
        .expect("create q2");
    repo.create(make_question("exam-1", 0, AnswerChoice::A))
        .await
        .expect("create q0");
    repo.create(make_question("exam-1", 1, AnswerChoice::B))
        .await
        .expect("create q1");
    repo.create(make_question("exam-2", 0, AnswerChoice::D))
        .await
        .expect("create other exam question");

    let questions = repo.find_by_exam("exam-1").await.expect("find by exam");
    let orders: Vec<_> = questions.iter().map(|q| q.question_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    assert_eq!(repo.count_by_exam("exam-1").await.expect("count"), 3);
    assert_eq!(repo.delete_by_exam("exam-1").await.expect("delete"), 3);
    assert_eq!(repo.count_by_exam("exam-1").await.expect("count"), 0);
    assert_eq!(repo.count_by_exam("exam-2").await.expect("count"), 1);
}

#[tokio::test]
async fn attempt_repository_enforces_pair_and_single_completion() {
    let repo = InMemoryAttemptRepository::new();
    let now = Utc::now();

    let first = repo
        .create(Attempt::start("student-a", "exam-1", now))
        .await
        .expect("create first attempt");
    repo.create(Attempt::start("student-b", "exam-1", now + Duration::seconds(5)))
        .await
        .expect("create second attempt");

    let duplicate = repo.create(Attempt::start("student-a", "exam-1", now)).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let found = repo
        .find_by_student_and_exam("student-a", "exam-1")
        .await
        .expect("find by pair");
    assert_eq!(found.map(|a| a.id), Some(first.id.clone()));

    let by_exam = repo.find_by_exam("exam-1").await.expect("find by exam");
    assert_eq!(by_exam.len(), 2);
    assert_eq!(by_exam[0].student_id, "student-a");

    let submitted_at = now + Duration::minutes(30);
    assert!(repo
        .complete(&first.id, &breakdown(2.0), submitted_at)
        .await
        .expect("complete"));
    assert!(!repo
        .complete(&first.id, &breakdown(9.0), submitted_at)
        .await
        .expect("second complete"));

    let closed = repo
        .find_by_id(&first.id)
        .await
        .expect("find")
        .expect("attempt exists");
    assert!(closed.is_completed);
    assert_eq!(closed.score, 2.0);
    assert_eq!(closed.result, Some(breakdown(2.0)));
    assert_eq!(closed.submitted_at, Some(submitted_at));

    repo.delete(&first.id).await.expect("delete");
    let missing_delete = repo.delete(&first.id).await;
    assert!(matches!(missing_delete, Err(AppError::NotFound(_))));

    assert_eq!(repo.delete_by_exam("exam-1").await.expect("delete by exam"), 1);
}

#[tokio::test]
async fn answer_repository_keeps_one_row_per_question() {
    let repo = InMemoryAnswerRepository::new();
    let now = Utc::now();

    let first = repo
        .upsert(Answer::new("attempt-1", "q-1", AnswerChoice::A, true, now))
        .await
        .expect("insert answer");
    let replaced = repo
        .upsert(Answer::new(
            "attempt-1",
            "q-1",
            AnswerChoice::C,
            false,
            now + Duration::seconds(10),
        ))
        .await
        .expect("replace answer");

    assert_eq!(replaced.id, first.id);
    assert_eq!(replaced.selected_answer, AnswerChoice::C);
    assert!(!replaced.is_correct);

    repo.upsert(Answer::new("attempt-1", "q-2", AnswerChoice::B, true, now))
        .await
        .expect("insert second answer");
    repo.upsert(Answer::new("attempt-2", "q-1", AnswerChoice::D, false, now))
        .await
        .expect("insert other attempt answer");

    let stored = repo.find_by_attempt("attempt-1").await.expect("find");
    assert_eq!(stored.len(), 2);

    assert_eq!(repo.delete_by_attempt("attempt-1").await.expect("delete"), 2);
    assert!(repo.find_by_attempt("attempt-1").await.expect("find").is_empty());
    assert_eq!(repo.find_by_attempt("attempt-2").await.expect("find").len(), 1);
}
