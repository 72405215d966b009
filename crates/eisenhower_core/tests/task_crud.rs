use chrono::NaiveDate;
use eisenhower_core::db::open_db_in_memory;
use eisenhower_core::{
    Cell, Level, RepoError, SqliteTaskRepository, Task, TaskBatch, TaskRepository, TaskStatus,
    TaskValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

const HIGH_HIGH: Cell = Cell::new(Level::High, Level::High);
const LOW_LOW: Cell = Cell::new(Level::Low, Level::Low);

fn task_at(title: &str, cell: Cell, order_index: i64) -> Task {
    let mut task = Task::new(title, cell);
    task.order_index = order_index;
    task
}

#[test]
fn save_and_get_roundtrip_preserves_all_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("file taxes", HIGH_HIGH);
    task.description = Some("before the deadline".to_string());
    task.status = TaskStatus::InProgress;
    task.due_date = NaiveDate::from_ymd_opt(2025, 4, 15);
    task.tags = ["finance".to_string(), "home".to_string()].into();
    task.touch();

    let stored = repo.save(&task).unwrap();
    assert_eq!(stored, task);

    let loaded = repo.get(task.id).unwrap().unwrap();
    assert_eq!(loaded, task);
}

#[test]
fn save_existing_id_updates_in_place() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut task = Task::new("draft", LOW_LOW);
    repo.save(&task).unwrap();

    task.title = "final".to_string();
    task.status = TaskStatus::Completed;
    repo.save(&task).unwrap();

    let all = repo.list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "final");
    assert_eq!(all[0].status, TaskStatus::Completed);
}

#[test]
fn save_rejects_invalid_task_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let task = Task::new("   ", HIGH_HIGH);
    let err = repo.save(&task).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TaskValidationError::EmptyTitle)
    ));
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn delete_removes_row_and_reports_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let task = Task::new("one-off", HIGH_HIGH);
    repo.save(&task).unwrap();
    repo.delete(task.id).unwrap();
    assert!(repo.get(task.id).unwrap().is_none());

    let err = repo.delete(task.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == task.id));
}

#[test]
fn get_unknown_id_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    assert!(repo.get(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn list_all_follows_grid_then_order_index() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let low = task_at("low/low", LOW_LOW, 0);
    let second = task_at("second", HIGH_HIGH, 1);
    let first = task_at("first", HIGH_HIGH, 0);
    let delegate = task_at("medium/high", Cell::new(Level::Medium, Level::High), 0);
    let schedule = task_at("high/low", Cell::new(Level::High, Level::Low), 0);
    for task in [&low, &second, &first, &delegate, &schedule] {
        repo.save(task).unwrap();
    }

    let titles: Vec<String> = repo
        .list_all()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(
        titles,
        ["high/low", "first", "second", "medium/high", "low/low"]
    );

    let cell: Vec<Uuid> = repo
        .list_cell(HIGH_HIGH)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(cell, [first.id, second.id]);
}

#[test]
fn search_title_is_case_insensitive_and_escapes_wildcards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    repo.save(&task_at("Call Plumber", HIGH_HIGH, 0)).unwrap();
    repo.save(&task_at("pay 100% of rent", LOW_LOW, 0)).unwrap();
    repo.save(&task_at("read book", LOW_LOW, 1)).unwrap();

    let hits = repo.search_title("plumb").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Call Plumber");

    let percent = repo.search_title("100%").unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "pay 100% of rent");

    assert_eq!(repo.search_title("  ").unwrap().len(), 3);
    assert!(repo.search_title("%_").unwrap().is_empty());
}

#[test]
fn apply_batch_rolls_back_on_failure() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let kept = task_at("kept", HIGH_HIGH, 0);
    let doomed = task_at("doomed", LOW_LOW, 0);
    repo.save(&kept).unwrap();
    repo.save(&doomed).unwrap();

    let mut moved = kept.clone();
    moved.order_index = 5;
    let batch = TaskBatch {
        saves: vec![moved, task_at("   ", LOW_LOW, 1)],
        deletes: vec![doomed.id],
    };
    let err = repo.apply_batch(&batch).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TaskValidationError::EmptyTitle)
    ));

    let all = repo.list_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(repo.get(kept.id).unwrap().unwrap().order_index, 0);
    assert!(repo.get(doomed.id).unwrap().is_some());
}

#[test]
fn apply_batch_fails_on_missing_delete_target() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let batch = TaskBatch {
        saves: vec![task_at("new", LOW_LOW, 0)],
        deletes: vec![Uuid::new_v4()],
    };
    let err = repo.apply_batch(&batch).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn apply_batch_writes_saves_and_deletes_together() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let gone = task_at("gone", HIGH_HIGH, 0);
    let mut stays = task_at("stays", HIGH_HIGH, 1);
    repo.save(&gone).unwrap();
    repo.save(&stays).unwrap();

    stays.order_index = 0;
    repo.apply_batch(&TaskBatch {
        saves: vec![stays.clone()],
        deletes: vec![gone.id],
    })
    .unwrap();

    let cell = repo.list_cell(HIGH_HIGH).unwrap();
    assert_eq!(cell.len(), 1);
    assert_eq!(cell[0].id, stays.id);
    assert_eq!(cell[0].order_index, 0);
}

#[test]
fn corrupted_rows_are_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO tasks (id, title, importance, urgency, status, tags, order_index, created_at)
         VALUES ('not-a-uuid', 'broken', 'high', 'high', 'todo', '[]', 0, 0);",
        [],
    )
    .unwrap();

    let err = repo.list_all().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn try_new_rejects_table_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE tasks (id TEXT PRIMARY KEY, title TEXT NOT NULL);
         PRAGMA user_version = {};",
        eisenhower_core::db::migrations::latest_version()
    ))
    .unwrap();

    let err = SqliteTaskRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredColumn(_)));
}
