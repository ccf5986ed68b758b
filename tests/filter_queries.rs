use chrono::Local;
use pretty_assertions::assert_eq;
use tasks_db::time::{end_of_day, noon, start_of_day};
use tasks_db::{Clock, Database, Filter, TagData, Task};
use tempfile::TempDir;

const DAY: i64 = 86_400_000;
// 2023-11-14T22:13:20Z
const NOW: i64 = 1_700_000_000_000;

fn open_db(dir: &TempDir) -> Database {
    let path = dir.path().join("data").join("tasks.db");
    Database::new(path.to_str().unwrap()).unwrap()
}

fn task(title: &str, configure: impl FnOnce(&mut Task)) -> Task {
    let mut task = Task::new(title.to_string(), NOW);
    configure(&mut task);
    task
}

fn titles(tasks: &[Task]) -> Vec<String> {
    let mut titles: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();
    titles.sort();
    titles
}

fn seed(db: &Database) {
    let today_noon = noon(NOW, &Local);
    let today_end = end_of_day(NOW, &Local);
    let tomorrow_noon = noon(today_end + 1, &Local);

    let tasks = [
        task("due noon", |t| t.due_date = today_noon),
        task("due end of day", |t| t.due_date = today_end),
        task("overdue", |t| t.due_date = today_noon - 3 * DAY),
        task("due tomorrow", |t| t.due_date = tomorrow_noon),
        task("no due date", |_| {}),
        task("completed", |t| {
            t.due_date = today_noon;
            t.completed = NOW - 1;
        }),
        task("deleted", |t| {
            t.due_date = today_noon;
            t.deleted = NOW - 1;
        }),
        task("hidden", |t| {
            t.due_date = today_noon;
            t.hide_until = NOW + DAY;
        }),
        task("was hidden", |t| {
            t.due_date = today_noon;
            t.hide_until = NOW - DAY;
        }),
    ];
    for task in &tasks {
        db.insert_task(task).unwrap();
    }
}

#[test]
fn test_today_filter_selects_tasks_due_today() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed(&db);

    let clock = Clock::fixed(NOW);
    let tasks = db.query_tasks(&Filter::today("Today"), &clock).unwrap();
    assert_eq!(
        titles(&tasks),
        vec!["due end of day", "due noon", "overdue", "was hidden"]
    );
}

#[test]
fn test_today_filter_is_evaluated_when_queried() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed(&db);

    let filter = Filter::today("Today");
    let clock = Clock::fixed(NOW);
    let before = db.query_tasks(&filter, &clock).unwrap();
    assert!(!titles(&before).contains(&"due tomorrow".to_string()));

    // Same filter value, a day later
    clock.install_fixed(NOW + DAY + 1);
    let after = db.query_tasks(&filter, &clock).unwrap();
    let after = titles(&after);
    assert!(after.contains(&"due tomorrow".to_string()));
    assert!(after.contains(&"hidden".to_string()));
}

#[test]
fn test_task_created_in_today_is_due_at_noon() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);
    let filter = Filter::today("Today");

    let created = db
        .create_task_in_filter(&filter, "call back".to_string(), &clock)
        .unwrap();
    assert_eq!(created.due_date, noon(NOW, &Local));
    assert_eq!(created.created, NOW);

    let due = created.due_date;
    assert!(due >= start_of_day(NOW, &Local));
    assert!(due <= end_of_day(NOW, &Local));

    let stored = db.get_task(created.id.unwrap()).unwrap();
    assert_eq!(stored, created);

    let listed = db.query_tasks(&filter, &clock).unwrap();
    assert_eq!(titles(&listed), vec!["call back"]);
}

#[test]
fn test_tag_filter_lists_and_creates_tagged_tasks() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);

    let home = db.insert_tag_data(&TagData::new("home")).unwrap();
    let work = db.insert_tag_data(&TagData::new("work")).unwrap();

    let dishes = db.insert_task(&Task::new("dishes".to_string(), NOW)).unwrap();
    let report = db.insert_task(&Task::new("report".to_string(), NOW)).unwrap();
    db.link_tag(dishes, &home).unwrap();
    db.link_tag(report, &work).unwrap();

    let filter = Filter::tag(home.clone());
    let created = db
        .create_task_in_filter(&filter, "laundry".to_string(), &clock)
        .unwrap();
    assert_eq!(created.due_date, 0);
    assert_eq!(db.get_tags_for_task(created.id.unwrap()).unwrap(), vec![home]);

    let tasks = db.query_tasks(&filter, &clock).unwrap();
    assert_eq!(titles(&tasks), vec!["dishes", "laundry"]);
}

#[test]
fn test_tag_filter_creates_missing_tag() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);

    // Tag only known to the filter, never saved
    let tag = TagData::new("garden").with_color(3);
    let filter = Filter::tag(tag.clone());
    let created = db
        .create_task_in_filter(&filter, "weed".to_string(), &clock)
        .unwrap();

    let saved = db
        .get_tag_data_by_remote_id(tag.remote_id.as_deref().unwrap())
        .unwrap()
        .expect("tag created");
    assert_eq!(saved.display_name(), "garden");
    assert_eq!(saved.color, Some(3));
    assert_eq!(db.get_tags_for_task(created.id.unwrap()).unwrap(), vec![saved]);

    let listed = db.query_tasks(&filter, &clock).unwrap();
    assert_eq!(titles(&listed), vec!["weed"]);
}

#[test]
fn test_tag_filter_links_exact_tag_when_names_differ_by_case() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);

    let lower = db.insert_tag_data(&TagData::new("home")).unwrap();
    let upper = db.insert_tag_data(&TagData::new("Home")).unwrap();

    let filter = Filter::tag(upper.clone());
    let created = db
        .create_task_in_filter(&filter, "fix door".to_string(), &clock)
        .unwrap();

    assert_eq!(db.get_tags_for_task(created.id.unwrap()).unwrap(), vec![upper]);
    assert_eq!(titles(&db.query_tasks(&filter, &clock).unwrap()), vec!["fix door"]);
    assert!(db.query_tasks(&Filter::tag(lower), &clock).unwrap().is_empty());
}

#[test]
fn test_tag_named_like_a_placeholder() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);

    let tag = db.insert_tag_data(&TagData::new("NOW()")).unwrap();
    let filter = Filter::tag(tag.clone());
    let created = db
        .create_task_in_filter(&filter, "urgent".to_string(), &clock)
        .unwrap();

    assert_eq!(db.get_tags_for_task(created.id.unwrap()).unwrap(), vec![tag]);
    assert_eq!(titles(&db.query_tasks(&filter, &clock).unwrap()), vec!["urgent"]);
}

#[test]
fn test_recent_filter() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let clock = Clock::fixed(NOW);

    db.insert_task(&task("fresh", |t| t.modified = NOW - DAY)).unwrap();
    db.insert_task(&task("fresher", |t| t.modified = NOW - 1)).unwrap();
    db.insert_task(&task("stale", |t| t.modified = NOW - 30 * DAY)).unwrap();

    let tasks = db.query_tasks(&Filter::recent("Recent"), &clock).unwrap();
    let ordered: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(ordered, vec!["fresher", "fresh"]);
}

#[test]
fn test_tags_persist_across_connections() {
    let dir = TempDir::new().unwrap();
    let saved = {
        let db = open_db(&dir);
        db.insert_tag_data(&TagData::new("later").with_color(7).with_icon(Some(0)))
            .unwrap()
    };

    let db = open_db(&dir);
    let loaded = db.get_all_tag_data().unwrap();
    assert_eq!(loaded, vec![saved]);
}
