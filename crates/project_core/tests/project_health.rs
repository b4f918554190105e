use project_core::db::open_db_in_memory;
use project_core::service::health::DAY_MS;
use project_core::{
    ErrorKind, FeatureToggle, ProjectInput, ProjectService, ProjectServiceConfig,
    SqliteFeatureToggleRepository, User,
};
use rusqlite::Connection;

const NOW: i64 = 1_700_000_000_000;

fn fixed_clock() -> i64 {
    NOW
}

fn seed(conn: &Connection, project: &str, prefix: &str, count: usize, stale: bool, age_days: i64) {
    let repo = SqliteFeatureToggleRepository::try_new(conn).unwrap();
    for idx in 0..count {
        repo.create_feature(&FeatureToggle {
            name: format!("{project}-{prefix}-{idx}"),
            project: project.to_string(),
            feature_type: "release".to_string(),
            stale,
            archived: false,
            created_at: NOW - age_days * DAY_MS,
        })
        .unwrap();
    }
}

fn service(conn: &Connection) -> ProjectService<'_, project_core::SqliteAccessRepository<'_>> {
    let service =
        ProjectService::sqlite(conn, ProjectServiceConfig::default().with_clock(fixed_clock))
            .unwrap();
    service
        .create_project(&ProjectInput::new("web", "Web"), &User::new(1))
        .unwrap();
    service
}

#[test]
fn refresh_stores_rating_for_every_project() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&conn, "web", "stale", 2, true, 1);
    seed(&conn, "web", "expired", 3, false, 41);
    seed(&conn, "web", "fresh", 5, false, 2);

    assert_eq!(service.get_health_rating("web").unwrap(), None);

    let reports = service.refresh_health_ratings().unwrap();
    assert_eq!(reports.len(), 2);

    let web = reports.iter().find(|report| report.project == "web").unwrap();
    assert_eq!(web.total, 10);
    assert_eq!(web.stale, 2);
    assert_eq!(web.potentially_stale, 3);
    assert_eq!(web.rating, 50);

    assert_eq!(service.get_health_rating("web").unwrap(), Some(50));
    assert_eq!(service.get_health_rating("default").unwrap(), Some(100));
}

#[test]
fn calculate_does_not_store_rating() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&conn, "web", "stale", 1, true, 1);

    let report = service.calculate_health_rating("web").unwrap();
    assert_eq!(report.rating, 0);
    assert_eq!(service.get_health_rating("web").unwrap(), None);
}

#[test]
fn operational_toggles_expire_after_seven_days() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let repo = SqliteFeatureToggleRepository::try_new(&conn).unwrap();
    for (name, kind, age_days) in [
        ("ops-old", "operational", 8),
        ("ops-new", "operational", 6),
        ("switch", "kill-switch", 900),
        ("rel", "release", 8),
    ] {
        repo.create_feature(&FeatureToggle {
            name: name.to_string(),
            project: "web".to_string(),
            feature_type: kind.to_string(),
            stale: false,
            archived: false,
            created_at: NOW - age_days * DAY_MS,
        })
        .unwrap();
    }

    let report = service.calculate_health_rating("web").unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.potentially_stale, 1);
    assert_eq!(report.rating, 75);
}

#[test]
fn archived_toggles_still_count_toward_total() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    seed(&conn, "web", "fresh", 1, false, 1);
    seed(&conn, "web", "gone", 1, true, 1);
    SqliteFeatureToggleRepository::try_new(&conn)
        .unwrap()
        .set_archived("web-gone-0", true)
        .unwrap();

    let report = service.calculate_health_rating("web").unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.rating, 50);
}

#[test]
fn unknown_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert_eq!(
        service.calculate_health_rating("ghost").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.get_health_rating("ghost").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
