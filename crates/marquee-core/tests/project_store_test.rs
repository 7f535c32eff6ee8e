//! Projects persisted through the file-backed store.

use marquee_core::{FileStore, Project, SnapshotStore, StoreError};
use marquee_orchestrator::{BusinessProfile, Persona};
use tempfile::TempDir;

fn persona(name: &str) -> Persona {
    serde_json::from_value(serde_json::json!({"name": name, "summary": "Regular"})).unwrap()
}

#[test]
fn test_project_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let mut profile = BusinessProfile::new("Bean There", "Specialty coffee");
    profile.goals = vec!["Grow weekday traffic".to_string()];

    let mut project = Project::new("Spring launch", profile.clone());
    project.record_artifact("personas", &vec![persona("Ava"), persona("Ben")]).unwrap();
    project.save(&FileStore::open(dir.path()).unwrap()).unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    let loaded = Project::load(&reopened, project.id).unwrap();

    assert_eq!(loaded, project);
    assert_eq!(loaded.profile, profile);
    let personas: Vec<Persona> = loaded.artifact("personas").unwrap().unwrap();
    assert_eq!(personas[1].name, "Ben");
}

#[test]
fn test_list_orders_by_last_update() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();

    let older = Project::new("Older", BusinessProfile::new("A", "Retail"));
    older.save(&store).unwrap();
    let mut newer = Project::new("Newer", BusinessProfile::new("B", "Retail"));
    newer.record_artifact("budget", &serde_json::json!({"total_budget": 10})).unwrap();
    newer.save(&store).unwrap();

    std::fs::write(dir.path().join("project-garbage.json"), "{").unwrap();

    let summaries = Project::list(&store).unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "Newer");
    assert_eq!(summaries[0].artifacts, vec!["budget"]);
}

#[test]
fn test_missing_and_corrupt_projects() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let project = Project::new("Broken", BusinessProfile::new("C", "Retail"));

    assert!(matches!(Project::load(&store, project.id), Err(StoreError::NotFound(_))));

    store.set(&format!("project-{}", project.id), "{\"id\": 1}").unwrap();
    assert!(matches!(Project::load(&store, project.id), Err(StoreError::Serialization(_))));
}
