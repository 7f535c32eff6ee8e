//! End-to-end workflow tests driven by a scripted mock model.

use futures::StreamExt;
use marquee_abstraction::{GroundingSource, ModelError, ModelResponse};
use marquee_models::MockModel;
use marquee_orchestrator::workflows::{knowledge_base, resonance_test, seo_audit};
use marquee_orchestrator::{
    BusinessProfile, OrchestrationError, Orchestrator, Persona, StageStatus, TaskList, drive,
};
use std::sync::Arc;

fn profile() -> BusinessProfile {
    let mut profile = BusinessProfile::new("Bean There", "Specialty coffee");
    profile.website = Some("https://beanthere.example".to_string());
    profile
}

fn source(url: &str) -> GroundingSource {
    GroundingSource { url: url.to_string(), title: url.to_string() }
}

fn persona(name: &str) -> Persona {
    serde_json::from_value(serde_json::json!({"name": name, "summary": "Drinks coffee"})).unwrap()
}

#[tokio::test]
async fn test_seo_audit_yields_stages_in_order() {
    let mock = Arc::new(MockModel::new("mock").with_model_response(
        ModelResponse::text(
            "Here is the audit:\n```json\n{\"overall_score\": 72, \"recommendations\": [\"Add schema markup\"]}\n```",
        )
        .with_sources(vec![source("https://serp.example/1")]),
    ));
    let orchestrator = Orchestrator::new(mock.clone());
    let competitors = vec!["https://rival.example".to_string(), "https://other.example".to_string()];

    let pipeline = seo_audit(&orchestrator, &profile(), "https://beanthere.example", &competitors).unwrap();
    let plan = pipeline.plan();
    assert_eq!(
        plan,
        vec![
            "Crawling https://beanthere.example",
            "Auditing competitor https://rival.example",
            "Auditing competitor https://other.example",
            "Synthesizing SEO report",
        ]
    );

    let events: Vec<_> = pipeline.run().collect().await;
    assert_eq!(events.len(), plan.len() * 2);

    let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
    for (i, stage) in plan.iter().enumerate() {
        assert_eq!(&events[i * 2].stage, stage);
        assert_eq!(events[i * 2].status, StageStatus::Running);
        assert_eq!(events[i * 2 + 1].status, StageStatus::Complete);
    }
    assert!(events[..events.len() - 1].iter().all(|e| e.result.is_none()));

    let report = events.last().unwrap().result.clone().unwrap();
    assert!((report.overall_score - 72.0).abs() < f64::EPSILON);
    assert_eq!(report.sources, vec![source("https://serp.example/1")]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].uses_web_search());
    assert!(requests[0].prompt.contains("https://rival.example"));
}

#[tokio::test]
async fn test_seo_audit_audits_repeated_competitor_once() {
    let mock = Arc::new(MockModel::new("mock").with_response(r#"{"overall_score": 60}"#));
    let orchestrator = Orchestrator::new(mock.clone());
    let competitors = vec!["https://a.com".to_string(), " https://a.com ".to_string()];

    let pipeline = seo_audit(&orchestrator, &profile(), "https://me.com", &competitors).unwrap();
    assert_eq!(
        pipeline.plan(),
        vec!["Crawling https://me.com", "Auditing competitor https://a.com", "Synthesizing SEO report"]
    );

    drive(pipeline.run(), |_| {}).await.unwrap();
    let prompt = &mock.requests()[0].prompt;
    assert!(prompt.contains("https://a.com"));
    assert!(!prompt.contains("https://a.com (2)"));
}

#[tokio::test]
async fn test_seo_audit_rejects_missing_site() {
    let orchestrator = Orchestrator::new(Arc::new(MockModel::new("mock")));
    let result = seo_audit(&orchestrator, &profile(), "  ", &[]);
    assert!(matches!(result, Err(OrchestrationError::InvalidInput(_))));
}

#[tokio::test]
async fn test_resonance_test_drives_to_report() {
    let mock = Arc::new(MockModel::new("mock").with_response(
        r#"{"overall_score": 7.5, "reactions": [
            {"persona": "Ava", "reaction": "Loves it", "score": 9},
            {"persona": "Ava", "reaction": "Too pricey", "concerns": ["price"]}
        ]}"#,
    ));
    let orchestrator = Orchestrator::new(mock);
    let personas = vec![persona("Ava"), persona("Ava")];

    let pipeline =
        resonance_test(&orchestrator, &profile(), "New cold brew launch!", &personas).unwrap();
    let mut tasks = TaskList::from_plan(pipeline.plan());
    assert_eq!(tasks.rows().len(), 3);

    let report = drive(pipeline.run(), |event| tasks.apply(event).unwrap()).await.unwrap();

    assert_eq!(report.reactions.len(), 2);
    assert!(tasks.is_complete());
    assert_eq!(tasks.rows()[1].name, "Simulating Ava (2)");
}

#[tokio::test]
async fn test_resonance_test_requires_personas() {
    let orchestrator = Orchestrator::new(Arc::new(MockModel::new("mock")));
    let result = resonance_test(&orchestrator, &profile(), "content", &[]);
    assert!(matches!(result, Err(OrchestrationError::InvalidInput(_))));
}

#[tokio::test(start_paused = true)]
async fn test_knowledge_base_threads_stage_results() {
    let mock = Arc::new(
        MockModel::new("mock")
            .with_model_response(
                ModelResponse::text("Bean There is a beloved neighborhood roaster.")
                    .with_sources(vec![source("https://news.example/bean")]),
            )
            .with_error(ModelError::RateLimited { provider: "mock".to_string(), message: None })
            .with_response(r#"{"offerings": [{"name": "House espresso"}]}"#)
            .with_response(r#"{"segments": [{"name": "Remote workers"}]}"#)
            .with_response(r#"{"brand_summary": "Neighborhood roaster", "key_messages": ["Fresh daily"]}"#),
    );
    let orchestrator = Orchestrator::new(mock.clone());

    let pipeline = knowledge_base(&orchestrator, &profile()).unwrap();
    let kb = drive(pipeline.run(), |_| {}).await.unwrap();

    assert_eq!(kb.brand_summary, "Neighborhood roaster");
    assert_eq!(kb.offerings[0].name, "House espresso");
    assert_eq!(kb.audience_segments[0].name, "Remote workers");
    assert_eq!(kb.sources, vec![source("https://news.example/bean")]);
    assert_eq!(mock.call_count(), 5);

    let requests = mock.requests();
    assert!(requests[0].uses_web_search());
    assert!(requests[2].prompt.contains("beloved neighborhood roaster"));
    assert!(requests[4].prompt.contains("House espresso"));
}

#[tokio::test]
async fn test_knowledge_base_stops_at_failing_stage() {
    let mock = Arc::new(
        MockModel::new("mock")
            .with_response("Research notes")
            .with_response("no structured data here"),
    );
    let orchestrator = Orchestrator::new(mock.clone());

    let events: Vec<_> = knowledge_base(&orchestrator, &profile()).unwrap().run().collect().await;

    let ok: Vec<_> = events.iter().filter_map(|e| e.as_ref().ok()).collect();
    assert_eq!(ok.len(), 3);
    assert_eq!(ok[2].stage, "Mapping offerings");
    assert_eq!(ok[2].status, StageStatus::Running);
    assert!(matches!(events.last(), Some(Err(OrchestrationError::MalformedResponse { .. }))));
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_surfaces_service_busy() {
    let rate_limited = || ModelError::RateLimited { provider: "mock".to_string(), message: None };
    let mock = Arc::new(
        MockModel::new("mock")
            .with_error(rate_limited())
            .with_error(rate_limited())
            .with_error(rate_limited()),
    );
    let orchestrator = Orchestrator::new(mock.clone());

    let pipeline = seo_audit(&orchestrator, &profile(), "https://beanthere.example", &[]).unwrap();
    let err = drive(pipeline.run(), |_| {}).await.unwrap_err();

    assert!(err.is_service_busy());
    assert_eq!(mock.call_count(), 3);
}
