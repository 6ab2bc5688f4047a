// crates/ragpoint-core/tests/brain.rs
// ============================================================================
// Module: Brain Integration Tests
// Description: Project lifecycle, ingestion, and answering over test doubles.
// Purpose: Validate brain semantics end to end without network access.
// ============================================================================

//! Brain integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use ragpoint_core::BrainError;
use ragpoint_core::Catalog;
use ragpoint_core::ChatId;
use ragpoint_core::ChatLimits;
use ragpoint_core::ChatRequest;
use ragpoint_core::Document;
use ragpoint_core::EmbeddingsLayout;
use ragpoint_core::InMemoryCatalog;
use ragpoint_core::ModelName;
use ragpoint_core::NewUser;
use ragpoint_core::ProjectName;
use ragpoint_core::ProjectUpdate;
use ragpoint_core::QuestionRequest;
use ragpoint_core::SourceFilter;
use ragpoint_core::Username;
use ragpoint_core::DEFAULT_SYSTEM_PROMPT;

use crate::common::TestModels;
use crate::common::brain_at;
use crate::common::brain_with_chat;
use crate::common::project;

fn question(text: &str) -> QuestionRequest {
    QuestionRequest {
        question: text.to_string(),
        ..QuestionRequest::default()
    }
}

#[test]
fn create_project_validates_models_and_names() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());

    brain.create_project(project("docs"), None).unwrap();
    assert!(EmbeddingsLayout::find(&dir.path().join("embeddings"), &ProjectName::parse("docs").unwrap())
        .unwrap()
        .is_some());

    let err = brain.create_project(project("docs"), None).err().unwrap();
    assert!(matches!(err, BrainError::Conflict(_)));

    let mut bad = project("bad");
    bad.llm = ModelName::parse("missing").unwrap();
    let err = brain.create_project(bad, None).err().unwrap();
    assert!(matches!(err, BrainError::InvalidInput(_)));
    assert!(catalog.get_project(&ProjectName::parse("bad").unwrap()).unwrap().is_none());
}

#[test]
fn create_project_grants_owner() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let owner = Username::parse("ana").unwrap();
    catalog
        .create_user(NewUser {
            username: owner.clone(),
            password_hash: "x".to_string(),
            is_admin: false,
        })
        .unwrap();
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());
    brain.create_project(project("docs"), Some(&owner)).unwrap();
    let user = catalog.get_user(&owner).unwrap().unwrap();
    assert_eq!(user.projects, vec![ProjectName::parse("docs").unwrap()]);
}

#[test]
fn failed_owner_grant_leaves_no_project_behind() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());
    let ghost = Username::parse("ghost").unwrap();
    let name = ProjectName::parse("docs").unwrap();

    let err = brain.create_project(project("docs"), Some(&ghost)).err().unwrap();
    assert!(matches!(err, BrainError::NotFound(_)), "{err}");
    assert!(catalog.get_project(&name).unwrap().is_none());
    assert!(brain.find_project(&name).unwrap().is_none());
    brain.create_project(project("docs"), None).unwrap();
}

#[test]
fn concurrent_lookups_share_one_project_handle() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.create_project(&project("docs")).unwrap();
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog);
    let name = ProjectName::parse("docs").unwrap();

    let handles: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> =
            (0..8).map(|_| scope.spawn(|| brain.find_project(&name).unwrap().unwrap())).collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });
    let cached = brain.find_project(&name).unwrap().unwrap();
    assert!(handles.iter().all(|handle| Arc::ptr_eq(handle, &cached)));
}

#[test]
fn question_uses_retrieved_context_and_trims_answer() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let brain = brain_at(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();

    let report = brain
        .ingest_documents(
            &project,
            vec![
                Document::with_source("rust ownership borrowing", "a.txt"),
                Document::with_source("python garbage collector", "b.txt"),
            ],
        )
        .unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks, 2);
    assert_eq!(report.ids.len(), 2);
    assert!(report.source.is_none());

    let answer = brain.question(&project, question("rust ownership borrowing")).unwrap();
    assert_eq!(answer.answer, "scripted answer");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].content, "rust ownership borrowing");
    let prompts = models.llm.prompts();
    assert!(prompts[0].contains("rust ownership borrowing\n\nQuestion: rust ownership borrowing"));
}

#[test]
fn question_llm_override_and_unknown_llm() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let brain = brain_at(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();

    let mut request = question("anything");
    request.llm = Some(ModelName::parse("other").unwrap());
    brain.question(&project, request).unwrap();
    assert_eq!(models.other.prompts().len(), 1);
    assert!(models.llm.prompts().is_empty());

    let mut request = question("anything");
    request.llm = Some(ModelName::parse("nope").unwrap());
    assert!(matches!(brain.question(&project, request), Err(BrainError::InvalidInput(_))));
    assert!(matches!(brain.question(&project, question("  ")), Err(BrainError::InvalidInput(_))));
}

#[test]
fn ingested_chunks_carry_keywords_and_drop_languages() {
    let dir = tempfile::tempdir().unwrap();
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();
    let mut doc = Document::with_source("Retrieval systems rank documents by similarity.", "a.txt");
    doc.metadata.insert("languages".to_string(), serde_json::json!(["eng"]));
    doc.metadata.insert("page".to_string(), serde_json::Value::Null);
    brain.ingest_documents(&project, vec![doc]).unwrap();

    let found = brain.find_source(&project, "a.txt").unwrap();
    assert_eq!(found.ids.len(), 1);
    let metadata = &found.metadatas[0];
    assert!(metadata.contains_key("keywords"));
    assert!(!metadata.contains_key("languages"));
    assert!(!metadata.contains_key("page"));
}

#[test]
fn question_context_without_documents_uses_empty_context() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let brain = brain_at(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();

    let answer = brain.question_context(&project, question("what is rust")).unwrap();
    assert_eq!(answer.documents, 0);
    assert_eq!(answer.answer, "scripted answer");
    let prompt = &models.llm.prompts()[0];
    assert!(prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
    assert!(prompt.contains("Context: \n"));
}

#[test]
fn question_context_prefers_request_then_project_system() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let brain = brain_at(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()));
    let mut model = project("docs");
    model.system = Some("Project system.".to_string());
    let project = brain.create_project(model, None).unwrap();
    brain
        .ingest_documents(&project, vec![Document::with_source("rust ownership borrowing", "a.txt")])
        .unwrap();

    let answer = brain.question_context(&project, question("rust ownership borrowing")).unwrap();
    assert_eq!(answer.documents, 1);
    let mut request = question("rust ownership borrowing");
    request.system = Some("Request system.".to_string());
    brain.question_context(&project, request).unwrap();

    let prompts = models.llm.prompts();
    assert!(prompts[0].starts_with("Project system."));
    assert!(prompts[0].contains("Context: rust ownership borrowing\n"));
    assert!(prompts[1].starts_with("Request system."));
}

#[test]
fn question_context_treats_retrieval_failure_as_no_documents() {
    let dir = tempfile::tempdir().unwrap();
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), Arc::new(InMemoryCatalog::new()));
    let mut model = project("docs");
    model.embeddings = ModelName::parse("broken").unwrap();
    let project = brain.create_project(model, None).unwrap();
    let answer = brain.question_context(&project, question("anything")).unwrap();
    assert_eq!(answer.documents, 0);
    assert!(matches!(brain.question(&project, question("anything")), Err(BrainError::Embedding(_))));
}

#[test]
fn chat_condenses_history_after_first_turn() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let brain = brain_at(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();

    let first = brain
        .chat(
            &project,
            ChatRequest {
                message: "hello".to_string(),
                ..ChatRequest::default()
            },
        )
        .unwrap();
    assert_eq!(models.llm.prompts().len(), 1);

    models.llm.push_reply("standalone question");
    let second = brain
        .chat(
            &project,
            ChatRequest {
                message: "and then?".to_string(),
                id: Some(first.id.clone()),
                ..ChatRequest::default()
            },
        )
        .unwrap();
    assert_eq!(second.id, first.id);
    let prompts = models.llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].contains("Human: hello\nAssistant: scripted answer"));
    assert!(prompts[1].contains("Follow Up Input: and then?"));
    assert!(prompts[2].contains("Question: standalone question"));
}

#[test]
fn chat_sessions_beyond_the_cap_are_forgotten() {
    let dir = tempfile::tempdir().unwrap();
    let models = Arc::new(TestModels::new());
    let limits = ChatLimits {
        max_sessions: 1,
        max_turns: 4,
    };
    let brain = brain_with_chat(dir.path(), models.clone(), Arc::new(InMemoryCatalog::new()), limits);
    let project = brain.create_project(project("docs"), None).unwrap();
    let say = |message: &str, id: Option<ChatId>| ChatRequest {
        message: message.to_string(),
        id,
        ..ChatRequest::default()
    };

    let first = brain.chat(&project, say("hello", None)).unwrap();
    brain.chat(&project, say("other session", None)).unwrap();
    assert_eq!(models.llm.prompts().len(), 2);

    brain.chat(&project, say("still there?", Some(first.id))).unwrap();
    let prompts = models.llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(!prompts[2].contains("Follow Up Input"));
}

#[test]
fn edit_project_replaces_system_and_validates_llm() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());
    let mut model = project("docs");
    model.system = Some("keep me?".to_string());
    brain.create_project(model, None).unwrap();
    let name = ProjectName::parse("docs").unwrap();

    let updated = brain
        .edit_project(
            &name,
            ProjectUpdate {
                llm: Some(ModelName::parse("other").unwrap()),
                system: None,
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.llm.as_str(), "other");
    assert!(updated.system.is_none());
    let stored = catalog.get_project(&name).unwrap().unwrap();
    assert_eq!(stored, updated);

    let err = brain
        .edit_project(
            &name,
            ProjectUpdate {
                llm: Some(ModelName::parse("missing").unwrap()),
                system: None,
            },
        )
        .err()
        .unwrap();
    assert!(matches!(err, BrainError::InvalidInput(_)));

    let missing = ProjectName::parse("missing").unwrap();
    assert!(brain.edit_project(&missing, ProjectUpdate::default()).unwrap().is_none());
}

#[test]
fn source_maintenance_operations() {
    let dir = tempfile::tempdir().unwrap();
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), Arc::new(InMemoryCatalog::new()));
    let project = brain.create_project(project("docs"), None).unwrap();
    let upload = dir.path().join("uploads").join("docs").join("notes.txt");
    brain
        .ingest_documents(
            &project,
            vec![
                Document::with_source("alpha beta", upload.to_string_lossy().to_string()),
                Document::with_source("gamma delta", "https://example.com/page"),
                Document::with_source("epsilon", "https://example.com/other"),
            ],
        )
        .unwrap();

    let listing = brain.list_sources(&project, SourceFilter::All).unwrap();
    assert_eq!(listing.urls.len(), 2);
    assert_eq!(listing.other.len(), 1);
    assert_eq!(brain.store_info(&project).unwrap().documents, 3);

    let deleted = brain.delete_source(&project, "notes.txt").unwrap();
    assert_eq!(deleted.len(), 1);

    let found = brain.find_source(&project, "https://example.com/page").unwrap();
    let id = found.ids[0].clone();
    assert_eq!(brain.delete_id(&project, &id).unwrap(), id);
    assert_eq!(brain.store_info(&project).unwrap().documents, 1);

    brain.reset(&project).unwrap();
    assert_eq!(brain.store_info(&project).unwrap().documents, 0);
}

#[test]
fn projects_reload_from_catalog_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    {
        let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());
        let project = brain.create_project(project("docs"), None).unwrap();
        brain
            .ingest_documents(&project, vec![Document::with_source("persisted text", "a.txt")])
            .unwrap();
    }
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog);
    let name = ProjectName::parse("docs").unwrap();
    let project = brain.find_project(&name).unwrap().unwrap();
    assert_eq!(brain.store_info(&project).unwrap().documents, 1);
}

#[test]
fn delete_project_removes_files_and_catalog_entry() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let brain = brain_at(dir.path(), Arc::new(TestModels::new()), catalog.clone());
    let project = brain.create_project(project("docs"), None).unwrap();
    brain.ingest_documents(&project, vec![Document::with_source("text", "a.txt")]).unwrap();
    let name = ProjectName::parse("docs").unwrap();

    brain.delete_project(&name).unwrap();
    assert!(brain.find_project(&name).unwrap().is_none());
    assert!(EmbeddingsLayout::find(&dir.path().join("embeddings"), &name).unwrap().is_none());
    assert!(matches!(brain.delete_project(&name), Err(BrainError::NotFound(_))));
}
