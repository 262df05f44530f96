use std::thread;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use site_forge::{
    Change, GenerationSession, Outcome, ParserOptions, SharedSession, StepOrigin, StepStatus,
};

const SCAFFOLD: &str = r#"<boltArtifact id="project-import" title="Project Files">
<boltAction type="file" filePath="package.json">
{"name": "vite-react-typescript-starter", "private": true}
</boltAction>
<boltAction type="file" filePath="index.html">
<!doctype html><div id="root"></div>
</boltAction>
<boltAction type="file" filePath="src/main.tsx">
import App from './App';
</boltAction>
</boltArtifact>"#;

const FIRST_TURN: &str = r#"I'll build a todo app.

<boltArtifact id="todo-app" title="Todo App">
<boltAction type="file" filePath="src/App.tsx">
export default function App() { return <TodoList />; }
</boltAction>
<boltAction type="file" filePath="src/components/TodoList.tsx">
export function TodoList() { return <ul />; }
</boltAction>
<boltAction type="shell">
npm install && npm run dev
</boltAction>
</boltArtifact>"#;

const FOLLOW_UP: &str = r#"<boltArtifact id="todo-app" title="Dark mode">
<boltAction type="edit" filePath="src/App.tsx">
export default function App() { return <main className="dark"><TodoList /></main>; }
</boltAction>
<boltAction type="file" filePath="src">oops</boltAction>
<boltAction type="delete" filePath="index.html"></boltAction>
</boltArtifact>"#;

fn paths(session: &GenerationSession) -> Vec<String> {
    session
        .tree()
        .walk()
        .map(|node| node.path().to_string())
        .collect()
}

#[test]
fn scaffold_then_turns_fold_into_one_tree() {
    let mut session = GenerationSession::default();

    let scaffold = session.seed_scaffold(SCAFFOLD);
    assert_eq!(scaffold.origin, StepOrigin::Scaffold);
    assert_eq!(session.turns(), 0);

    let first = session.ingest_turn(FIRST_TURN);
    assert_eq!(first.origin, StepOrigin::Turn(1));
    assert_eq!(first.merge.scripts(), &["npm install && npm run dev".to_string()]);

    let second = session.ingest_turn(FOLLOW_UP);
    let statuses: Vec<&str> = second.outcomes().iter().map(|outcome| outcome.status.label()).collect();
    assert_eq!(statuses, vec!["applied", "rejected", "applied"]);

    assert_eq!(
        paths(&session),
        vec![
            "package.json",
            "src",
            "src/main.tsx",
            "src/App.tsx",
            "src/components",
            "src/components/TodoList.tsx",
        ]
    );
    assert!(session
        .tree()
        .lookup("src/App.tsx")
        .and_then(|node| node.content())
        .expect("App.tsx exists")
        .contains("dark"));
}

#[test]
fn step_log_spans_scaffold_and_turns() {
    let mut session = GenerationSession::default();
    session.seed_scaffold(SCAFFOLD);
    session.ingest_turn(FIRST_TURN);
    session.ingest_turn(FOLLOW_UP);

    let steps = session.steps();
    assert_eq!(steps.len(), 9);

    let ids: Vec<usize> = steps.iter().map(|step| step.id).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<_>>());

    assert_eq!(steps[0].origin, StepOrigin::Scaffold);
    assert_eq!(steps[0].title, "Create package.json");
    assert_eq!(steps[0].description, "Project Files");
    assert_eq!(steps[5].title, "Run command");
    assert_eq!(steps[6].origin, StepOrigin::Turn(2));
    assert_eq!(steps[6].status, StepStatus::Completed);
    assert_matches!(steps[7].status, StepStatus::Failed(_));
    assert_eq!(steps[8].title, "Delete index.html");
}

#[test]
fn mount_descriptor_matches_tree() {
    let mut session = GenerationSession::default();
    session.ingest_turn(concat!(
        r#"<boltAction type="file" filePath="src/main.ts">boot()</boltAction>"#,
        r#"<boltAction type="file" filePath="README.md"># demo</boltAction>"#,
    ));

    let value = serde_json::to_value(session.mount_descriptor()).expect("descriptor serializes");
    assert_eq!(
        value,
        json!({
            "src": { "directory": { "main.ts": { "file": { "contents": "boot()" } } } },
            "README.md": { "file": { "contents": "# demo" } },
        })
    );
}

#[test]
fn streamed_turn_matches_complete_turn() {
    let mut streamed = GenerationSession::default();
    let mut committed = 0;
    for cut in (0..FIRST_TURN.len()).step_by(11) {
        committed += streamed.stream_update(&FIRST_TURN[..cut]).outcomes().len();
        assert!(streamed.is_streaming());
    }
    let report = streamed.stream_finish(FIRST_TURN);
    assert!(!streamed.is_streaming());

    assert_eq!(report.outcomes().len(), 3);
    assert!(committed <= 3);

    let mut complete = GenerationSession::default();
    complete.ingest_turn(FIRST_TURN);

    assert_eq!(paths(&streamed), paths(&complete));
    assert_eq!(streamed.steps(), complete.steps());
    assert_eq!(streamed.mount_descriptor(), complete.mount_descriptor());
}

#[test]
fn truncated_turn_still_lands_in_tree() {
    let mut session = GenerationSession::default();
    let report = session.ingest_turn(r#"<boltAction type="file" filePath="a.js">console.log("cut"#);

    assert!(report.parse_errors.is_empty());
    assert_eq!(report.outcomes()[0].status, Outcome::Applied(Change::Created));
    assert_eq!(
        session.tree().lookup("a.js").and_then(|node| node.content()),
        Some(r#"console.log("cut"#)
    );
}

#[test]
fn custom_delimiters_flow_through_session() {
    let mut session = GenerationSession::new(&ParserOptions {
        action_tag: "forgeAction".to_string(),
        artifact_tag: "forgeArtifact".to_string(),
    });
    session.ingest_turn(r#"<forgeAction type="folder" filePath="assets"></forgeAction>"#);

    assert!(session.tree().lookup("assets").expect("assets").is_dir());
}

#[test]
fn shared_session_serializes_cycles() {
    let shared = SharedSession::default();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                let text = format!(
                    r#"<boltAction type="file" filePath="workers/{worker}.txt">{worker}</boltAction>"#
                );
                shared.ingest_turn(&text)
            })
        })
        .collect();

    for handle in handles {
        let report = handle.join().expect("worker finished");
        assert_eq!(report.merge.applied_count(), 1);
    }

    let snapshot = shared.snapshot();
    assert_eq!(snapshot.len(), 9);
    assert_eq!(shared.cycle(|session| session.turns()), 8);
    assert_eq!(
        snapshot
            .lookup("workers")
            .map(|node| node.child_ids().len()),
        Some(8)
    );
}
