//! Command dispatch against a scratch project, driving `run` directly so
//! output and exit codes can be asserted without spawning the binary.

use pretty_assertions::assert_eq;
use specsafe_cli::config::PathsConfig;
use specsafe_cli::{cli, exit_code, run, Config, ProjectContext};
use specsafe_snapshot::RestoreSummary;
use specsafe_test_utils::{SpecWorkspace, COMPLETE_DOCUMENT, SPARSE_DOCUMENT};
use std::path::PathBuf;

fn context(ws: &SpecWorkspace) -> ProjectContext {
    let config = Config {
        paths: PathsConfig {
            specs_root: PathBuf::from("."),
        },
        ..Config::default()
    };
    ProjectContext::new(ws.root(), config)
}

fn refuse(_: &RestoreSummary) -> bool {
    false
}

/// Run one command line, returning stdout or the exit code
fn invoke(ctx: &ProjectContext, argv: &[&str]) -> Result<String, i32> {
    let matches = cli()
        .try_get_matches_from(std::iter::once("specsafe").chain(argv.iter().copied()))
        .expect("arguments parse");
    let mut out = Vec::new();
    match run(&matches, ctx, &mut out, &refuse) {
        Ok(()) => Ok(String::from_utf8(out).expect("utf-8 output")),
        Err(err) => Err(exit_code(&err)),
    }
}

#[test]
fn id_next_pads_and_peek_reports() {
    let ws = SpecWorkspace::new();
    let ctx = context(&ws);

    assert_eq!(invoke(&ctx, &["id", "next", "features"]).unwrap(), "001\n");
    assert_eq!(invoke(&ctx, &["id", "next", "features", "--width", "5"]).unwrap(), "00002\n");
    assert_eq!(invoke(&ctx, &["id", "peek", "features"]).unwrap(), "2\n");
}

#[test]
fn invalid_namespace_exits_with_validation_code() {
    let ws = SpecWorkspace::new();
    assert_eq!(invoke(&context(&ws), &["id", "next", ".hidden"]), Err(4));
}

#[test]
fn checkpoint_round_trip() {
    let ws = SpecWorkspace::new();
    let doc = ws.write_document("auth", "spec-1.md", COMPLETE_DOCUMENT);
    let ctx = context(&ws);

    let created = invoke(&ctx, &["checkpoint", "create", "auth", "baseline"]).unwrap();
    assert_eq!(created, "Created snapshot-001 in 'auth'\n");

    let listed = invoke(&ctx, &["checkpoint", "list", "auth"]).unwrap();
    assert!(listed.lines().nth(1).unwrap().starts_with("snapshot-001"));
    assert!(listed.contains("standard"));
    assert!(listed.contains("baseline"));

    std::fs::write(&doc, SPARSE_DOCUMENT).unwrap();

    // Without --force the prompt refuses.
    let cancelled = invoke(&ctx, &["checkpoint", "restore", "auth", "snapshot-001"]).unwrap();
    assert_eq!(cancelled, "Restore cancelled\n");
    assert_eq!(ws.read(&doc), SPARSE_DOCUMENT);

    let restored = invoke(&ctx, &["checkpoint", "restore", "auth", "--force"]).unwrap();
    assert!(restored.starts_with("Restored snapshot-001 to "));
    assert_eq!(ws.read(&doc), COMPLETE_DOCUMENT);

    assert_eq!(
        invoke(&ctx, &["checkpoint", "delete", "auth", "snapshot-001"]).unwrap(),
        "Deleted snapshot-001 from 'auth'\n"
    );
    assert_eq!(invoke(&ctx, &["checkpoint", "list", "auth"]).unwrap(), "No snapshots in 'auth'\n");
}

#[test]
fn checkpoint_errors_map_to_exit_codes() {
    let ws = SpecWorkspace::new();
    let ctx = context(&ws);

    assert_eq!(invoke(&ctx, &["checkpoint", "create", "auth", "x"]), Err(2));
    assert_eq!(invoke(&ctx, &["checkpoint", "restore", "auth", "snap-1", "--force"]), Err(4));

    ws.write_document("auth", "spec-1.md", COMPLETE_DOCUMENT);
    invoke(&ctx, &["checkpoint", "create", "auth", "x"]).unwrap();
    let content = ws.root().join("auth").join("checkpoints").join("snapshot-001.md");
    std::fs::write(content, "tampered").unwrap();
    assert_eq!(invoke(&ctx, &["checkpoint", "restore", "auth", "snapshot-001", "--force"]), Err(3));
}

#[test]
fn cleanup_defaults_to_configured_retention() {
    let ws = SpecWorkspace::new();
    ws.write_document("auth", "spec-1.md", COMPLETE_DOCUMENT);
    let ctx = context(&ws);
    invoke(&ctx, &["checkpoint", "create", "auth", "fresh"]).unwrap();

    assert_eq!(
        invoke(&ctx, &["checkpoint", "cleanup", "auth"]).unwrap(),
        "Removed 0 snapshot(s) older than 30 days from 'auth'\n"
    );
    assert_eq!(
        invoke(&ctx, &["checkpoint", "cleanup", "auth", "--older-than", "4000000000"]).unwrap(),
        "Removed 0 snapshot(s) older than 4000000000 days from 'auth'\n"
    );
    assert_eq!(
        invoke(&ctx, &["checkpoint", "cleanup", "auth", "--older-than", "0"]).unwrap(),
        "Removed 1 snapshot(s) older than 0 days from 'auth'\n"
    );
}

#[test]
fn score_text_and_json() {
    let ws = SpecWorkspace::new();
    let doc = ws.write_document("search", "spec-1.md", SPARSE_DOCUMENT);
    let ctx = context(&ws);
    let path = doc.to_str().unwrap();

    let text = invoke(&ctx, &["score", path]).unwrap();
    assert!(text.starts_with("Completeness: 10%\n"));
    assert!(text.contains("~ Executive Summary"));
    assert!(text.ends_with("Next: Executive Summary\n"));

    let json: serde_json::Value =
        serde_json::from_str(&invoke(&ctx, &["score", path, "--json"]).unwrap()).unwrap();
    assert_eq!(json["overall"], 10);
    assert_eq!(json["sections"][0]["status"], "partial");
    assert_eq!(json["sections"][1]["status"], "missing");
}

#[test]
fn fix_dry_run_then_apply() {
    let ws = SpecWorkspace::new();
    let doc = ws.write_document("search", "spec-1.md", SPARSE_DOCUMENT);
    let ctx = context(&ws);
    let path = doc.to_str().unwrap();

    let dry = invoke(&ctx, &["fix", path, "--dry-run"]).unwrap();
    assert!(dry.contains("- Would add section: Problem Statement"));
    assert_eq!(ws.read(&doc), SPARSE_DOCUMENT);

    let applied = invoke(&ctx, &["fix", path, "--no-backup", "--namespace", "search"]).unwrap();
    assert!(applied.contains("- Added section: Problem Statement"));
    assert!(applied.contains("- Created safety snapshot: snapshot-001"));
    assert!(!applied.contains("Backup:"));

    assert_eq!(invoke(&ctx, &["fix", path]).unwrap(), "- nothing to fix\n");
}
