//! Render driver tests against small shell scripts standing in for Graphviz.
#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tempfile::{TempDir, tempdir};

use arbor::{
    ArborError, DiagramRenderer,
    config::AppConfig,
    model::{Diagram, Node},
    render::{OutputFormat, RenderDriver},
};

/// Writes an executable script into `dir` and returns its path.
fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Copies the input (last argument) to the `-o` path.
const COPYING_ENGINE: &str = r#"
out=""
while [ $# -gt 1 ]; do
    if [ "$1" = "-o" ]; then out="$2"; shift; fi
    shift
done
cp "$1" "$out"
"#;

/// Leftover temporary directories in `dir`.
fn leftovers(dir: &TempDir) -> Vec<PathBuf> {
    fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(".arbor-"))
        })
        .collect()
}

#[test]
fn test_success_moves_artifact_into_place() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", COPYING_ENGINE);
    let output = dir.path().join("out.svg");

    let result = RenderDriver::new(&engine)
        .render("digraph { a -> b }", &output, OutputFormat::Svg)
        .unwrap();

    assert_eq!(result.path(), output.as_path());
    assert_eq!(result.format(), OutputFormat::Svg);
    assert_eq!(fs::read_to_string(&output).unwrap(), "digraph { a -> b }");
    assert_eq!(result.bytes(), "digraph { a -> b }".len() as u64);
    assert!(result.warnings().is_none());
    assert!(leftovers(&dir).is_empty());
}

#[test]
fn test_success_replaces_existing_output() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", COPYING_ENGINE);
    let output = dir.path().join("out.png");
    fs::write(&output, "old image").unwrap();

    RenderDriver::new(&engine)
        .render("new image", &output, OutputFormat::Png)
        .unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "new image");
}

#[test]
fn test_engine_arguments() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("args.txt");
    let body = format!(
        "echo \"$@\" > {}\n{COPYING_ENGINE}",
        log.display()
    );
    let engine = fake_engine(dir.path(), "engine", &body);
    let output = dir.path().join("out.pdf");

    RenderDriver::new(&engine)
        .with_layout("neato")
        .render("digraph {}", &output, OutputFormat::Pdf)
        .unwrap();

    let args = fs::read_to_string(&log).unwrap();
    assert!(args.starts_with("-Tpdf -Kneato -o "));
    assert!(args.trim_end().ends_with("diagram.dot"));
}

#[test]
fn test_stderr_on_success_is_reported_as_warnings() {
    let dir = tempdir().unwrap();
    let body = format!("echo 'Warning: node n0 has no image' >&2\n{COPYING_ENGINE}");
    let engine = fake_engine(dir.path(), "engine", &body);
    let output = dir.path().join("out.png");

    let result = RenderDriver::new(&engine)
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap();

    assert_eq!(
        result.warnings(),
        Some("Warning: node n0 has no image\n")
    );
}

#[test]
fn test_failure_keeps_stderr_and_creates_no_output() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(
        dir.path(),
        "engine",
        "echo \"Error: syntax error in line 1 near 'digraph'\" >&2\nexit 3",
    );
    let output = dir.path().join("out.png");

    let err = RenderDriver::new(&engine)
        .render("not dot at all", &output, OutputFormat::Png)
        .unwrap_err();

    match err {
        ArborError::LayoutEngine {
            status,
            diagnostics,
        } => {
            assert_eq!(status, Some(3));
            assert_eq!(diagnostics, "Error: syntax error in line 1 near 'digraph'\n");
        }
        other => panic!("Expected LayoutEngine, got {other:?}"),
    }
    assert!(!output.exists());
    assert!(leftovers(&dir).is_empty());
}

#[test]
fn test_failure_leaves_existing_output_untouched() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", "echo broken >&2\nexit 1");
    let output = dir.path().join("out.png");
    fs::write(&output, "previous render").unwrap();

    let err = RenderDriver::new(&engine)
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap_err();

    assert!(matches!(err, ArborError::LayoutEngine { .. }));
    assert_eq!(fs::read_to_string(&output).unwrap(), "previous render");
}

#[test]
fn test_empty_artifact_is_an_error() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", "exit 0");
    let output = dir.path().join("out.png");

    let err = RenderDriver::new(&engine)
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap_err();

    match err {
        ArborError::LayoutEngine { diagnostics, .. } => {
            assert_eq!(diagnostics, "layout engine produced no output");
        }
        other => panic!("Expected LayoutEngine, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_timeout_kills_engine() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", "exec sleep 5");
    let output = dir.path().join("out.png");

    let err = RenderDriver::new(&engine)
        .with_timeout(Some(Duration::from_millis(200)))
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap_err();

    assert!(matches!(
        err,
        ArborError::LayoutEngineTimeout { timeout } if timeout == Duration::from_millis(200)
    ));
    assert!(!output.exists());
}

#[test]
fn test_timeout_covers_background_children_holding_stderr() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", "(sleep 4) &\nexit 2");
    let output = dir.path().join("out.png");

    let started = Instant::now();
    let err = RenderDriver::new(&engine)
        .with_timeout(Some(Duration::from_millis(200)))
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap_err();

    assert!(matches!(err, ArborError::LayoutEngineTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!output.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_timeout_kills_processes_started_by_engine() {
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let body = format!("sleep 30 &\necho $! > {}\nwait", pid_file.display());
    let engine = fake_engine(dir.path(), "engine", &body);
    let output = dir.path().join("out.png");

    let started = Instant::now();
    let err = RenderDriver::new(&engine)
        .with_timeout(Some(Duration::from_millis(300)))
        .render("digraph {}", &output, OutputFormat::Png)
        .unwrap_err();

    assert!(matches!(err, ArborError::LayoutEngineTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));

    let pid = fs::read_to_string(&pid_file).unwrap().trim().to_string();
    // Gone, or a zombie waiting for whoever adopted it.
    let alive = || {
        fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
            let state = stat.rsplit(')').next().unwrap_or_default();
            !state.trim_start().starts_with('Z')
        })
    };
    let gone = (0..50).any(|_| {
        if alive() {
            std::thread::sleep(Duration::from_millis(20));
            false
        } else {
            true
        }
    });
    assert!(gone, "sleep {pid} outlived the timed-out engine");
}

#[test]
fn test_renderer_uses_configured_engine_and_title() {
    let dir = tempdir().unwrap();
    let engine = fake_engine(dir.path(), "engine", COPYING_ENGINE);
    let mut config = AppConfig::default();
    config.engine_mut().set_program(engine.display().to_string());
    config.engine_mut().set_format(OutputFormat::Svg);

    let mut diagram = Diagram::new().with_title("Render Me");
    let root = diagram.root();
    diagram.add_node(root, Node::new("only")).unwrap();

    let output = dir.path().join("render_me.svg");
    let result = DiagramRenderer::new(config)
        .render(&diagram, Some(&output))
        .unwrap();

    assert_eq!(result.format(), OutputFormat::Svg);
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("digraph \"Render Me\" {"));
}
