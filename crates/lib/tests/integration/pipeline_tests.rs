//! End-to-end pipeline tests with stub toolchains.

use std::sync::{Arc, Mutex};

use serial_test::serial;
use substrate_lib::dispatch::Dispatcher;
use substrate_lib::process::OutputSink;
use substrate_lib::target::BuildError;

use super::common::TestEnv;

/// `native-image` stand-in: writes the object for `hello.HelloWorld`.
const IMAGE_STUB: &str = "echo \"native-image $*\"\n: > hello.helloworld.o\n";

/// Compiler and linker stand-in: creates whatever follows `-o`.
const CC_STUB: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
: > "$out"
"#;

fn stub_project(env: &TestEnv) -> substrate_lib::config::ProjectConfiguration {
  env.write_script("graal/bin/native-image", IMAGE_STUB);
  let cc = env.write_script("bin/cc", CC_STUB);
  std::fs::create_dir_all(env.path().join("classes")).unwrap();

  let mut config = env.config("hello.HelloWorld");
  config.c_compiler = Some(cc.clone());
  config.linker = Some(cc);
  config.static_root = Some(env.path().join("static"));
  config
}

fn recording_sink() -> (OutputSink, Arc<Mutex<Vec<String>>>) {
  let lines = Arc::new(Mutex::new(Vec::new()));
  let captured = lines.clone();
  (
    OutputSink::new(move |line| captured.lock().unwrap().push(line.to_string())),
    lines,
  )
}

#[tokio::test]
#[serial]
async fn build_then_run() {
  let env = TestEnv::new();
  let config = stub_project(&env);
  let dispatcher = Dispatcher::with_sink(&config, OutputSink::null());

  let ok = dispatcher
    .native_build(config.class_path.as_deref().unwrap())
    .await
    .unwrap();
  assert!(ok);

  let app = env.path().join("build/x86_64-linux/helloworld");
  assert!(app.is_file());

  // Swap the empty linked file for a script so the run stage has something to execute.
  env.write_script("build/x86_64-linux/helloworld", "echo 'Hello World from native'\n");
  let (sink, lines) = recording_sink();
  let ok = Dispatcher::with_sink(&config, sink).native_run().await.unwrap();

  assert!(ok);
  assert_eq!(*lines.lock().unwrap(), vec!["Hello World from native"]);
}

#[tokio::test]
#[serial]
async fn compile_then_link_separately() {
  let env = TestEnv::new();
  let config = stub_project(&env);
  let dispatcher = Dispatcher::with_sink(&config, OutputSink::null());

  assert!(dispatcher.native_compile(config.class_path.as_deref().unwrap()).await.unwrap());
  assert!(dispatcher.native_link().await.unwrap());
  assert!(env.path().join("build/x86_64-linux/helloworld").is_file());
}

#[tokio::test]
#[serial]
async fn link_before_compile_is_precondition_error() {
  let env = TestEnv::new();
  let config = stub_project(&env);

  let result = Dispatcher::with_sink(&config, OutputSink::null()).native_link().await;

  assert!(matches!(result, Err(BuildError::ObjectFileNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn compiler_output_reaches_sink_on_failure() {
  let env = TestEnv::new();
  let config = stub_project(&env);
  env.write_script(
    "graal/bin/native-image",
    "echo 'Error: Main entry point class not found'\nexit 1\n",
  );
  let (sink, lines) = recording_sink();

  let ok = Dispatcher::with_sink(&config, sink)
    .native_build(config.class_path.as_deref().unwrap())
    .await
    .unwrap();

  assert!(!ok);
  assert_eq!(*lines.lock().unwrap(), vec!["Error: Main entry point class not found"]);
  assert!(!env.path().join("build/x86_64-linux/helloworld").exists());
}
