use shim_js::{
  CreateParams, HandleScope, HeapLimits, Isolate, NewStringType, ShimError, String as JsString,
};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> std::string::String {
    std::string::String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl io::Write for SharedWriterGuard<'_> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

#[test]
fn create_params_load_from_json() -> Result<(), ShimError> {
  let params: CreateParams = serde_json::from_str(
    r#"{ "heap_limits": { "max_bytes": 1048576, "gc_threshold": 262144 } }"#,
  )
  .unwrap();
  assert_eq!(params.heap_limits, HeapLimits::new(1024 * 1024, 256 * 1024));

  let isolate = Isolate::new(params)?;
  assert_eq!(isolate.heap_statistics().heap_size_limit, 1024 * 1024);
  isolate.dispose();
  Ok(())
}

#[test]
fn config_with_threshold_above_the_limit_is_rejected() {
  let params: CreateParams = serde_json::from_str(
    r#"{ "heap_limits": { "max_bytes": 1024, "gc_threshold": 4096 } }"#,
  )
  .unwrap();
  assert!(matches!(
    Isolate::new(params),
    Err(ShimError::InvalidHeapLimits {
      max_bytes: 1024,
      gc_threshold: 4096,
    })
  ));

  // Equal limits are fine: every allocation past the threshold collects first.
  let params = CreateParams::default().with_heap_limits(HeapLimits::new(4096, 4096));
  let isolate = Isolate::new(params).unwrap();
  isolate.dispose();
}

#[test]
fn missing_fields_fall_back_to_defaults() {
  let params: CreateParams = serde_json::from_str("{}").unwrap();
  assert_eq!(params, CreateParams::default());
  assert_eq!(params.heap_limits, HeapLimits::default());

  let round_trip: CreateParams =
    serde_json::from_str(&serde_json::to_string(&params).unwrap()).unwrap();
  assert_eq!(round_trip, params);
}

#[test]
fn heap_statistics_serialize_for_reporting() -> Result<(), ShimError> {
  let isolate = Isolate::new(CreateParams::default())?;
  let scope = HandleScope::new(&isolate);
  JsString::new(&scope, "counted").to_local_checked();

  let stats = serde_json::to_value(isolate.heap_statistics()).unwrap();
  assert_eq!(stats["scope_depth"], 1);
  assert_eq!(stats["handle_count"], 1);
  assert_eq!(stats["persistent_handles"], 2);
  assert!(stats["used_heap_size"].as_u64().unwrap() > 0);

  drop(scope);
  isolate.dispose();
  Ok(())
}

#[test]
fn allocation_failures_are_logged() -> Result<(), ShimError> {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let _guard = tracing::subscriber::set_default(subscriber);

  let isolate =
    Isolate::new(CreateParams::default().with_heap_limits(HeapLimits::new(1024, 1024)))?;
  {
    let scope = HandleScope::new(&isolate);
    let big = vec![b'z'; 2048];
    let maybe = JsString::new_from_utf8(&scope, &big, NewStringType::Normal, -1);
    assert!(maybe.is_empty());
  }
  isolate.dispose();

  drop(_guard);
  let output = writer.contents();
  assert!(output.contains("isolate created"), "got: {output}");
  assert!(output.contains("heap allocation refused"), "got: {output}");
  assert!(output.contains("string construction failed"), "got: {output}");
  assert!(output.contains("isolate disposed"), "got: {output}");
  Ok(())
}
